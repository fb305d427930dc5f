use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use bytes::Bytes;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::{mpsc, Mutex},
};
use tracing::{debug, warn};

use crate::replication::Replication;

/// Queued bytes above which a slow replica is reported.
pub const PENDING_BYTES_HIGH_WATER_MARK: usize = 16 * 1024 * 1024;

/// Primary-side sending end of one replica's propagation queue.
#[derive(Debug)]
pub struct ReplicaHandle {
    sender: mpsc::UnboundedSender<Bytes>,
    pending_bytes: Arc<AtomicUsize>,
}

/// Receiving end of a replica's queue, drained by [`forward_to_replica`].
#[derive(Debug)]
pub struct ReplicaLink {
    pub receiver: mpsc::UnboundedReceiver<Bytes>,
    pub pending_bytes: Arc<AtomicUsize>,
}

impl ReplicaHandle {
    pub fn new() -> (Self, ReplicaLink) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pending_bytes = Arc::new(AtomicUsize::new(0));

        (
            Self {
                sender,
                pending_bytes: Arc::clone(&pending_bytes),
            },
            ReplicaLink {
                receiver,
                pending_bytes,
            },
        )
    }

    /// Queues `bytes` without waiting. Returns `false` once the forwarding
    /// task is gone.
    pub fn enqueue(&self, replica_id: &str, bytes: Bytes) -> bool {
        let length = bytes.len();

        if self.sender.send(bytes).is_err() {
            return false;
        }

        let pending = self.pending_bytes.fetch_add(length, Ordering::SeqCst) + length;
        if pending >= PENDING_BYTES_HIGH_WATER_MARK
            && pending - length < PENDING_BYTES_HIGH_WATER_MARK
        {
            warn!(
                replica = replica_id,
                pending_bytes = pending,
                "replica is falling behind"
            );
        }

        true
    }

    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes.load(Ordering::SeqCst)
    }
}

/// Writes every queued command to the replica connection in order. Ends when
/// the queue is dropped, or unregisters the replica when a write fails.
pub async fn forward_to_replica<W>(
    replica_id: String,
    mut link: ReplicaLink,
    writer: Arc<Mutex<W>>,
    replication: Arc<Replication>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(bytes) = link.receiver.recv().await {
        let result = {
            let mut writer_guard = writer.lock().await;
            match writer_guard.write_all(&bytes).await {
                Ok(()) => writer_guard.flush().await,
                Err(e) => Err(e),
            }
        };

        link.pending_bytes.fetch_sub(bytes.len(), Ordering::SeqCst);

        if let Err(e) = result {
            warn!(replica = %replica_id, error = %e, "failed to forward to replica");
            replication.unregister_replica(&replica_id).await;
            return;
        }
    }

    debug!(replica = %replica_id, "replica forwarder stopped");
}
