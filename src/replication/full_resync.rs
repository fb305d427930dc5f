use std::sync::Arc;

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::{Mutex, RwLock},
};
use tracing::{info, warn};

use crate::{
    key_value_store::KeyValueStore,
    rdb::dump_rdb,
    replication::{forward_to_replica, FullResync, Replication},
};

async fn write_snapshot<W>(
    writer: &mut W,
    full_resync: &FullResync,
    payload: &[u8],
) -> tokio::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&full_resync.as_resp().encode()).await?;
    writer
        .write_all(format!("${}\r\n", payload.len()).as_bytes())
        .await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

/// Primary side of `PSYNC`.
///
/// Under the propagation lock the replication id and offset are read, the
/// store is dumped and the connection is registered as a replica, so every
/// command propagated afterwards is queued behind the snapshot. The
/// `FULLRESYNC` line and the snapshot (without a trailing CRLF) are then
/// written and a forwarder task takes over the queue.
pub async fn start_full_resync<W>(
    replica_id: &str,
    writer: Arc<Mutex<W>>,
    replication: Arc<Replication>,
    store: Arc<RwLock<KeyValueStore>>,
) -> tokio::io::Result<FullResync>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (full_resync, payload, link) = {
        let mut propagation = replication.lock_propagation().await;
        let full_resync = propagation.full_resync();
        let payload = dump_rdb(&*store.read().await);
        let link = propagation.register_replica(replica_id.to_string());

        (full_resync, payload, link)
    };

    let result = {
        let mut writer_guard = writer.lock().await;
        write_snapshot(&mut *writer_guard, &full_resync, &payload).await
    };

    if let Err(e) = result {
        warn!(replica = replica_id, error = %e, "failed to send snapshot");
        replication.unregister_replica(replica_id).await;
        return Err(e);
    }

    info!(
        replica = replica_id,
        offset = full_resync.offset,
        snapshot_bytes = payload.len(),
        "replica registered after full resync"
    );

    tokio::spawn(forward_to_replica(
        replica_id.to_string(),
        link,
        writer,
        Arc::clone(&replication),
    ));

    Ok(full_resync)
}
