//! Replication state shared by every connection of one server.
//!
//! [`Replication`] holds the node role, the replication id, the global offset
//! and the set of registered replicas. The replica set sits behind the
//! propagation lock: write commands hold a [`PropagationGuard`] while they
//! mutate the store and propagate, and `PSYNC` holds one while it snapshots
//! the store and registers the new replica. The propagation lock is always
//! taken before the store lock.

mod full_resync;
mod handshake;
mod replica;

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use rand::{distributions::Alphanumeric, Rng};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{blocking::Condition, resp::RespValue};

pub use full_resync::start_full_resync;
pub use handshake::{handshake, is_valid_repl_id, HandshakeError};
pub use replica::{forward_to_replica, ReplicaHandle, ReplicaLink};

pub const REPLICATION_ID_LENGTH: usize = 40;

#[derive(Debug, Clone, PartialEq)]
pub enum RedisRole {
    Master,
    Replica((String, u16)),
}

impl RedisRole {
    pub fn as_info_role(&self) -> &'static str {
        match self {
            RedisRole::Master => "master",
            RedisRole::Replica(_) => "slave",
        }
    }
}

/// Identifiers a replica starts streaming from after `PSYNC`.
#[derive(Debug, Clone, PartialEq)]
pub struct FullResync {
    pub replication_id: String,
    pub offset: u64,
}

impl FullResync {
    pub fn as_resp(&self) -> RespValue {
        RespValue::SimpleString(format!(
            "FULLRESYNC {} {}",
            self.replication_id, self.offset
        ))
    }
}

#[derive(Debug)]
pub struct Replication {
    role: RedisRole,
    replication_id: String,
    offset: AtomicU64,
    replicas: Mutex<HashMap<String, ReplicaHandle>>,
    acknowledgements: Condition<HashMap<String, u64>>,
}

impl Replication {
    pub fn new(role: RedisRole, replication_id: String, offset: u64) -> Self {
        Self {
            role,
            replication_id,
            offset: AtomicU64::new(offset),
            replicas: Mutex::new(HashMap::new()),
            acknowledgements: Condition::new(HashMap::new()),
        }
    }

    /// A primary with a freshly generated replication id and offset 0.
    pub fn master() -> Self {
        Self::new(RedisRole::Master, generate_replication_id(), 0)
    }

    pub fn role(&self) -> &RedisRole {
        &self.role
    }

    pub fn is_master(&self) -> bool {
        self.role == RedisRole::Master
    }

    pub fn replication_id(&self) -> &str {
        &self.replication_id
    }

    pub fn offset(&self) -> u64 {
        self.offset.load(Ordering::SeqCst)
    }

    /// Acquires the propagation lock.
    pub async fn lock_propagation(&self) -> PropagationGuard<'_> {
        PropagationGuard {
            replication: self,
            replicas: self.replicas.lock().await,
        }
    }

    pub async fn replica_count(&self) -> usize {
        self.replicas.lock().await.len()
    }

    /// Adds `delta` bytes to the offset of a replica, provided nothing else
    /// moved it since `expected` was read.
    ///
    /// Only the upstream stream reader advances a replica's offset, so a
    /// failed exchange means that invariant was broken.
    pub fn advance_offset(&self, expected: u64, delta: u64) -> Result<u64, u64> {
        let new_offset = expected + delta;

        self.offset
            .compare_exchange(expected, new_offset, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| new_offset)
    }

    pub async fn unregister_replica(&self, replica_id: &str) -> bool {
        let removed = self.replicas.lock().await.remove(replica_id).is_some();
        self.forget_acknowledgement(replica_id);

        if removed {
            debug!(replica = replica_id, "replica unregistered");
        }

        removed
    }

    /// Records the offset acknowledged by a registered replica. Returns
    /// `false`, recording nothing, when `replica_id` never completed `PSYNC`.
    ///
    /// The replica set stays locked while the table is updated, so an ACK
    /// racing with `unregister_replica` cannot resurrect a removed entry.
    pub async fn record_acknowledgement(&self, replica_id: &str, offset: u64) -> bool {
        let replicas = self.replicas.lock().await;
        if !replicas.contains_key(replica_id) {
            return false;
        }

        self.acknowledgements.update(|acknowledgements| {
            acknowledgements.insert(replica_id.to_string(), offset);
            true
        });

        true
    }

    fn forget_acknowledgement(&self, replica_id: &str) {
        self.acknowledgements
            .update(|acknowledgements| acknowledgements.remove(replica_id).is_some());
    }

    /// Replicas whose last acknowledged offset is at least `target`.
    pub fn acknowledged_count(&self, target: u64) -> usize {
        self.acknowledgements
            .with(|acknowledgements| count_acknowledged(acknowledgements, target))
    }

    /// Waits until `minimum` replicas acknowledged `target` or `timeout`
    /// elapses, and returns how many had acknowledged by then.
    pub async fn wait_for_acknowledgements(
        &self,
        minimum: usize,
        target: u64,
        timeout: Option<Duration>,
    ) -> usize {
        self.acknowledgements
            .wait_until(
                |acknowledgements| count_acknowledged(acknowledgements, target) >= minimum,
                timeout,
            )
            .await;

        self.acknowledged_count(target)
    }
}

fn count_acknowledged(acknowledgements: &HashMap<String, u64>, target: u64) -> usize {
    acknowledgements
        .values()
        .filter(|offset| **offset >= target)
        .count()
}

pub fn generate_replication_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REPLICATION_ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Holder of the propagation lock.
pub struct PropagationGuard<'a> {
    replication: &'a Replication,
    replicas: MutexGuard<'a, HashMap<String, ReplicaHandle>>,
}

impl PropagationGuard<'_> {
    /// Replication id and offset a replica registered now would start from.
    pub fn full_resync(&self) -> FullResync {
        FullResync {
            replication_id: self.replication.replication_id.clone(),
            offset: self.replication.offset(),
        }
    }

    /// Adds a replica to the fan-out. Every command propagated from now on
    /// is queued on the returned link.
    pub fn register_replica(&mut self, replica_id: String) -> ReplicaLink {
        let (handle, link) = ReplicaHandle::new();

        if self.replicas.insert(replica_id.clone(), handle).is_some() {
            warn!(replica = %replica_id, "replica re-registered, dropping previous stream");
        }

        link
    }

    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    /// Serializes `command` once, advances the global offset by its length
    /// and queues it for every registered replica. Replicas whose queue is
    /// gone are unregistered. Returns the new offset.
    pub fn propagate(&mut self, command: &RespValue) -> u64 {
        let bytes = command.encode();
        let length = bytes.len() as u64;
        let new_offset = self.replication.offset.fetch_add(length, Ordering::SeqCst) + length;

        let mut disconnected = Vec::new();

        for (replica_id, handle) in self.replicas.iter() {
            if !handle.enqueue(replica_id, bytes.clone()) {
                disconnected.push(replica_id.clone());
            }
        }

        for replica_id in disconnected {
            warn!(replica = %replica_id, "replica stream closed, unregistering");
            self.replicas.remove(&replica_id);
            self.replication.forget_acknowledgement(&replica_id);
        }

        new_offset
    }
}
