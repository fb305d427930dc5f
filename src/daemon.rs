//! Background eviction of expired keys.
//!
//! Reads already treat expired keys as absent; the sweeper only reclaims
//! their memory. It holds the store write lock for one small batch at a
//! time so clients are never stalled by a long sweep.

use std::{sync::Arc, time::Duration};

use jiff::Timestamp;
use tokio::sync::RwLock;
use tracing::debug;

use crate::key_value_store::KeyValueStore;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10);
pub const SWEEP_KEY_THRESHOLD: usize = 1000;
pub const SWEEP_BATCH_SIZE: usize = 100;
pub const SWEEP_BATCH_PAUSE: Duration = Duration::from_millis(10);

pub async fn run_expiry_sweeper(store: Arc<RwLock<KeyValueStore>>) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        interval.tick().await;
        sweep_expired_keys(&store).await;
    }
}

/// Evicts every expired key once the keyspace is above the sweep threshold.
/// Returns the number of evicted keys.
pub async fn sweep_expired_keys(store: &RwLock<KeyValueStore>) -> usize {
    if store.read().await.len() <= SWEEP_KEY_THRESHOLD {
        return 0;
    }

    let mut evicted = 0;

    loop {
        let batch = store
            .write()
            .await
            .evict_expired(Timestamp::now(), SWEEP_BATCH_SIZE);
        evicted += batch;

        if batch < SWEEP_BATCH_SIZE {
            break;
        }

        tokio::time::sleep(SWEEP_BATCH_PAUSE).await;
    }

    if evicted > 0 {
        debug!(evicted, "evicted expired keys");
    }

    evicted
}
