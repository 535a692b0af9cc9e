//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired entries from an
//! in-process store. Remote backends expire keys on their own, so the sweep
//! is a no-op for them.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::KvStore;

/// Spawns a background task that periodically purges expired store entries.
///
/// # Arguments
/// * `store` - Shared store handle
/// * `cleanup_interval_secs` - Interval in seconds between sweeps (min 1)
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
pub fn spawn_cleanup_task(store: KvStore, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.purge_expired();
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KvBackend, ManualClock, MemoryBackend};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let clock = ManualClock::new(0);
        let backend = Arc::new(MemoryBackend::with_clock(100, Arc::new(clock.clone())));
        let store = KvStore::with_backend("test", backend.clone());

        store.set("test:short", "v", 1).await;
        store.set("test:long", "v", 3600).await;
        clock.advance_secs(2);

        let handle = spawn_cleanup_task(store.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(backend.len(), 1);
        assert!(store.get("test:long").await.is_some());
        assert_eq!(backend.purge_expired(), 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_on_degraded_store() {
        let handle = spawn_cleanup_task(KvStore::disconnected("test"), 1);
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let handle = spawn_cleanup_task(KvStore::disconnected("test"), 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
