//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache entries so the
//! snapshot file does not accumulate dead records between reads.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::PersistentCache;

/// Spawns a background task that periodically purges expired cache entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between runs. Each run takes the cache's write guard once and persists
/// only if something was removed. Reads already hide expired entries, so
/// this only bounds memory and file size.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(PersistentCache::open(CacheOptions::new("cache.json"))?);
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: Arc<PersistentCache>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            match cache.purge_expired().await {
                Ok(0) => debug!("Expiry sweep: no expired entries found"),
                Ok(removed) => info!("Expiry sweep: removed {} expired entries", removed),
                Err(err) => warn!("Expiry sweep: snapshot write failed: {}", err),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheOptions;
    use serde_json::{json, Value};

    fn open_in(dir: &tempfile::TempDir) -> Arc<PersistentCache> {
        Arc::new(PersistentCache::open(CacheOptions::new(dir.path().join("cache.json"))).unwrap())
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_in(&dir);
        cache.set("expire_soon", json!("value"), 1).await.unwrap();

        let handle = spawn_cleanup_task(cache.clone(), 1);

        // Wait for entry to expire and the sweep to run
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // Removed without any read touching it
        assert_eq!(cache.len().await, 0);
        let doc: Value =
            serde_json::from_slice(&std::fs::read(cache.path()).unwrap()).unwrap();
        assert!(doc["store"].get("expire_soon").is_none());

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = open_in(&dir);
        cache.set("long_lived", json!("value"), 3600).await.unwrap();

        let handle = spawn_cleanup_task(cache.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.get("long_lived").await.unwrap(), Some(json!("value")));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let dir = tempfile::tempdir().unwrap();
        let handle = spawn_cleanup_task(open_in(&dir), 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
