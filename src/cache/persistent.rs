//! Persistent Cache
//!
//! Couples the in-memory store with snapshot persistence. Each mutation and
//! the snapshot write that makes it durable happen under one write guard, so
//! every file on disk is a consistent picture of the store.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::cache::entry::{validate_key, validate_ttl};
use crate::cache::snapshot::{self, WriteGate};
use crate::cache::{CacheEntry, CacheStats, CacheStore, Lookup, StatsRecorder};
use crate::error::{CacheError, Result};

// == Options ==
/// How a `PersistentCache` is opened and how it reacts to write failures.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Snapshot file location
    pub path: PathBuf,
    /// Upper bound for one snapshot write
    pub write_timeout: Duration,
    /// On a corrupt snapshot, move it aside and start empty instead of failing
    pub tolerate_corrupt: bool,
    /// Keep in-memory mutations and report success when a write fails
    pub degraded_mode: bool,
}

impl CacheOptions {
    /// Strict options for `path`: corrupt files and failed writes are errors.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_timeout: Duration::from_secs(5),
            tolerate_corrupt: false,
            degraded_mode: false,
        }
    }
}

// == Persistent Cache ==
/// File-backed TTL cache shared by concurrent request handlers.
#[derive(Debug)]
pub struct PersistentCache {
    store: RwLock<CacheStore>,
    options: CacheOptions,
    stats: StatsRecorder,
    /// Only flipped while holding the write guard
    closed: AtomicBool,
    #[cfg(test)]
    write_delay: Duration,
}

impl PersistentCache {
    // == Open ==
    /// Loads the snapshot at `options.path`, or starts empty if there is none.
    ///
    /// A snapshot that cannot be parsed fails the open unless
    /// `tolerate_corrupt` is set.
    pub fn open(options: CacheOptions) -> Result<Self> {
        let store = match snapshot::load(&options.path) {
            Ok(Some(store)) => {
                info!(
                    "Loaded {} cache entries from {:?}",
                    store.len(),
                    options.path
                );
                store
            }
            Ok(None) => {
                info!("No snapshot at {:?}, starting empty", options.path);
                CacheStore::new()
            }
            Err(err @ (CacheError::Corrupt { .. } | CacheError::CorruptSnapshot { .. }))
                if options.tolerate_corrupt =>
            {
                let moved = snapshot::quarantine(&options.path)?;
                warn!("{}; moved to {:?} and starting empty", err, moved);
                CacheStore::new()
            }
            Err(err) => return Err(err),
        };

        Ok(Self {
            store: RwLock::new(store),
            options,
            stats: StatsRecorder::new(),
            closed: AtomicBool::new(false),
            #[cfg(test)]
            write_delay: Duration::ZERO,
        })
    }

    /// Makes every snapshot write stall for `delay` before touching disk.
    #[cfg(test)]
    fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.options.path
    }

    // == Get ==
    /// Returns the value for `key` if present and unexpired.
    ///
    /// An expired entry is removed from memory and from the snapshot before
    /// `None` is returned.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;

        {
            let store = self.store.read().await;
            match store.lookup(key, Utc::now()) {
                Lookup::Live(value) => {
                    self.stats.record_hit();
                    return Ok(Some(value));
                }
                Lookup::Absent => {
                    self.stats.record_miss();
                    return Ok(None);
                }
                Lookup::Expired => {}
            }
        }

        // Re-check under the write guard: a concurrent set may have replaced it
        let mut store = self.store.write().await;
        match store.lookup(key, Utc::now()) {
            Lookup::Live(value) => {
                self.stats.record_hit();
                Ok(Some(value))
            }
            Lookup::Absent => {
                self.stats.record_miss();
                Ok(None)
            }
            Lookup::Expired => {
                store.remove(key);
                self.stats.record_expired(1);
                self.stats.record_miss();
                debug!("Removed expired entry '{}' on read", key);

                // An expired entry left on disk can never be served again, so
                // the removal stands even if this write fails.
                if let Err(err) = self.persist(&store).await {
                    self.stats.record_write_failure();
                    warn!("Failed to persist expiry of '{}': {}", key, err);
                }
                Ok(None)
            }
        }
    }

    // == Set ==
    /// Inserts or replaces `key`, expiring `ttl_secs` seconds from now.
    ///
    /// Returns once the new snapshot is on disk. If the write fails the
    /// previous entry is restored and the error is returned.
    pub async fn set(&self, key: &str, value: Value, ttl_secs: i64) -> Result<()> {
        validate_key(key)?;
        let ttl = validate_ttl(ttl_secs)?;

        let mut store = self.store.write().await;
        self.ensure_open()?;
        let entry = CacheEntry::new(value, ttl, Utc::now())?;
        let previous = store.insert(key.to_string(), entry);

        if let Err(err) = self.persist(&store).await {
            if self.absorb_write_failure("set", key, &err) {
                return Ok(());
            }
            store.restore(key, previous);
            return Err(err);
        }

        debug!("Set '{}' with ttl {}s", key, ttl_secs);
        Ok(())
    }

    // == Delete ==
    /// Removes `key`. Deleting an absent key succeeds without writing.
    pub async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;

        let mut store = self.store.write().await;
        self.ensure_open()?;
        let Some(previous) = store.remove(key) else {
            return Ok(());
        };

        if let Err(err) = self.persist(&store).await {
            if self.absorb_write_failure("delete", key, &err) {
                return Ok(());
            }
            store.restore(key, Some(previous));
            return Err(err);
        }

        debug!("Deleted '{}'", key);
        Ok(())
    }

    // == Purge Expired ==
    /// Removes every expired entry and persists once if anything changed.
    ///
    /// Returns the number of entries removed. The removals are kept in memory
    /// even when the write fails.
    pub async fn purge_expired(&self) -> Result<usize> {
        let mut store = self.store.write().await;
        let removed = store.purge_expired(Utc::now());
        if removed == 0 {
            return Ok(0);
        }

        self.stats.record_expired(removed);
        if let Err(err) = self.persist(&store).await {
            self.stats.record_write_failure();
            return Err(err);
        }
        Ok(removed)
    }

    // == Flush ==
    /// Writes the current store to disk regardless of pending changes.
    pub async fn flush(&self) -> Result<()> {
        let store = self.store.write().await;
        self.persist(&store).await.inspect_err(|_| {
            self.stats.record_write_failure();
        })
    }

    // == Close ==
    /// Final flush; afterwards `set` and `delete` are refused.
    ///
    /// The cache only counts as closed once the flush succeeded, so a failed
    /// close can be retried. Closing an already closed cache is a no-op.
    pub async fn close(&self) -> Result<()> {
        let store = self.store.write().await;
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }

        if let Err(err) = self.persist(&store).await {
            self.stats.record_write_failure();
            error!("Final flush of {:?} failed, cache stays open: {}", self.options.path, err);
            return Err(err);
        }

        self.closed.store(true, Ordering::SeqCst);
        info!("Session cache closed, snapshot at {:?}", self.options.path);
        Ok(())
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let total = self.store.read().await.len();
        self.stats.snapshot(total)
    }

    /// Number of entries held, including expired ones not yet removed.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CacheError::Closed);
        }
        Ok(())
    }

    /// Returns true if the failure is tolerated under degraded mode.
    fn absorb_write_failure(&self, op: &str, key: &str, err: &CacheError) -> bool {
        self.stats.record_write_failure();
        if self.options.degraded_mode && err.is_persistence() {
            warn!(
                "{} '{}' kept in memory only, snapshot write failed: {}",
                op, key, err
            );
            true
        } else {
            error!("{} '{}' rolled back, snapshot write failed: {}", op, key, err);
            false
        }
    }

    /// Serializes `store` and writes it on the blocking pool within the
    /// configured timeout. The caller holds the write guard throughout.
    async fn persist(&self, store: &CacheStore) -> Result<()> {
        let bytes = snapshot::encode(store)?;
        let path = self.options.path.clone();
        let gate = Arc::new(WriteGate::new());
        let writer_gate = Arc::clone(&gate);
        #[cfg(test)]
        let delay = self.write_delay;

        let mut handle = tokio::task::spawn_blocking(move || {
            #[cfg(test)]
            std::thread::sleep(delay);
            snapshot::write_atomic(&path, &bytes, &writer_gate)
        });

        let joined = match tokio::time::timeout(self.options.write_timeout, &mut handle).await {
            Ok(joined) => joined,
            Err(_) if gate.cancel() => {
                return Err(CacheError::Timeout(self.options.write_timeout));
            }
            // Past the point of no return: the rename is underway
            Err(_) => handle.await,
        };

        match joined {
            Ok(Ok(true)) => {
                self.stats.record_write();
                Ok(())
            }
            Ok(Ok(false)) => Err(CacheError::Timeout(self.options.write_timeout)),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(CacheError::Internal(format!(
                "Snapshot writer failed: {}",
                join_err
            ))),
        }
    }
}
