//! Session Records
//!
//! Typed helpers for the authentication layer: cache a user record under its
//! id at login, look it up on each authenticated request, drop it at logout.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::cache::PersistentCache;
use crate::error::{CacheError, Result};

/// Session-record view over a shared `PersistentCache`.
#[derive(Debug, Clone)]
pub struct SessionCache {
    cache: Arc<PersistentCache>,
    ttl_secs: i64,
}

impl SessionCache {
    /// Records cached through this view live for `ttl_secs`.
    pub fn new(cache: Arc<PersistentCache>, ttl_secs: i64) -> Self {
        Self { cache, ttl_secs }
    }

    /// Caches `record` for `user_id`, replacing any previous one.
    pub async fn remember<T: Serialize>(&self, user_id: &str, record: &T) -> Result<()> {
        let value = serde_json::to_value(record).map_err(|e| {
            CacheError::InvalidRequest(format!("Session record is not serializable: {}", e))
        })?;
        self.cache.set(user_id, value, self.ttl_secs).await
    }

    /// Returns the cached record for `user_id`.
    ///
    /// A record that no longer matches `T` is dropped and reported as a miss,
    /// so the caller falls back to the primary store.
    pub async fn lookup<T: DeserializeOwned>(&self, user_id: &str) -> Result<Option<T>> {
        let Some(value) = self.cache.get(user_id).await? else {
            return Ok(None);
        };

        match serde_json::from_value(value) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Discarding unreadable session record for '{}': {}", user_id, e);
                self.cache.delete(user_id).await?;
                Ok(None)
            }
        }
    }

    /// Drops the cached record for `user_id` (logout).
    pub async fn forget(&self, user_id: &str) -> Result<()> {
        self.cache.delete(user_id).await
    }
}
