//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and the validation
//! applied to keys and TTLs before anything touches the store.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;

use crate::cache::expiry;
use crate::error::{CacheError, Result};

// == Cache Entry ==
/// A single cached value together with its absolute expiry.
///
/// Value and expiry are only ever replaced together.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The stored payload, opaque to the cache
    pub value: Value,
    /// Instant (UTC) from which the entry is no longer served
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry that expires `ttl` after `now`.
    ///
    /// Fails with `InvalidRequest` when the expiry would overflow the
    /// representable date range.
    pub fn new(value: Value, ttl: TimeDelta, now: DateTime<Utc>) -> Result<Self> {
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            CacheError::InvalidRequest(format!("TTL of {}s is out of range", ttl.num_seconds()))
        })?;

        Ok(Self { value, expires_at })
    }

    // == Is Live ==
    /// Returns true while the entry may still be served at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        expiry::is_live(self.expires_at, now)
    }
}

// == Validation ==
/// Rejects empty keys. Keys are otherwise opaque and case-sensitive.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest(
            "Key cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Converts a TTL in seconds into a duration, rejecting zero and negatives.
pub fn validate_ttl(ttl_secs: i64) -> Result<TimeDelta> {
    if ttl_secs <= 0 {
        return Err(CacheError::InvalidRequest(format!(
            "TTL must be a positive number of seconds, got {}",
            ttl_secs
        )));
    }

    TimeDelta::try_seconds(ttl_secs).ok_or_else(|| {
        CacheError::InvalidRequest(format!("TTL of {}s is out of range", ttl_secs))
    })
}
