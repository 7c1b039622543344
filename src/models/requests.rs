//! Request DTOs for the session cache API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

/// Request body for the SET operation (PUT /cache)
///
/// # Fields
/// - `key`: The cache key (user or session id)
/// - `value`: Any JSON payload
/// - `ttl`: Optional TTL in seconds (uses the configured default if omitted)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<i64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        match self.ttl {
            Some(ttl) if ttl <= 0 => Some(format!(
                "TTL must be a positive number of seconds, got {}",
                ttl
            )),
            _ => None,
        }
    }

    /// TTL to apply, falling back to `default_ttl`.
    pub fn effective_ttl(&self, default_ttl: u64) -> i64 {
        self.ttl
            .unwrap_or_else(|| i64::try_from(default_ttl).unwrap_or(i64::MAX))
    }
}
