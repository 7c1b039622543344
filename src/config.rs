//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheOptions;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Location of the durable snapshot file
    pub cache_path: PathBuf,
    /// TTL in seconds applied when a request does not carry one
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Expiry sweep interval in seconds (0 disables the sweep)
    pub cleanup_interval: u64,
    /// Upper bound for a single snapshot write, in milliseconds
    pub write_timeout_ms: u64,
    /// Start empty (moving the file aside) instead of failing on a corrupt snapshot
    pub tolerate_corrupt: bool,
    /// Keep serving from memory when snapshot writes fail
    pub degraded_mode: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PATH` - Snapshot file (default: data/session_cache.json)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 86400)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `WRITE_TIMEOUT_MS` - Snapshot write bound (default: 5000)
    /// - `TOLERATE_CORRUPT` - `true`/`1` to start empty on a corrupt file
    /// - `DEGRADED_MODE` - `true`/`1` to serve in-memory when writes fail
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_path: env::var("CACHE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            default_ttl: env::var("DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ttl| *ttl > 0)
                .unwrap_or(defaults.default_ttl),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cleanup_interval),
            write_timeout_ms: env::var("WRITE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.write_timeout_ms),
            tolerate_corrupt: env::var("TOLERATE_CORRUPT")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.tolerate_corrupt),
            degraded_mode: env::var("DEGRADED_MODE")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.degraded_mode),
        }
    }

    /// Options for opening the persistent cache described by this config.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            path: self.cache_path.clone(),
            write_timeout: Duration::from_millis(self.write_timeout_ms),
            tolerate_corrupt: self.tolerate_corrupt,
            degraded_mode: self.degraded_mode,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("data/session_cache.json"),
            default_ttl: 86_400,
            server_port: 3000,
            cleanup_interval: 60,
            write_timeout_ms: 5000,
            tolerate_corrupt: false,
            degraded_mode: false,
        }
    }
}
