//! Session Cache - A file-backed TTL cache for session records
//!
//! Keeps authenticated-session data out of the primary database with
//! per-entry expiry and crash-safe snapshots written on every mutation.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheOptions, PersistentCache, SessionCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
