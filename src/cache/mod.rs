//! Cache Module
//!
//! File-backed key/value cache with per-entry TTL and crash-safe snapshots.

pub mod entry;
pub mod expiry;
mod persistent;
mod session;
pub mod snapshot;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use persistent::{CacheOptions, PersistentCache};
pub use session::SessionCache;
pub use stats::{CacheStats, StatsRecorder};
pub use store::{CacheStore, Lookup};
