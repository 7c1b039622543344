//! Cache Store Module
//!
//! In-memory map from key to entry. Every time-dependent method takes the
//! evaluation instant explicitly so callers decide what "now" is.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::cache::{expiry, CacheEntry};

// == Lookup Result ==
/// Outcome of looking a key up at a given instant.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Present and unexpired
    Live(Value),
    /// Present but past its expiry; must be removed before answering
    Expired,
    /// Not present
    Absent,
}

// == Cache Store ==
/// In-memory storage of cache entries.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from already-decoded entries.
    pub fn from_entries(entries: HashMap<String, CacheEntry>) -> Self {
        Self { entries }
    }

    // == Lookup ==
    /// Classifies `key` at `now` without mutating anything.
    pub fn lookup(&self, key: &str, now: DateTime<Utc>) -> Lookup {
        match self.entries.get(key) {
            Some(entry) if entry.is_live_at(now) => Lookup::Live(entry.value.clone()),
            Some(_) => Lookup::Expired,
            None => Lookup::Absent,
        }
    }

    /// Raw access to an entry regardless of expiry.
    #[cfg(test)]
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Insert ==
    /// Inserts or fully replaces an entry, returning the one it displaced.
    pub fn insert(&mut self, key: String, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries.insert(key, entry)
    }

    // == Remove ==
    /// Removes an entry, returning it if it was present.
    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    /// Puts back what a failed mutation displaced.
    ///
    /// `previous` is the value `insert`/`remove` returned for `key`.
    pub fn restore(&mut self, key: &str, previous: Option<CacheEntry>) {
        match previous {
            Some(entry) => {
                self.entries.insert(key.to_string(), entry);
            }
            None => {
                self.entries.remove(key);
            }
        }
    }

    // == Purge Expired ==
    /// Removes all entries expired at `now`.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let expired = expiry::expired_keys(
            self.entries.iter().map(|(key, entry)| (key, entry.expires_at)),
            now,
        );

        for key in &expired {
            self.entries.remove(key);
        }

        expired.len()
    }

    /// Iterates over every entry, live or not.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry)> {
        self.entries.iter()
    }

    // == Length ==
    /// Returns the number of stored entries, including not-yet-purged expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
