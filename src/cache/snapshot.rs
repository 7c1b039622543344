//! Snapshot Persistence
//!
//! Encodes the whole store into a single JSON document and replaces the
//! durable file atomically: the bytes go to a temporary file in the same
//! directory, are fsynced, and only then renamed over the old snapshot.
//!
//! File layout:
//!
//! ```json
//! {
//!   "store":      { "u1": {"name": "alice"} },
//!   "timestamps": { "u1": "2026-10-20T09:15:00.123456Z" }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::Builder;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheStore};
use crate::error::{CacheError, Result};

/// Prefix of in-flight temporary snapshot files.
pub const TEMP_PREFIX: &str = ".session_cache-";

// == File Format ==
#[derive(Serialize)]
struct SnapshotRef<'a> {
    store: BTreeMap<&'a str, &'a Value>,
    timestamps: BTreeMap<&'a str, String>,
}

#[derive(Deserialize)]
struct SnapshotFile {
    store: HashMap<String, Value>,
    timestamps: HashMap<String, String>,
}

// == Encode ==
/// Serializes every entry of `store`, expired ones included.
pub fn encode(store: &CacheStore) -> Result<Vec<u8>> {
    let mut snapshot = SnapshotRef {
        store: BTreeMap::new(),
        timestamps: BTreeMap::new(),
    };

    for (key, entry) in store.iter() {
        snapshot.store.insert(key.as_str(), &entry.value);
        snapshot
            .timestamps
            .insert(key.as_str(), format_timestamp(entry.expires_at));
    }

    serde_json::to_vec(&snapshot)
        .map_err(|e| CacheError::Internal(format!("Failed to serialize snapshot: {}", e)))
}

// == Decode ==
/// Parses snapshot bytes read from `path`.
///
/// The two maps must cover exactly the same keys.
pub fn decode(path: &Path, bytes: &[u8]) -> Result<CacheStore> {
    let file: SnapshotFile = serde_json::from_slice(bytes).map_err(|source| CacheError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;

    let SnapshotFile {
        store,
        mut timestamps,
    } = file;

    let mut entries = HashMap::with_capacity(store.len());
    for (key, value) in store {
        let raw = timestamps
            .remove(&key)
            .ok_or_else(|| CacheError::CorruptSnapshot {
                path: path.to_path_buf(),
                reason: format!("key '{}' has no expiry timestamp", key),
            })?;
        let expires_at = parse_timestamp(&raw).ok_or_else(|| CacheError::CorruptSnapshot {
            path: path.to_path_buf(),
            reason: format!("key '{}' has unreadable timestamp '{}'", key, raw),
        })?;
        entries.insert(key, CacheEntry { value, expires_at });
    }

    if let Some(orphan) = timestamps.keys().next() {
        return Err(CacheError::CorruptSnapshot {
            path: path.to_path_buf(),
            reason: format!("timestamp for '{}' has no stored value", orphan),
        });
    }

    Ok(CacheStore::from_entries(entries))
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}

/// Accepts RFC 3339 and offset-less ISO-8601 stamps (read as UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// == Load ==
/// Reads the snapshot at `path`.
///
/// Returns `Ok(None)` when no file exists yet.
pub fn load(path: &Path) -> Result<Option<CacheStore>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::persistence(path, e)),
    };

    decode(path, &bytes).map(Some)
}

/// Moves an unreadable snapshot out of the way so it is kept for inspection.
///
/// The target `<path>.corrupt-<stamp>-<random>` is reserved by creating it
/// exclusively first, so an earlier quarantined file is never replaced.
pub fn quarantine(path: &Path) -> Result<PathBuf> {
    let dir = parent_dir(path);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".to_string());
    let prefix = format!(
        "{}.corrupt-{}-",
        file_name,
        Utc::now().format("%Y%m%dT%H%M%S")
    );

    let target = Builder::new()
        .prefix(&prefix)
        .rand_bytes(6)
        .tempfile_in(dir)
        .map_err(|e| CacheError::persistence(dir, e))?
        .into_temp_path()
        .keep()
        .map_err(|e| CacheError::persistence(dir, e.error))?;

    if let Err(e) = fs::rename(path, &target) {
        let _ = fs::remove_file(&target);
        return Err(CacheError::persistence(path, e));
    }
    Ok(target)
}

// == Write Gate ==
#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum GateState {
    #[default]
    Pending,
    Committing,
    Cancelled,
}

/// Decides, exactly once, whether an in-flight write may rename into place.
///
/// The writer calls `begin_commit` just before the rename; a caller that gave
/// up waiting calls `cancel`. Whichever gets there first wins.
#[derive(Debug, Default)]
pub struct WriteGate {
    state: Mutex<GateState>,
}

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the write was cancelled and must be discarded.
    pub fn begin_commit(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        match *state {
            GateState::Pending | GateState::Committing => {
                *state = GateState::Committing;
                true
            }
            GateState::Cancelled => false,
        }
    }

    /// Returns false if the writer is already committing; the caller must
    /// then wait for it to finish.
    pub fn cancel(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        match *state {
            GateState::Pending | GateState::Cancelled => {
                *state = GateState::Cancelled;
                true
            }
            GateState::Committing => false,
        }
    }
}

// == Atomic Write ==
/// Writes `bytes` as the new snapshot at `path`.
///
/// Returns `Ok(false)` when `gate` was cancelled before the rename, in which
/// case the previous snapshot is untouched.
pub fn write_atomic(path: &Path, bytes: &[u8], gate: &WriteGate) -> Result<bool> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir).map_err(|e| CacheError::persistence(dir, e))?;

    let mut tmp = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| CacheError::persistence(dir, e))?;

    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| CacheError::persistence(tmp.path(), e))?;

    if !gate.begin_commit() {
        debug!("Snapshot write cancelled before commit, discarding {:?}", tmp.path());
        return Ok(false);
    }

    tmp.persist(path)
        .map_err(|e| CacheError::persistence(path, e.error))?;

    // The rename is done; a failed directory sync only weakens power-loss durability.
    if let Err(e) = sync_dir(dir) {
        warn!("Failed to sync snapshot directory {:?}: {}", dir, e);
    }

    Ok(true)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}
