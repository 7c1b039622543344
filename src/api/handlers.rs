//! API Handlers
//!
//! HTTP request handlers for each session cache endpoint.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::cache::{CacheOptions, PersistentCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// Holds the one cache instance the process owns; handlers never reach a
/// global.
#[derive(Clone)]
pub struct AppState {
    /// Shared persistent cache
    pub cache: Arc<PersistentCache>,
    /// TTL applied when a request does not carry one
    pub default_ttl: u64,
}

impl AppState {
    /// Creates a new AppState around an opened cache.
    pub fn new(cache: PersistentCache, default_ttl: u64) -> Self {
        Self {
            cache: Arc::new(cache),
            default_ttl,
        }
    }

    /// Opens the cache described by the configuration.
    ///
    /// Fails if the snapshot is unreadable and corruption is not tolerated.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = PersistentCache::open(config.cache_options())?;
        Ok(Self::new(cache, config.default_ttl))
    }

    /// Opens a strict cache at `path`; corrupt snapshots and failed writes are errors.
    pub fn open(path: impl Into<std::path::PathBuf>, default_ttl: u64) -> Result<Self> {
        let cache = PersistentCache::open(CacheOptions::new(path))?;
        Ok(Self::new(cache, default_ttl))
    }
}

/// Handler for PUT /cache
///
/// Stores a value with the request's TTL or the configured default.
/// A body that is not a valid `SetRequest` answers 400 with an error body.
pub async fn set_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SetRequest>, JsonRejection>,
) -> Result<Json<SetResponse>> {
    let Json(req) = payload?;
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.effective_ttl(state.default_ttl);
    state.cache.set(&req.key, req.value, ttl).await?;

    Ok(Json(SetResponse::new(req.key, ttl)))
}

/// Handler for GET /cache/:key
///
/// Absent and expired keys both answer 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /cache/:key
///
/// Succeeds whether or not the key existed.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.cache.delete(&key).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats().await))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.len().await))
}
