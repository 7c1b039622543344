//! Error types for the session cache
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;
use std::time::Duration;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the session cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found or expired (only produced at the HTTP boundary)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Caller supplied an empty key, a non-positive TTL or a bad body
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Reading or writing the snapshot file failed
    #[error("Persistence failure on {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file exists but could not be parsed
    #[error("Corrupt snapshot at {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The snapshot parsed but its store and timestamp maps disagree
    #[error("Inconsistent snapshot at {}: {reason}", path.display())]
    CorruptSnapshot { path: PathBuf, reason: String },

    /// A durable write did not finish within the configured bound
    #[error("Snapshot write timed out after {0:?}")]
    Timeout(Duration),

    /// The cache was closed and no longer accepts mutations
    #[error("Cache is closed")]
    Closed,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Convenience constructor for I/O failures against the snapshot path.
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// True for failures of the durable layer (as opposed to caller mistakes).
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            CacheError::Persistence { .. }
                | CacheError::Corrupt { .. }
                | CacheError::CorruptSnapshot { .. }
                | CacheError::Timeout(_)
        )
    }
}

// == Body Rejections ==
impl From<JsonRejection> for CacheError {
    fn from(rejection: JsonRejection) -> Self {
        CacheError::InvalidRequest(rejection.body_text())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::Closed => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Persistence { .. }
            | CacheError::Corrupt { .. }
            | CacheError::CorruptSnapshot { .. }
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the session cache.
pub type Result<T> = std::result::Result<T, CacheError>;
