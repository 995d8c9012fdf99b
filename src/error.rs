//! Error types for the store cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Storage Error Enum ==
/// Failures reported by a durable storage provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The provider is unavailable in this environment
    #[error("Storage is disabled")]
    Disabled,

    /// The write would exceed the provider's quota
    #[error("Storage quota exceeded: needed {needed} bytes, {available} available")]
    CapacityExceeded { needed: usize, available: usize },

    /// Any other provider-specific failure
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

// == Cache Error Enum ==
/// Unified error type for the cache and its HTTP surface.
///
/// The cache itself never returns these to callers of `StoreCache`; they are
/// produced internally, logged, and mapped to "absent".
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache (or expired)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Stored value is not a valid envelope
    #[error("Corrupt envelope under '{key}': {source}")]
    CorruptEnvelope {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Raw storage key does not decode to origin, prefix and key
    #[error("Malformed storage key: {0}")]
    MalformedKey(String),

    /// Durable storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Storage(StorageError::Disabled) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Storage(StorageError::CapacityExceeded { .. }) => {
                StatusCode::INSUFFICIENT_STORAGE
            }
            CacheError::CorruptEnvelope { .. }
            | CacheError::MalformedKey(_)
            | CacheError::Storage(StorageError::Backend(_))
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the store cache.
pub type Result<T> = std::result::Result<T, CacheError>;
