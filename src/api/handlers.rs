//! API Handlers
//!
//! HTTP request handlers for each cache service endpoint.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::cache::StoreCache;
use crate::config::Config;
use crate::error::{CacheError, Result, StorageError};
use crate::models::{
    ClearResponse, DeleteResponse, EntriesQuery, EntriesResponse, EntryScope, GetResponse,
    HealthResponse, PrefixQuery, SetRequest, SetResponse,
};
use crate::storage::MemoryStorage;

/// Application state shared across all handlers.
///
/// The cache sits behind a write-preferring lock so each request's
/// read-modify-write (usage counting on reads) runs without interleaving.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<RwLock<StoreCache>>,
}

impl AppState {
    /// Creates a new AppState with the given cache.
    pub fn new(cache: StoreCache) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the in-memory storage with the configured quota and availability.
    pub fn from_config(config: &Config) -> Self {
        let storage = if !config.storage_enabled {
            MemoryStorage::disabled()
        } else if let Some(quota) = config.quota_bytes {
            MemoryStorage::with_quota(quota)
        } else {
            MemoryStorage::new()
        };
        Self::new(StoreCache::new(storage, config.origin.clone()))
    }
}

/// Handler for PUT /set
///
/// Stores a JSON value under an optional prefix with an optional TTL. The
/// write is best effort: a full store may still drop it.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let cache = state.cache.write().await;
    if !cache.is_enabled() {
        return Err(StorageError::Disabled.into());
    }
    cache.set(&req.key, &req.value, req.prefix.as_deref(), req.expire);

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value by key and optional `?prefix=`.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<PrefixQuery>,
) -> Result<Json<GetResponse>> {
    // Write lock: a hit rewrites the entry's usage count
    let cache = state.cache.write().await;
    let value: Value = cache
        .get(&key, query.prefix.as_deref())
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, query.prefix, value)))
}

/// Handler for DELETE /del/:key
///
/// Removes a key; succeeds whether or not it existed.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<PrefixQuery>,
) -> Json<DeleteResponse> {
    let cache = state.cache.write().await;
    cache.remove(&key, query.prefix.as_deref());

    Json(DeleteResponse::new(key))
}

/// Handler for DELETE /clear
///
/// Wipes the whole storage, every origin included.
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.write().await.clear();
    Json(ClearResponse::new())
}

/// Handler for GET /entries
///
/// Lists stored entries across all origins, or only the service's own origin
/// with `?scope=origin`.
pub async fn entries_handler(
    State(state): State<AppState>,
    Query(query): Query<EntriesQuery>,
) -> Result<Json<EntriesResponse>> {
    let cache = state.cache.read().await;
    let entries = match query.scope {
        EntryScope::All => cache.get_all(),
        EntryScope::Origin => cache.get_all_for_current_origin(),
    }
    .ok_or(StorageError::Disabled)?;

    Ok(Json(EntriesResponse::new(entries)))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let enabled = state.cache.read().await.is_enabled();
    Json(HealthResponse::healthy(enabled))
}
