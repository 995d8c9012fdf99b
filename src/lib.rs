//! Store Cache - A quota-aware response cache over durable key/value storage
//!
//! Caches JSON payloads per origin and namespace with lazy TTL expiration,
//! usage counting, and eviction when the storage runs out of space.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod request;
pub mod storage;

pub use api::AppState;
pub use cache::StoreCache;
pub use config::Config;
pub use request::{DataManager, RequestOptions};
pub use storage::{MemoryStorage, StorageProvider};
