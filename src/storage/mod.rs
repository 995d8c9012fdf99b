//! Storage Module
//!
//! The durable key/value primitive the cache is layered on. Keys and values
//! are plain strings; the cache owns serialization.

mod memory;

pub use memory::MemoryStorage;

use crate::error::StorageError;

// == Storage Provider ==
/// A synchronous string-keyed store, shared by every origin on the device.
///
/// Implementations must report a full store through
/// [`StorageError::CapacityExceeded`] so the cache can run its eviction policy.
pub trait StorageProvider: Send + Sync {
    /// Whether the store is usable at all.
    fn is_enabled(&self) -> bool;

    /// Returns the raw value stored under `raw_key`.
    fn get(&self, raw_key: &str) -> Option<String>;

    /// Writes `raw_value` under `raw_key`, replacing any previous value.
    fn set(&self, raw_key: &str, raw_value: &str) -> Result<(), StorageError>;

    /// Deletes `raw_key`. Missing keys are ignored.
    fn remove(&self, raw_key: &str);

    /// Deletes everything in the store.
    fn clear(&self);

    /// Every raw pair currently stored, in the provider's enumeration order.
    fn entries(&self) -> Vec<(String, String)>;
}
