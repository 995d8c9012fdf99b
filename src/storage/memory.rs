//! In-Memory Storage Module
//!
//! A quota-limited, cloneable storage provider. Clones share the same map and
//! quota, which models several origins writing into one device-wide store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use super::StorageProvider;
use crate::error::StorageError;

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, String>,
    /// Bytes used by keys and values together
    used: usize,
    /// Maximum bytes, None = unlimited
    quota: Option<usize>,
}

// == Memory Storage ==
/// Shared in-memory store with an optional byte quota.
///
/// Usage is measured as the byte length of every key plus its value.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
    enabled: bool,
}

impl MemoryStorage {
    // == Constructors ==
    /// Creates an unlimited, enabled store.
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
            enabled: true,
        }
    }

    /// Creates an enabled store that refuses writes beyond `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        let storage = Self::new();
        storage.set_quota(Some(quota_bytes));
        storage
    }

    /// Creates a store that reports itself as unavailable.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    // == Accessors ==
    /// Bytes currently in use.
    pub fn used_bytes(&self) -> usize {
        self.lock().used
    }

    /// Configured quota, if any.
    pub fn quota(&self) -> Option<usize> {
        self.lock().quota
    }

    /// Changes the quota for every clone. Entries already stored are kept
    /// even if they exceed the new limit.
    pub fn set_quota(&self, quota_bytes: Option<usize>) {
        self.lock().quota = quota_bytes;
    }

    /// Number of raw entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves the map itself consistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageProvider for MemoryStorage {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn get(&self, raw_key: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.lock().entries.get(raw_key).cloned()
    }

    fn set(&self, raw_key: &str, raw_value: &str) -> Result<(), StorageError> {
        if !self.enabled {
            return Err(StorageError::Disabled);
        }

        let mut inner = self.lock();
        let replaced = inner
            .entries
            .get(raw_key)
            .map(|old| raw_key.len() + old.len())
            .unwrap_or(0);
        let needed = raw_key.len() + raw_value.len();
        let used_after = inner.used - replaced + needed;

        if let Some(quota) = inner.quota {
            if used_after > quota {
                return Err(StorageError::CapacityExceeded {
                    needed,
                    available: quota.saturating_sub(inner.used - replaced),
                });
            }
        }

        inner
            .entries
            .insert(raw_key.to_string(), raw_value.to_string());
        inner.used = used_after;
        trace!(raw_key, used = used_after, "storage write");
        Ok(())
    }

    fn remove(&self, raw_key: &str) {
        if !self.enabled {
            return;
        }
        let mut inner = self.lock();
        if let Some(old) = inner.entries.remove(raw_key) {
            inner.used -= raw_key.len() + old.len();
        }
    }

    fn clear(&self) {
        if !self.enabled {
            return;
        }
        let mut inner = self.lock();
        inner.entries.clear();
        inner.used = 0;
    }

    fn entries(&self) -> Vec<(String, String)> {
        if !self.enabled {
            return Vec::new();
        }
        self.lock()
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let storage = MemoryStorage::new();
        storage.set("a", "1").unwrap();

        assert_eq!(storage.get("a"), Some("1".to_string()));
        assert_eq!(storage.used_bytes(), 2);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_overwrite_accounts_for_old_value() {
        let storage = MemoryStorage::with_quota(10);
        storage.set("k", "123456789").unwrap();

        // Replacing in place must not count the old value twice
        storage.set("k", "abcdefghi").unwrap();
        assert_eq!(storage.used_bytes(), 10);
    }

    #[test]
    fn test_quota_exceeded() {
        let storage = MemoryStorage::with_quota(8);
        storage.set("a", "123").unwrap();

        let result = storage.set("b", "123456");
        assert_eq!(
            result,
            Err(StorageError::CapacityExceeded {
                needed: 7,
                available: 4
            })
        );
        assert_eq!(storage.get("b"), None);
        assert_eq!(storage.used_bytes(), 4);
    }

    #[test]
    fn test_remove_frees_space() {
        let storage = MemoryStorage::with_quota(8);
        storage.set("a", "1234567").unwrap();
        assert!(storage.set("b", "1").is_err());

        storage.remove("a");
        assert_eq!(storage.used_bytes(), 0);
        assert!(storage.set("b", "1").is_ok());
    }

    #[test]
    fn test_tightened_quota_keeps_entries() {
        let storage = MemoryStorage::new();
        storage.set("a", "12345").unwrap();
        storage.clone().set_quota(Some(3));

        assert_eq!(storage.quota(), Some(3));
        assert_eq!(storage.get("a"), Some("12345".to_string()));
        assert!(storage.set("b", "1").is_err());
    }

    #[test]
    fn test_clones_share_state() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.set("shared", "yes").unwrap();

        assert_eq!(other.get("shared"), Some("yes".to_string()));
        other.clear();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_entries_sorted_by_key() {
        let storage = MemoryStorage::new();
        storage.set("b", "2").unwrap();
        storage.set("a", "1").unwrap();

        let entries = storage.entries();
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
    }

    #[test]
    fn test_disabled_storage() {
        let storage = MemoryStorage::disabled();

        assert!(!storage.is_enabled());
        assert_eq!(storage.set("a", "1"), Err(StorageError::Disabled));
        assert_eq!(storage.get("a"), None);
        assert!(storage.entries().is_empty());
        storage.remove("a");
        storage.clear();
    }
}
