//! Cache Store Module
//!
//! The public cache façade: namespaced get/set/remove/clear/list over a
//! durable storage provider, with lazy expiration, usage counting and
//! eviction when the provider runs out of space.
//!
//! The cache keeps no state of its own beyond the provider. Every failure is
//! logged and degrades to a cache miss; nothing is returned to callers as an
//! error.

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::cache::eviction::{self, EvictionOutcome};
use crate::cache::key::{parse_real_key, real_key};
use crate::cache::{Clock, EntryRecord, Envelope, SystemClock};
use crate::error::{CacheError, Result, StorageError};
use crate::storage::{MemoryStorage, StorageProvider};

/// First write plus one retry after eviction
const MAX_WRITE_ATTEMPTS: usize = 2;

// == Store Cache ==
/// Namespaced response cache over a [`StorageProvider`].
#[derive(Debug, Clone)]
pub struct StoreCache<S = MemoryStorage, C = SystemClock> {
    storage: S,
    clock: C,
    /// Host that owns the entries this cache writes
    origin: String,
}

impl<S: StorageProvider> StoreCache<S, SystemClock> {
    // == Constructor ==
    /// Creates a cache for `origin` backed by `storage`, using the wall clock.
    pub fn new(storage: S, origin: impl Into<String>) -> Self {
        Self::with_clock(storage, origin, SystemClock)
    }
}

impl<S: StorageProvider, C: Clock> StoreCache<S, C> {
    /// Creates a cache with an explicit time source.
    pub fn with_clock(storage: S, origin: impl Into<String>, clock: C) -> Self {
        Self {
            storage,
            clock,
            origin: origin.into(),
        }
    }

    // == Accessors ==
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Whether the underlying storage is usable.
    pub fn is_enabled(&self) -> bool {
        self.storage.is_enabled()
    }

    // == Set ==
    /// Stores `value` under `(prefix, key)` with an optional TTL in seconds.
    ///
    /// Best effort: a disabled store, an unserializable value or a store that
    /// is still full after one eviction pass all leave the cache unchanged.
    pub fn set<T>(&self, key: &str, value: &T, prefix: Option<&str>, expire: Option<u64>)
    where
        T: Serialize + ?Sized,
    {
        if !self.is_enabled() {
            return;
        }

        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "value is not serializable, skipping cache write");
                return;
            }
        };

        let real_key = real_key(&self.origin, key, prefix);
        let envelope = Envelope::new(value, expire, self.clock.now_ms());

        match self.write(&real_key, &envelope) {
            Ok(()) => debug!(real_key, expire = envelope.expire, "cache set"),
            Err(e) => warn!(real_key, error = %e, "cache write dropped"),
        }
    }

    // == Get ==
    /// Retrieves the value under `(prefix, key)`.
    ///
    /// Expired and corrupt entries are removed and reported as absent. A hit
    /// bumps the entry's usage count. A stored value that does not decode as
    /// `T` is absent for this caller but left in place.
    pub fn get<T: DeserializeOwned>(&self, key: &str, prefix: Option<&str>) -> Option<T> {
        if !self.is_enabled() {
            return None;
        }

        let real_key = real_key(&self.origin, key, prefix);
        let Some(raw) = self.storage.get(&real_key) else {
            debug!(real_key, "cache miss");
            return None;
        };

        let mut envelope = match Envelope::from_json(&real_key, &raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "dropping unreadable cache entry");
                self.storage.remove(&real_key);
                return None;
            }
        };

        if envelope.is_expired(self.clock.now_ms()) {
            debug!(real_key, "cache entry expired");
            self.storage.remove(&real_key);
            return None;
        }

        let value = match serde_json::from_value::<T>(envelope.value.clone()) {
            Ok(value) => value,
            Err(e) => {
                warn!(real_key, error = %e, "cached value has an unexpected shape");
                return None;
            }
        };

        envelope.used_times += 1;
        if let Err(e) = self.write(&real_key, &envelope) {
            warn!(real_key, error = %e, "failed to record cache usage");
        }

        debug!(real_key, used_times = envelope.used_times, "cache hit");
        Some(value)
    }

    // == Remove ==
    /// Deletes the entry under `(prefix, key)`, if any.
    pub fn remove(&self, key: &str, prefix: Option<&str>) {
        if !self.is_enabled() {
            return;
        }
        self.storage.remove(&real_key(&self.origin, key, prefix));
    }

    // == Clear ==
    /// Wipes the whole storage, including other origins' entries.
    pub fn clear(&self) {
        if !self.is_enabled() {
            return;
        }
        self.storage.clear();
        info!("cache storage cleared");
    }

    // == Get All ==
    /// Enumerates every entry in the storage, across all origins.
    ///
    /// Returns `None` when the storage is disabled. Raw entries that were not
    /// written by this cache are skipped.
    pub fn get_all(&self) -> Option<Vec<EntryRecord>> {
        if !self.is_enabled() {
            return None;
        }

        let records = self
            .storage
            .entries()
            .into_iter()
            .filter_map(|(raw_key, raw)| match decode_record(&raw_key, &raw) {
                Ok(record) => Some(record),
                Err(e @ CacheError::MalformedKey(_)) => {
                    debug!(error = %e, "skipping foreign storage entry");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "skipping unreadable storage entry");
                    None
                }
            })
            .collect();

        Some(records)
    }

    /// Enumerates the entries owned by this cache's origin.
    pub fn get_all_for_current_origin(&self) -> Option<Vec<EntryRecord>> {
        self.get_all().map(|records| {
            records
                .into_iter()
                .filter(|record| record.origin == self.origin)
                .collect()
        })
    }

    // == Write ==
    /// Persists an envelope, evicting once and retrying once if the storage
    /// is full.
    fn write(&self, real_key: &str, envelope: &Envelope) -> Result<()> {
        let raw = envelope.to_json()?;

        let mut attempt = 1;
        loop {
            match self.storage.set(real_key, &raw) {
                Ok(()) => return Ok(()),
                Err(StorageError::CapacityExceeded { needed, available })
                    if attempt < MAX_WRITE_ATTEMPTS =>
                {
                    debug!(real_key, needed, available, "storage full, evicting");
                    self.evict();
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    // == Evict ==
    /// Frees space by removing this origin's expired entries, or its least
    /// used entry when none have expired.
    pub fn evict(&self) -> EvictionOutcome {
        let records = self.get_all_for_current_origin().unwrap_or_default();
        let outcome = eviction::select_victims(records, self.clock.now_ms());

        for victim in outcome.victims() {
            self.remove(&victim.key, victim.prefix.as_deref());
        }

        match &outcome {
            EvictionOutcome::Nothing => info!(origin = %self.origin, "nothing to evict"),
            EvictionOutcome::Expired(records) => {
                info!(origin = %self.origin, removed = records.len(), "evicted expired entries")
            }
            EvictionOutcome::LeastUsed(record) => info!(
                origin = %self.origin,
                key = %record.key,
                used_times = record.used_times,
                "evicted least used entry"
            ),
        }

        outcome
    }
}

fn decode_record(raw_key: &str, raw: &str) -> Result<EntryRecord> {
    let parsed = parse_real_key(raw_key)?;
    let envelope = Envelope::from_json(raw_key, raw)?;

    Ok(EntryRecord {
        origin: parsed.origin,
        key: parsed.key,
        prefix: parsed.prefix,
        value: envelope.value,
        timestamp: envelope.timestamp,
        expire: envelope.expire,
        used_times: envelope.used_times,
    })
}
