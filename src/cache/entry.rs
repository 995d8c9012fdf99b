//! Cache Entry Module
//!
//! The JSON envelope persisted for every cached value, and the flattened
//! record returned by enumeration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CacheError, Result};

// == Envelope ==
/// Persisted unit: the payload plus its expiry and usage metadata.
///
/// Serialized as `{"timestamp":..,"expire":..,"usedTimes":..,"value":..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Creation time (Unix milliseconds)
    pub timestamp: u64,
    /// Time to live in seconds, 0 = never expires
    #[serde(default)]
    pub expire: u64,
    /// Successful reads since creation
    #[serde(default)]
    pub used_times: u64,
    /// The cached payload
    #[serde(default)]
    pub value: Value,
}

impl Envelope {
    // == Constructor ==
    /// Creates a fresh envelope stamped at `now_ms`.
    pub fn new(value: Value, expire: Option<u64>, now_ms: u64) -> Self {
        Self {
            timestamp: now_ms,
            expire: expire.unwrap_or(0),
            used_times: 0,
            value,
        }
    }

    // == Expiry ==
    /// Unix milliseconds at which the entry expires, None = never.
    pub fn expires_at(&self) -> Option<u64> {
        deadline(self.timestamp, self.expire)
    }

    /// Checks if the entry has expired at `now_ms`.
    ///
    /// The boundary counts as expired: once `expire` seconds have fully
    /// elapsed the entry is gone.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at().is_some_and(|at| now_ms >= at)
    }

    // == Serialization ==
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CacheError::Internal(e.to_string()))
    }

    /// Parses a raw stored value. `raw_key` is only used for the error.
    pub fn from_json(raw_key: &str, raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|source| CacheError::CorruptEnvelope {
            key: raw_key.to_string(),
            source,
        })
    }
}

// == Entry Record ==
/// One enumerated entry, flattened with its decoded key components.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    pub origin: String,
    pub key: String,
    pub prefix: Option<String>,
    pub value: Value,
    pub timestamp: u64,
    pub expire: u64,
    pub used_times: u64,
}

impl EntryRecord {
    /// Checks if the entry has expired at `now_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        deadline(self.timestamp, self.expire).is_some_and(|at| now_ms >= at)
    }
}

fn deadline(timestamp: u64, expire: u64) -> Option<u64> {
    (expire > 0).then(|| timestamp.saturating_add(expire.saturating_mul(1000)))
}
