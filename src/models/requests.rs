//! Request DTOs for the cache service API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 2048;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON payload
/// - `prefix`: Optional namespace
/// - `expire`: Optional TTL in seconds (0 or absent = never expires)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional namespace prefix
    #[serde(default)]
    pub prefix: Option<String>,
    /// Optional TTL in seconds
    #[serde(default)]
    pub expire: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            ));
        }
        None
    }
}

/// Query string for the keyed endpoints (`?prefix=...`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrefixQuery {
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Which entries GET /entries lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryScope {
    /// Every origin sharing the storage
    #[default]
    All,
    /// Only the service's own origin
    Origin,
}

/// Query string for GET /entries (`?scope=all|origin`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntriesQuery {
    #[serde(default)]
    pub scope: EntryScope,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": {"items": [1, 2]}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, json!({"items": [1, 2]}));
        assert!(req.prefix.is_none());
        assert!(req.expire.is_none());
    }

    #[test]
    fn test_set_request_with_prefix_and_expire() {
        let json = r#"{"key": "test", "value": "hello", "prefix": "api", "expire": 60}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.prefix.as_deref(), Some("api"));
        assert_eq!(req.expire, Some(60));
    }

    #[test]
    fn test_validate_empty_key() {
        let req = SetRequest {
            key: "".to_string(),
            value: json!("test"),
            prefix: None,
            expire: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = SetRequest {
            key: "valid_key".to_string(),
            value: json!("test"),
            prefix: None,
            expire: Some(60),
        };
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_entry_scope_deserialize() {
        let q: EntriesQuery = serde_json::from_str(r#"{"scope": "origin"}"#).unwrap();
        assert_eq!(q.scope, EntryScope::Origin);

        let q: EntriesQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.scope, EntryScope::All);
    }
}
