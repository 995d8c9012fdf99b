//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;

/// Default storage quota, matching the common browser local-storage limit
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Origin (host name) that owns the entries written by this service
    pub origin: String,
    /// Storage quota in bytes, None = unlimited
    pub quota_bytes: Option<usize>,
    /// Whether the storage is available at all
    pub storage_enabled: bool,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ORIGIN` - Origin the cache writes under (default: localhost)
    /// - `STORAGE_QUOTA_BYTES` - Storage quota, 0 = unlimited (default: 5 MiB)
    /// - `STORAGE_ENABLED` - `false` or `0` disables storage (default: true)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            origin: env::var("CACHE_ORIGIN")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.origin),
            quota_bytes: env::var("STORAGE_QUOTA_BYTES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .map(|v| (v > 0).then_some(v))
                .unwrap_or(defaults.quota_bytes),
            storage_enabled: env::var("STORAGE_ENABLED")
                .ok()
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.storage_enabled),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: "localhost".to_string(),
            quota_bytes: Some(DEFAULT_QUOTA_BYTES),
            storage_enabled: true,
            server_port: 3000,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
