//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::store::{StoreConfig, DEFAULT_KEY_PREFIX, DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECS};

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Key-value store URL; unset means caching is disabled
    pub redis_url: Option<String>,
    /// Top-level namespace for every store key
    pub key_prefix: String,
    /// Default TTL in seconds for cached responses
    pub default_ttl: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the content API being cached
    pub upstream_url: String,
    /// Requests allowed per caller per window
    pub rate_limit_max: u64,
    /// Rate limit window in seconds
    pub rate_limit_window: u64,
    /// Seconds to wait for the initial store connection
    pub store_connect_timeout: u64,
    /// Capacity of the in-process store (`memory://`)
    pub max_entries: usize,
    /// In-process store cleanup interval in seconds
    pub cleanup_interval: u64,
    /// API paths fetched through the cache at startup
    pub warmup_paths: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `REDIS_URL` - Store URL, `memory://` for in-process (default: unset)
    /// - `CACHE_KEY_PREFIX` - Key namespace (default: video-directory)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `UPSTREAM_URL` - Content API base URL (default: http://127.0.0.1:3001)
    /// - `RATE_LIMIT_MAX` - Requests per window (default: 100)
    /// - `RATE_LIMIT_WINDOW` - Window in seconds (default: 60)
    /// - `STORE_CONNECT_TIMEOUT` - Seconds (default: 5)
    /// - `MAX_ENTRIES` - In-process store capacity (default: 10000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `WARMUP_PATHS` - Comma separated paths (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: env::var("REDIS_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            key_prefix: env::var("CACHE_KEY_PREFIX")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.key_prefix),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            upstream_url: env::var("UPSTREAM_URL")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.upstream_url),
            rate_limit_max: parse_var("RATE_LIMIT_MAX").unwrap_or(defaults.rate_limit_max),
            rate_limit_window: parse_var("RATE_LIMIT_WINDOW")
                .unwrap_or(defaults.rate_limit_window),
            store_connect_timeout: parse_var("STORE_CONNECT_TIMEOUT")
                .unwrap_or(defaults.store_connect_timeout),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            warmup_paths: env::var("WARMUP_PATHS")
                .map(|v| parse_paths(&v))
                .unwrap_or_default(),
        }
    }

    /// Store connection settings derived from this config.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            url: self.redis_url.clone(),
            key_prefix: self.key_prefix.clone(),
            connect_timeout: Duration::from_secs(self.store_connect_timeout),
            memory_max_entries: self.max_entries,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            default_ttl: DEFAULT_TTL_SECS,
            server_port: 3000,
            upstream_url: "http://127.0.0.1:3001".to_string(),
            rate_limit_max: 100,
            rate_limit_window: 60,
            store_connect_timeout: 5,
            max_entries: DEFAULT_MAX_ENTRIES,
            cleanup_interval: 1,
            warmup_paths: Vec::new(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_paths(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
