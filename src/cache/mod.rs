//! Cache Module
//!
//! Response caching for read endpoints on top of `KvStore`.

mod invalidation;
mod key;
mod middleware;
mod single_flight;
mod stats;

#[cfg(test)]
mod property_tests;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use invalidation::{
    invalidate, invalidate_on_write_layer, invalidate_tags, InvalidationReport,
};
pub use key::{derive_cache_key, CacheKey, API_NAMESPACE, NO_PARAMS};
pub use middleware::{response_cache_layer, CacheLayerState, ResponseCache};
pub use single_flight::{Flight, SingleFlight};
pub use stats::{CacheStats, CacheStatsSnapshot};

use crate::store::DEFAULT_TTL_SECS;

// == Public Constants ==
/// Diagnostic header reporting whether the store served the response.
pub const X_CACHE: &str = "x-cache";

/// `X-Cache` value for responses read from the store.
pub const CACHE_HIT: &str = "HIT";

/// `X-Cache` value for responses produced by the handler.
pub const CACHE_MISS: &str = "MISS";

// == Cache Options ==
/// Per-route caching policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Lifetime of stored responses, also advertised in `Cache-Control`
    pub ttl_seconds: u64,
    /// Invalidation labels for this route. Advisory: not part of the key
    pub tags: Vec<String>,
    /// Skip the store entirely
    pub bypass_cache: bool,
    /// Let concurrent misses on one key share a single handler run
    pub coalesce_misses: bool,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn bypass(mut self, bypass_cache: bool) -> Self {
        self.bypass_cache = bypass_cache;
        self
    }

    pub fn coalesce(mut self, coalesce_misses: bool) -> Self {
        self.coalesce_misses = coalesce_misses;
        self
    }

    /// `Cache-Control` value advertised on cached routes.
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.ttl_seconds)
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECS,
            tags: Vec::new(),
            bypass_cache: false,
            coalesce_misses: true,
        }
    }
}

// == Cache Request ==
/// The parts of a request that decide cacheability and the cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    /// HTTP method, upper case
    pub method: String,
    /// URL path, e.g. `/api/videos`
    pub path: String,
    /// Raw query string without the leading `?`, if any
    pub query: Option<String>,
}

impl CacheRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>, query: Option<&str>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            query: query.map(str::to_string),
        }
    }

    /// Shorthand for a GET request.
    pub fn get(path: impl Into<String>, query: Option<&str>) -> Self {
        Self::new("GET", path, query)
    }

    /// Splits a `path?query` string into a request.
    pub fn from_url(method: impl Into<String>, url: &str) -> Self {
        match url.split_once('?') {
            Some((path, query)) => Self::new(method, path, Some(query)),
            None => Self::new(method, url, None),
        }
    }

    /// Only GET responses are ever cached.
    pub fn is_cacheable_method(&self) -> bool {
        self.method == "GET"
    }
}

// == API Response ==
/// Serializable response exchanged with wrapped handlers and stored in the
/// cache as `{ data, headers, status }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(rename = "data")]
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    /// 200 OK with a JSON body.
    pub fn ok(body: serde_json::Value) -> Self {
        Self::new(200, body)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Header lookup by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Status in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Adds `X-Cache` and `Cache-Control` to the response.
    pub fn mark(mut self, outcome: &str, options: &CacheOptions) -> Self {
        self.headers.insert(X_CACHE.to_string(), outcome.to_string());
        self.headers
            .insert("cache-control".to_string(), options.cache_control());
        self
    }
}
