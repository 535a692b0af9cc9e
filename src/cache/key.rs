//! Cache key derivation.
//!
//! Key format: `<prefix>:api:<path without leading "/api/">:<"?" + raw query | "no-params">`.
//! The query string is used exactly as received, so `?a=1&b=2` and `?b=2&a=1`
//! are different entries.

use std::fmt;

use super::CacheRequest;
use crate::store::KeyBuilder;

/// Namespace segment for cached API responses.
pub const API_NAMESPACE: &str = "api";

/// Query segment used when the request has no query string.
pub const NO_PARAMS: &str = "no-params";

const API_PATH_PREFIX: &str = "/api/";

// == Cache Key ==
/// A fully namespaced store key for one cacheable request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// == Derive ==
/// Builds the cache key for `request`.
pub fn derive_cache_key(keys: &KeyBuilder, request: &CacheRequest) -> CacheKey {
    let path = request
        .path
        .strip_prefix(API_PATH_PREFIX)
        .unwrap_or(&request.path);

    let search = match request.query.as_deref() {
        Some(query) if !query.is_empty() => format!("?{query}"),
        _ => NO_PARAMS.to_string(),
    };

    CacheKey(keys.key(&[API_NAMESPACE, path, search.as_str()]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &str, query: Option<&str>) -> String {
        derive_cache_key(&KeyBuilder::default(), &CacheRequest::get(path, query)).into_string()
    }

    #[test]
    fn test_key_without_query() {
        assert_eq!(key("/api/videos", None), "video-directory:api:videos:no-params");
    }

    #[test]
    fn test_empty_query_is_no_params() {
        assert_eq!(key("/api/videos", Some("")), key("/api/videos", None));
    }

    #[test]
    fn test_key_with_query() {
        assert_eq!(
            key("/api/videos/popular", Some("limit=10")),
            "video-directory:api:videos/popular:?limit=10"
        );
    }

    #[test]
    fn test_only_leading_api_prefix_is_stripped() {
        assert_eq!(key("/health", None), "video-directory:api:/health:no-params");
        assert_eq!(
            key("/api/nested/api/x", None),
            "video-directory:api:nested/api/x:no-params"
        );
    }

    #[test]
    fn test_repeated_derivation_is_identical() {
        assert_eq!(
            key("/api/search", Some("q=rust&page=1")),
            key("/api/search", Some("q=rust&page=1"))
        );
    }

    #[test]
    fn test_query_order_gives_distinct_keys() {
        assert_ne!(
            key("/api/videos", Some("a=1&b=2")),
            key("/api/videos", Some("b=2&a=1"))
        );
    }

    #[test]
    fn test_method_does_not_affect_key() {
        let keys = KeyBuilder::default();
        let get = derive_cache_key(&keys, &CacheRequest::new("GET", "/api/x", None));
        let head = derive_cache_key(&keys, &CacheRequest::new("HEAD", "/api/x", None));
        assert_eq!(get, head);
    }
}
