//! Cache invalidation helpers for write paths.
//!
//! Invalidation is exact-key: `invalidate("api:videos:no-params")` deletes
//! `<prefix>:api:videos:no-params` and nothing else. There is no wildcard or
//! prefix scan, so a tag only clears the entry whose key it spells out.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use tracing::{info, warn};

use super::{CacheLayerState, CacheRequest};
use crate::store::KvStore;

// == Invalidation Report ==
/// Outcome of an invalidation call. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    /// Keys a delete was attempted for
    pub attempted: Vec<String>,
    /// Keys whose delete the store acknowledged
    pub deleted: Vec<String>,
}

impl InvalidationReport {
    pub fn failed(&self) -> usize {
        self.attempted.len() - self.deleted.len()
    }
}

// == Invalidate ==
/// Deletes the entry at `key(pattern)`.
///
/// The pattern is appended as is, so `"api:videos"` addresses the same key
/// as `store.key(&["api", "videos"])`. Failures are logged, never returned.
pub async fn invalidate(store: &KvStore, pattern: &str) -> InvalidationReport {
    let key = store.key(&[pattern]);
    let mut report = InvalidationReport {
        attempted: vec![key.clone()],
        deleted: Vec::new(),
    };

    if store.delete(&key).await {
        info!("Cache invalidated: {}", key);
        report.deleted.push(key);
    } else {
        warn!("Cache invalidation failed: {}", key);
    }
    report
}

// == Invalidate Tags ==
/// Applies `invalidate` to each tag in order.
///
/// Not atomic: a failure on one tag does not stop or undo the others.
pub async fn invalidate_tags<S: AsRef<str>>(store: &KvStore, tags: &[S]) -> InvalidationReport {
    let mut report = InvalidationReport::default();
    for tag in tags {
        let single = invalidate(store, tag.as_ref()).await;
        report.attempted.extend(single.attempted);
        report.deleted.extend(single.deleted);
    }
    report
}

// == Write-path Layer ==
/// axum middleware evicting cached reads after a successful write.
///
/// A 2xx non-GET request clears the parameterless entry for its own path plus
/// every tag in the route's `CacheOptions`. The response is not modified.
pub async fn invalidate_on_write_layer(
    State(state): State<CacheLayerState>,
    request: Request,
    next: Next,
) -> Response {
    let cache_request = CacheRequest::new(request.method().as_str(), request.uri().path(), None);
    let response = next.run(request).await;

    if cache_request.is_cacheable_method() || !response.status().is_success() {
        return response;
    }

    let store = state.cache.store();
    let own_key = state
        .cache
        .key_for(&CacheRequest::get(cache_request.path.as_str(), None));
    if store.delete(own_key.as_str()).await {
        info!("Cache invalidated after {}: {}", cache_request.method, own_key);
    }
    if !state.options.tags.is_empty() {
        invalidate_tags(store, &state.options.tags).await;
    }

    response
}
