//! API Handlers
//!
//! HTTP request handlers for the gateway's own endpoints and the cached
//! upstream proxy.

use axum::{
    extract::{Path, Request, State},
    response::Response,
    Json,
};
use tracing::info;

use super::upstream::Upstream;
use crate::cache::{invalidate, invalidate_tags, CacheLayerState, CacheOptions, ResponseCache};
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{
    FlushResponse, HealthResponse, InvalidateRequest, InvalidateResponse, StatsResponse,
};
use crate::rate::RateCounter;
use crate::store::KvStore;

/// Application state shared across all handlers.
///
/// Every field is a cheap handle; clones share the same store, statistics
/// and HTTP client.
#[derive(Clone)]
pub struct AppState {
    /// Response cache over the shared store
    pub cache: ResponseCache,
    /// Per-caller request budget for `/api/*`
    pub rate: RateCounter,
    /// Content API being cached
    pub upstream: Upstream,
    /// TTL for routes without an override
    pub default_ttl: u64,
}

impl AppState {
    /// Creates a new AppState over an already opened store.
    pub fn new(store: KvStore, upstream: Upstream, config: &Config) -> Self {
        Self {
            cache: ResponseCache::new(store.clone()),
            rate: RateCounter::new(store, config.rate_limit_max, config.rate_limit_window),
            upstream,
            default_ttl: config.default_ttl,
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the store without waiting for it to connect.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = KvStore::open(&config.store_config());
        let upstream = Upstream::new(&config.upstream_url)?;
        Ok(Self::new(store, upstream, config))
    }

    pub fn store(&self) -> &KvStore {
        self.cache.store()
    }

    /// Layer state for a route group caching with `options`.
    pub fn cache_layer(&self, options: CacheOptions) -> CacheLayerState {
        CacheLayerState::new(self.cache.clone(), options)
    }

    /// Default options for routes without an override.
    pub fn default_options(&self) -> CacheOptions {
        CacheOptions::new().with_ttl(self.default_ttl)
    }
}

/// Handler for `/api/*`
///
/// Relays the request to the upstream content API. Caching and rate
/// limiting are applied by the route layers.
pub async fn proxy_handler(State(state): State<AppState>, request: Request) -> Result<Response> {
    state.upstream.forward(request).await
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let store = state.store();
    Json(StatsResponse::new(
        state.cache.stats(),
        state.cache.in_flight(),
        store.backend_name(),
        store.is_connected(),
    ))
}

/// Handler for GET /health
///
/// The gateway reports healthy while degraded; caching is optional.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.store().is_connected()))
}

/// Handler for DELETE /cache/*pattern
///
/// Deletes the single entry at `<prefix>:<pattern>`.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> Result<Json<InvalidateResponse>> {
    let pattern = pattern.trim_matches('/');
    if pattern.is_empty() {
        return Err(ApiError::InvalidRequest("Pattern cannot be empty".to_string()));
    }

    let report = invalidate(state.store(), pattern).await;
    Ok(Json(InvalidateResponse::new(report)))
}

/// Handler for POST /cache/invalidate
///
/// Deletes the entry for each tag in the body.
pub async fn invalidate_tags_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let report = invalidate_tags(state.store(), &req.tags).await;
    Ok(Json(InvalidateResponse::new(report)))
}

/// Handler for POST /cache/flush
///
/// Clears every key in the store, cached responses and rate counters alike.
pub async fn flush_handler(State(state): State<AppState>) -> Json<FlushResponse> {
    let flushed = state.store().flush().await;
    info!("Cache flush requested: flushed={}", flushed);
    Json(FlushResponse { flushed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use std::sync::Arc;

    fn state() -> AppState {
        let store = KvStore::with_backend("test", Arc::new(MemoryBackend::new(100)));
        let upstream = Upstream::new("http://127.0.0.1:9").unwrap();
        AppState::new(store, upstream, &Config::default())
    }

    #[tokio::test]
    async fn test_invalidate_handler_deletes_key() {
        let state = state();
        let key = state.store().key(&["api", "videos", "no-params"]);
        state.store().set(&key, "{}", 60).await;

        let Json(resp) = invalidate_handler(
            State(state.clone()),
            Path("api:videos:no-params".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(resp.report.deleted, vec![key.clone()]);
        assert!(state.store().get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_handler_rejects_empty_pattern() {
        let result = invalidate_handler(State(state()), Path("/".to_string())).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_invalidate_tags_handler_validates() {
        let req = InvalidateRequest { tags: Vec::new() };
        let result = invalidate_tags_handler(State(state()), Json(req)).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_flush_handler() {
        let state = state();
        state.store().set("test:a", "1", 60).await;

        let Json(resp) = flush_handler(State(state.clone())).await;

        assert!(resp.flushed);
        assert!(state.store().get("test:a").await.is_none());
    }

    #[tokio::test]
    async fn test_flush_handler_degraded() {
        let mut state = state();
        state.cache = ResponseCache::new(KvStore::disconnected("test"));

        let Json(resp) = flush_handler(State(state)).await;
        assert!(!resp.flushed);
    }

    #[tokio::test]
    async fn test_stats_handler_reports_backend() {
        let Json(resp) = stats_handler(State(state())).await;
        assert_eq!(resp.backend, Some("memory"));
        assert!(resp.store_connected);
        assert_eq!(resp.cache.hits, 0);
    }
}
