//! API Routes
//!
//! Configures the Axum router: cached `/api/*` proxy groups plus the
//! gateway's own health, stats and cache admin endpoints.

use axum::{
    middleware::from_fn_with_state,
    routing::{any, delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    flush_handler, health_handler, invalidate_handler, invalidate_tags_handler, proxy_handler,
    stats_handler, AppState,
};
use crate::cache::{invalidate_on_write_layer, response_cache_layer, CacheOptions};
use crate::rate::rate_limit_layer;

/// TTL for the category listing, which changes rarely.
pub const CATEGORIES_TTL_SECS: u64 = 14_400;

/// TTL for the popular videos listing.
pub const POPULAR_TTL_SECS: u64 = 7_200;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check with store connectivity
/// - `GET /stats` - Cache statistics
/// - `DELETE /cache/*pattern` - Invalidate one key
/// - `POST /cache/invalidate` - Invalidate a list of tags
/// - `POST /cache/flush` - Clear the store
/// - `ANY /api/*` - Cached, rate limited proxy to the upstream API
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_router(&state))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache/invalidate", post(invalidate_tags_handler))
        .route("/cache/flush", post(flush_handler))
        .route("/cache/*pattern", delete(invalidate_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Listings derived from the video collection.
const VIDEO_LISTING_TAGS: [&str; 2] = ["api:videos/popular:no-params", "api:categories:no-params"];

/// `/api/*` with per-route cache policies behind one rate limit.
fn api_router(state: &AppState) -> Router<AppState> {
    let categories = state.default_options().with_ttl(CATEGORIES_TTL_SECS);
    let popular = state.default_options().with_ttl(POPULAR_TTL_SECS);
    // Any video write invalidates the listings built from the collection
    let listing = state.default_options().with_tags(VIDEO_LISTING_TAGS);
    let video = state
        .default_options()
        .with_tags(VIDEO_LISTING_TAGS.into_iter().chain(["api:videos:no-params"]));

    Router::new()
        .merge(cached(state, "/api/categories", categories))
        .merge(cached(state, "/api/videos/popular", popular))
        .merge(cached(state, "/api/videos", listing))
        .merge(cached(state, "/api/videos/*id", video))
        .merge(cached(state, "/api/*rest", state.default_options()))
        .layer(from_fn_with_state(state.rate.clone(), rate_limit_layer))
}

/// One proxied route with its own cache options.
fn cached(state: &AppState, path: &str, options: CacheOptions) -> Router<AppState> {
    let layer_state = state.cache_layer(options);

    Router::new()
        .route(path, any(proxy_handler))
        .route_layer(from_fn_with_state(layer_state.clone(), response_cache_layer))
        .route_layer(from_fn_with_state(layer_state, invalidate_on_write_layer))
}
