//! Response cache middleware.
//!
//! `ResponseCache::handle` wraps any async handler producing an `ApiResponse`;
//! `response_cache_layer` adapts it to an axum router. Caching only ever
//! adds: when the store misbehaves the handler's own response goes out.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, instrument, warn};

use super::{
    derive_cache_key, ApiResponse, CacheKey, CacheOptions, CacheRequest, CacheStats,
    CacheStatsSnapshot, Flight, SingleFlight, CACHE_HIT, CACHE_MISS,
};
use crate::store::KvStore;

/// Largest response body the axum layer will buffer for caching.
pub const MAX_CACHEABLE_BODY: usize = 4 * 1024 * 1024;

/// Headers describing the connection or the encoded body, never stored.
const UNSTORED_HEADERS: [&str; 6] = [
    "connection",
    "content-length",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
    "x-cache",
];

// == Response Cache ==
/// Response cache bound to one store. Clones share store, stats and flights.
#[derive(Clone)]
pub struct ResponseCache {
    store: KvStore,
    stats: Arc<CacheStats>,
    flights: Arc<SingleFlight>,
}

impl ResponseCache {
    pub fn new(store: KvStore) -> Self {
        Self {
            store,
            stats: Arc::new(CacheStats::new()),
            flights: Arc::new(SingleFlight::new()),
        }
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of keys whose handler is currently running under coalescing.
    pub fn in_flight(&self) -> usize {
        self.flights.in_flight()
    }

    pub fn key_for(&self, request: &CacheRequest) -> CacheKey {
        derive_cache_key(self.store.key_builder(), request)
    }

    /// True when `request` must go straight to the handler.
    pub fn bypasses(&self, request: &CacheRequest, options: &CacheOptions) -> bool {
        !request.is_cacheable_method() || options.bypass_cache
    }

    // == Handle ==
    /// Serves `request` from the store or through `handler`.
    ///
    /// Hits never run the handler. Misses run it and store 2xx results for
    /// `options.ttl_seconds`. Handler errors are returned unchanged.
    #[instrument(skip_all, fields(method = %request.method, path = %request.path))]
    pub async fn handle<F, Fut, E>(
        &self,
        request: &CacheRequest,
        options: &CacheOptions,
        handler: F,
    ) -> Result<ApiResponse, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ApiResponse, E>>,
    {
        if self.bypasses(request, options) {
            self.stats.record_bypass();
            return handler().await;
        }

        let key = self.key_for(request);

        if let Some(cached) = self.store.get_json::<ApiResponse>(key.as_str()).await {
            self.stats.record_hit();
            debug!(cache = "store", outcome = "hit", key = %key, "serving cached response");
            return Ok(cached.mark(CACHE_HIT, options));
        }

        self.stats.record_miss();
        debug!(cache = "store", outcome = "miss", key = %key, "cache miss, executing handler");

        if !options.coalesce_misses {
            return self.fill(&key, options, handler).await;
        }

        match self.flights.join(key.as_str()) {
            Flight::Leader(leader) => {
                let result = self.fill(&key, options, handler).await;
                if let Ok(response) = &result {
                    if response.is_success() {
                        leader.complete(Some(response.clone()));
                    }
                }
                result
            }
            Flight::Follower(follower) => match follower.wait().await {
                Some(shared) => {
                    self.stats.record_coalesced();
                    debug!(key = %key, "miss coalesced onto in-flight request");
                    Ok(shared.mark(CACHE_MISS, options))
                }
                None => self.fill(&key, options, handler).await,
            },
        }
    }

    /// Runs the handler and stores a 2xx result.
    async fn fill<F, Fut, E>(
        &self,
        key: &CacheKey,
        options: &CacheOptions,
        handler: F,
    ) -> Result<ApiResponse, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ApiResponse, E>>,
    {
        let response = handler().await?;

        if !response.is_success() {
            self.stats.record_uncacheable();
            debug!(key = %key, status = response.status, "not caching non-2xx response");
            return Ok(response);
        }

        if !self
            .store
            .set_json(key.as_str(), &response, options.ttl_seconds)
            .await
        {
            self.stats.record_store_write_failure();
            debug!(key = %key, "response not stored");
        }

        Ok(response.mark(CACHE_MISS, options))
    }

    pub(crate) fn record_uncacheable(&self) {
        self.stats.record_uncacheable();
    }

    pub(crate) fn record_bypass(&self) {
        self.stats.record_bypass();
    }
}

// == Axum Layer ==
/// State for `response_cache_layer`: the shared cache plus this route
/// group's options.
#[derive(Clone)]
pub struct CacheLayerState {
    pub cache: ResponseCache,
    pub options: CacheOptions,
}

impl CacheLayerState {
    pub fn new(cache: ResponseCache, options: CacheOptions) -> Self {
        Self { cache, options }
    }
}

/// axum middleware caching JSON GET responses.
///
/// Use with `axum::middleware::from_fn_with_state`. Non-JSON and non-2xx
/// responses pass through untouched and uncached.
pub async fn response_cache_layer(
    State(state): State<CacheLayerState>,
    request: Request,
    next: Next,
) -> Response {
    let cache_request = CacheRequest::new(
        request.method().as_str(),
        request.uri().path(),
        request.uri().query(),
    );

    if state.cache.bypasses(&cache_request, &state.options) {
        state.cache.record_bypass();
        return next.run(request).await;
    }

    let result = state
        .cache
        .handle(&cache_request, &state.options, || async move {
            into_api_response(next.run(request).await).await
        })
        .await;

    match result {
        Ok(response) => from_api_response(response),
        Err(passthrough) => {
            state.cache.record_uncacheable();
            passthrough
        }
    }
}

/// Buffers a successful JSON response into an `ApiResponse`.
///
/// Anything else comes back as `Err` carrying the response to send as is.
async fn into_api_response(response: Response) -> Result<ApiResponse, Response> {
    if !response.status().is_success() || !is_json(&response) || exceeds_limit(&response) {
        return Err(response);
    }

    let (parts, body) = response.into_parts();
    // Buffer without a cap so an oversize body can still be sent on uncached
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to buffer response body: {}", e);
            return Err(StatusCode::BAD_GATEWAY.into_response());
        }
    };
    if bytes.len() > MAX_CACHEABLE_BODY {
        debug!(size = bytes.len(), "response too large to cache");
        return Err(Response::from_parts(parts, Body::from(bytes)));
    }

    let body = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(_) => return Err(Response::from_parts(parts, Body::from(bytes))),
    };

    let headers: BTreeMap<String, String> = parts
        .headers
        .iter()
        .filter(|(name, _)| !UNSTORED_HEADERS.contains(&name.as_str()))
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    Ok(ApiResponse {
        status: parts.status.as_u16(),
        headers,
        body,
    })
}

/// Renders an `ApiResponse` as an axum response with a JSON body.
fn from_api_response(response: ApiResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    let body = match serde_json::to_vec(&response.body) {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to encode cached body: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut out = Response::new(Body::from(body));
    *out.status_mut() = status;

    let headers = out.headers_mut();
    for (name, value) in &response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!("Dropping unrepresentable header {}", name),
        }
    }
    headers
        .entry(header::CONTENT_TYPE)
        .or_insert(HeaderValue::from_static("application/json"));

    out
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// True when the body is known to be over `MAX_CACHEABLE_BODY` before
/// reading it, from `Content-Length` or the body's own size hint.
fn exceeds_limit(response: &Response) -> bool {
    let declared = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let hinted = response.body().size_hint().lower();

    declared.unwrap_or(0).max(hinted) > MAX_CACHEABLE_BODY as u64
}
