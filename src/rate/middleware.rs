//! axum rate-limit layer.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::{RateCounter, RateDecision};
use crate::error::ApiError;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Hex characters of the key digest kept in the caller identity.
const KEY_FINGERPRINT_LEN: usize = 16;

/// Identifies the caller: API key fingerprint, then peer address, then
/// `anonymous`.
///
/// The key itself never reaches store keys or logs.
pub fn caller_identity(request: &Request) -> String {
    if let Some(key) = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return format!("key:{}", key_fingerprint(key));
    }

    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "anonymous".to_string(),
    }
}

/// Counts each request against its caller's window and answers 429 once the
/// budget is spent.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn rate_limit_layer(
    State(counter): State<RateCounter>,
    request: Request,
    next: Next,
) -> Response {
    let caller = caller_identity(&request);
    let decision = counter.hit(&caller).await;

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        warn!(
            target: "vidcache::rate",
            caller = %caller,
            count = decision.count,
            limit = decision.limit,
            "rate limit exceeded"
        );
        ApiError::RateLimited {
            retry_after: decision.window_secs,
        }
        .into_response()
    };

    apply_headers(response.headers_mut(), &decision);
    response
}

fn key_fingerprint(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(KEY_FINGERPRINT_LEN);
    digest
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
}
