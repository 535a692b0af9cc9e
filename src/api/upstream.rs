//! Upstream Proxy
//!
//! Forwards `/api/*` requests to the content API the gateway fronts.

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, HeaderMap},
    response::Response,
};
use reqwest::Client;
use tracing::debug;

use crate::error::{ApiError, Result};

/// Largest request body forwarded upstream.
pub const MAX_FORWARD_BODY: usize = 8 * 1024 * 1024;

/// Upper bound on one upstream round trip.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection-scoped headers that must not cross the proxy.
const HOP_BY_HOP: [header::HeaderName; 8] = [
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::HOST,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// HTTP client bound to the upstream base URL.
#[derive(Debug, Clone)]
pub struct Upstream {
    client: Client,
    base_url: String,
}

impl Upstream {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .user_agent(concat!("vidcache/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends `request` upstream with the same method, path, query, headers
    /// and body, and relays the answer.
    pub async fn forward(&self, request: Request) -> Result<Response> {
        let (parts, body) = request.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("{}{}", self.base_url, path_and_query);

        let body = to_bytes(body, MAX_FORWARD_BODY)
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Unreadable request body: {}", e)))?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);

        debug!("Forwarding {} {}", parts.method, url);
        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);
        let bytes = upstream.bytes().await?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}
