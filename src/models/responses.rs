//! Response DTOs for the cache admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStatsSnapshot, InvalidationReport};

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub cache: CacheStatsSnapshot,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Keys with a handler run currently shared by coalesced requests
    pub in_flight: usize,
    /// Attached store backend, null when degraded
    pub backend: Option<&'static str>,
    pub store_connected: bool,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(
        cache: CacheStatsSnapshot,
        in_flight: usize,
        backend: Option<&'static str>,
        store_connected: bool,
    ) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            cache,
            in_flight,
            backend,
            store_connected,
        }
    }
}

/// Response body for the health endpoint (GET /health)
///
/// The gateway is healthy without its store; `store` reports whether caching
/// is currently active.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// "connected" or "degraded"
    pub store: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(store_connected: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            store: if store_connected { "connected" } else { "degraded" }.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for invalidation endpoints
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: InvalidationReport,
}

impl InvalidateResponse {
    pub fn new(report: InvalidationReport) -> Self {
        Self {
            message: format!(
                "Invalidated {} of {} keys",
                report.deleted.len(),
                report.attempted.len()
            ),
            report,
        }
    }
}

/// Response body for POST /cache/flush
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    pub flushed: bool,
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
