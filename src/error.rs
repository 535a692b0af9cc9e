//! Error types for the cache gateway
//!
//! Store errors stay inside the store client; API errors become HTTP responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Store Error Enum ==
/// Failures raised by a key-value backend.
///
/// `KvStore` maps every variant to its degraded return value, so these never
/// reach request handlers.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No backend attached (not configured, not yet connected, or closed)
    #[error("Store unavailable")]
    Unavailable,

    /// Transport or protocol failure from the remote service
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Value could not be encoded or decoded as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value has the wrong shape for the operation
    #[error("Invalid value at {key}: {message}")]
    InvalidValue { key: String, message: String },
}

// == API Error Enum ==
/// Errors surfaced to HTTP clients.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Caller exceeded its request budget for the current window
    #[error("Rate limit exceeded")]
    RateLimited { retry_after: u64 },

    /// Upstream API could not be reached or answered garbage
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        let mut response = (status, body).into_response();
        if let ApiError::RateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

// == Result Type Aliases ==
/// Result of a raw backend operation.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
