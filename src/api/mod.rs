//! API Module
//!
//! HTTP handlers and routing for the cache gateway.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /stats` - Get cache statistics
//! - `DELETE /cache/*pattern` - Invalidate one cached key
//! - `POST /cache/invalidate` - Invalidate by tag list
//! - `POST /cache/flush` - Clear the store
//! - `ANY /api/*` - Cached proxy to the upstream API

pub mod handlers;
pub mod routes;
pub mod upstream;

pub use handlers::*;
pub use routes::{create_router, CATEGORIES_TTL_SECS, POPULAR_TTL_SECS};
pub use upstream::Upstream;
