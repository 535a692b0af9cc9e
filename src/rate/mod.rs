//! Rate Limiting Module
//!
//! Fixed-window request counters kept in the shared store.
//!
//! The window starts on a caller's first request and is never extended, so a
//! caller timing requests around a window edge can get up to twice the limit
//! through in a short burst.
//!
//! Callers are told apart by the `x-api-key` header when present. The key is
//! not validated here, so a client sending a fresh key per request gets a
//! fresh budget each time; only authenticated keys make the limit binding.
//! Keys are stored and logged as a truncated SHA-256 fingerprint.

mod counter;
mod middleware;

pub use counter::{RateCounter, RateDecision, RATE_NAMESPACE};
pub use middleware::{caller_identity, rate_limit_layer, API_KEY_HEADER};
