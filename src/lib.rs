//! vidcache - HTTP response cache in front of the video directory API
//!
//! Caches JSON GET responses in a Redis-compatible store, rate limits
//! callers with fixed-window counters, and keeps serving when the store is
//! unreachable.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod rate;
pub mod store;
pub mod tasks;

mod lock;

pub use api::{create_router, AppState};
pub use cache::{invalidate, invalidate_tags, CacheOptions, ResponseCache};
pub use config::Config;
pub use rate::RateCounter;
pub use store::{Increment, KvStore};
pub use tasks::{spawn_cleanup_task, spawn_warmup};
