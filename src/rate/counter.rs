//! Fixed-window counter built on `KvStore::increment`.

use serde::Serialize;
use tracing::debug;

use crate::store::{Increment, KvStore};

/// Namespace segment for rate counters.
pub const RATE_NAMESPACE: &str = "ratelimit";

// == Rate Decision ==
/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests counted in the current window; 0 when the store is unavailable
    pub count: u64,
    pub limit: u64,
    pub remaining: u64,
    pub window_secs: u64,
}

// == Rate Counter ==
/// Per-caller request budget of `limit` requests per `window_secs`.
#[derive(Debug, Clone)]
pub struct RateCounter {
    store: KvStore,
    limit: u64,
    window_secs: u64,
}

impl RateCounter {
    pub fn new(store: KvStore, limit: u64, window_secs: u64) -> Self {
        Self {
            store,
            limit,
            window_secs: window_secs.max(1),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Store key holding `caller`'s counter.
    pub fn key_for(&self, caller: &str) -> String {
        self.store.key(&[RATE_NAMESPACE, caller])
    }

    // == Hit ==
    /// Counts one request from `caller` and decides whether it may proceed.
    ///
    /// When the store cannot count, the request is allowed.
    pub async fn hit(&self, caller: &str) -> RateDecision {
        let key = self.key_for(caller);

        match self.store.increment(&key, self.window_secs).await {
            Increment::Counted(count) => RateDecision {
                allowed: count <= self.limit,
                count,
                limit: self.limit,
                remaining: self.limit.saturating_sub(count),
                window_secs: self.window_secs,
            },
            Increment::Unavailable => {
                debug!(caller, "rate counter unavailable, allowing request");
                RateDecision {
                    allowed: true,
                    count: 0,
                    limit: self.limit,
                    remaining: self.limit,
                    window_secs: self.window_secs,
                }
            }
        }
    }
}
