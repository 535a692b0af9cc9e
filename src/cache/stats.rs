//! Cache Statistics Module
//!
//! Counters for the response cache, shared by every request.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Lock-free response cache counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    bypassed: AtomicU64,
    uncacheable: AtomicU64,
    store_write_failures: AtomicU64,
    coalesced: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Served from the store.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Looked up and not found.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Non-GET or bypassed request handed straight to the handler.
    pub fn record_bypass(&self) {
        self.bypassed.fetch_add(1, Ordering::Relaxed);
    }

    /// Handler answered outside 2xx or with a body that cannot be stored.
    pub fn record_uncacheable(&self) {
        self.uncacheable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_write_failure(&self) {
        self.store_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Miss answered by another request's in-flight handler run.
    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            uncacheable: self.uncacheable.load(Ordering::Relaxed),
            store_write_failures: self.store_write_failures.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
        }
    }
}

// == Snapshot ==
/// Point-in-time copy of `CacheStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub bypassed: u64,
    pub uncacheable: u64,
    pub store_write_failures: u64,
    pub coalesced: u64,
}

impl CacheStatsSnapshot {
    // == Hit Rate ==
    /// hits / (hits + misses), or 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = CacheStats::new().snapshot();
        assert_eq!(stats, CacheStatsSnapshot::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::new().snapshot().hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.snapshot().hit_rate(), 0.75);
    }

    #[test]
    fn test_counters_are_independent() {
        let stats = CacheStats::new();
        stats.record_bypass();
        stats.record_uncacheable();
        stats.record_uncacheable();
        stats.record_store_write_failure();
        stats.record_coalesced();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.bypassed, 1);
        assert_eq!(snapshot.uncacheable, 2);
        assert_eq!(snapshot.store_write_failures, 1);
        assert_eq!(snapshot.coalesced, 1);
        assert_eq!(snapshot.hits + snapshot.misses, 0);
    }
}
