//! LRU Tracker Module
//!
//! Access-order bookkeeping for the in-process backend's capacity bound.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Tracks key recency with a monotonically increasing tick.
///
/// `ticks` maps key -> last tick; `order` maps tick -> key, so the oldest key
/// is always the first entry of `order`.
#[derive(Debug, Default)]
pub struct LruTracker {
    next_tick: u64,
    ticks: HashMap<String, u64>,
    order: BTreeMap<u64, String>,
}

impl LruTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used.
    pub fn touch(&mut self, key: &str) {
        self.remove(key);
        let tick = self.next_tick;
        self.next_tick += 1;
        self.ticks.insert(key.to_string(), tick);
        self.order.insert(tick, key.to_string());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        if let Some(tick) = self.ticks.remove(key) {
            self.order.remove(&tick);
        }
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
        self.order.clear();
    }
}
