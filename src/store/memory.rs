//! In-Process Backend Module
//!
//! A `KvBackend` held in process memory with TTL expiry and an LRU capacity
//! bound. Serves tests (with `ManualClock`) and single-node `memory://` mode.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::backend::KvBackend;
use super::clock::{Clock, SystemClock};
use super::entry::StoredValue;
use super::lru::LruTracker;
use crate::error::{StoreError, StoreResult};
use crate::lock::mutex_lock;

/// Default capacity of an in-process store.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, StoredValue>,
    lru: LruTracker,
}

impl Inner {
    /// Returns the live entry at `key`, dropping it first if expired.
    fn live_mut(&mut self, key: &str, now_ms: u64) -> Option<&mut StoredValue> {
        if self.entries.get(key).is_some_and(|e| e.is_expired(now_ms)) {
            self.entries.remove(key);
            self.lru.remove(key);
        }
        self.entries.get_mut(key)
    }

    fn insert(&mut self, key: &str, value: StoredValue, max_entries: usize) {
        if !self.entries.contains_key(key) && self.entries.len() >= max_entries {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
            }
        }
        self.entries.insert(key.to_string(), value);
        self.lru.touch(key);
    }
}

// == Memory Backend ==
/// In-process key-value backend.
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
}

impl MemoryBackend {
    /// Creates a backend on the wall clock.
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    /// Creates a backend reading time from `clock`.
    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock,
            max_entries: max_entries.max(1),
        }
    }

    /// Remaining TTL in seconds for a live key.
    pub fn ttl(&self, key: &str) -> Option<u64> {
        let now = self.clock.now_ms();
        let mut inner = mutex_lock(&self.inner, "store::memory", "ttl");
        inner.live_mut(key, now)?.ttl_remaining(now)
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        mutex_lock(&self.inner, "store::memory", "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = self.clock.now_ms();
        let mut inner = mutex_lock(&self.inner, "store::memory", "get");
        let value = inner.live_mut(key, now).map(|e| e.value.clone());
        if value.is_some() {
            inner.lru.touch(key);
        }
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        let now = self.clock.now_ms();
        let entry = StoredValue::new(value.to_string(), now, Some(ttl_seconds));
        let mut inner = mutex_lock(&self.inner, "store::memory", "set_ex");
        inner.insert(key, entry, self.max_entries);
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<u64> {
        let now = self.clock.now_ms();
        let mut inner = mutex_lock(&self.inner, "store::memory", "del");
        if inner.live_mut(key, now).is_none() {
            return Ok(0);
        }
        inner.entries.remove(key);
        inner.lru.remove(key);
        Ok(1)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let now = self.clock.now_ms();
        let mut inner = mutex_lock(&self.inner, "store::memory", "incr");

        if let Some(entry) = inner.live_mut(key, now) {
            let current: i64 = entry.value.parse().map_err(|_| StoreError::InvalidValue {
                key: key.to_string(),
                message: "value is not an integer".to_string(),
            })?;
            let next = current
                .checked_add(1)
                .ok_or_else(|| StoreError::InvalidValue {
                    key: key.to_string(),
                    message: "increment would overflow".to_string(),
                })?;
            entry.value = next.to_string();
            inner.lru.touch(key);
            return Ok(next);
        }

        // Absent keys start at 1 with no expiry, like Redis INCR
        inner.insert(key, StoredValue::new("1".to_string(), now, None), self.max_entries);
        Ok(1)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<()> {
        let now = self.clock.now_ms();
        let mut inner = mutex_lock(&self.inner, "store::memory", "expire");
        if let Some(entry) = inner.live_mut(key, now) {
            entry.expire_in(now, ttl_seconds);
        }
        Ok(())
    }

    async fn flush(&self) -> StoreResult<()> {
        let mut inner = mutex_lock(&self.inner, "store::memory", "flush");
        inner.entries.clear();
        inner.lru.clear();
        Ok(())
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut inner = mutex_lock(&self.inner, "store::memory", "purge_expired");
        let expired: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.entries.remove(key);
            inner.lru.remove(key);
        }
        expired.len()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
