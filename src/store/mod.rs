//! Store Module
//!
//! Best-effort client over a remote key-value service. Every operation
//! degrades to a miss (`None` / `false` / `Unavailable`) instead of failing,
//! so the store can slow requests down but never break them.

mod backend;
mod clock;
mod entry;
mod keys;
mod lru;
mod memory;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

pub use backend::{redact_url, KvBackend, RedisBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::StoredValue;
pub use keys::{KeyBuilder, DEFAULT_KEY_PREFIX, KEY_SEPARATOR};
pub use lru::LruTracker;
pub use memory::{MemoryBackend, DEFAULT_MAX_ENTRIES};

use crate::error::{StoreError, StoreResult};

// == Public Constants ==
/// TTL applied when a caller does not pick one.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// URL selecting the in-process backend.
pub const MEMORY_URL: &str = "memory://";

// == Store Config ==
/// Connection settings for `KvStore::open`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Connection URL; `None` leaves the store degraded
    pub url: Option<String>,
    /// Top-level key namespace
    pub key_prefix: String,
    /// Upper bound on the initial connection attempt
    pub connect_timeout: Duration,
    /// Capacity when `memory://` is selected
    pub memory_max_entries: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            connect_timeout: Duration::from_secs(5),
            memory_max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

// == Increment Outcome ==
/// Result of `KvStore::increment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    /// Counter value after the increment (always >= 1)
    Counted(u64),
    /// The store could not be reached or the key held a non-counter
    Unavailable,
}

impl Increment {
    /// Counter value, with `0` standing in for `Unavailable`.
    pub fn count(self) -> u64 {
        match self {
            Increment::Counted(n) => n,
            Increment::Unavailable => 0,
        }
    }

    pub fn is_counted(self) -> bool {
        matches!(self, Increment::Counted(_))
    }
}

// == Key Value Store ==
/// Never-failing facade over an optional `KvBackend`.
///
/// Cloning is cheap and clones share the same connection.
#[derive(Clone)]
pub struct KvStore {
    keys: KeyBuilder,
    backend: Arc<RwLock<Option<Arc<dyn KvBackend>>>>,
    healthy: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

impl KvStore {
    // == Constructors ==
    /// A store that is permanently in degraded mode.
    pub fn disconnected(prefix: impl Into<String>) -> Self {
        Self {
            keys: KeyBuilder::new(prefix),
            backend: Arc::new(RwLock::new(None)),
            healthy: Arc::new(AtomicBool::new(false)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A store bound to an explicit backend.
    pub fn with_backend(prefix: impl Into<String>, backend: Arc<dyn KvBackend>) -> Self {
        let store = Self::disconnected(prefix);
        store.attach(backend);
        store
    }

    /// Opens a store from configuration without blocking on the network.
    ///
    /// `memory://` attaches an in-process backend immediately. Any other URL
    /// is connected on a background task; the store stays degraded until that
    /// succeeds, and for good if it fails. Must be called inside a Tokio
    /// runtime when a remote URL is configured.
    pub fn open(config: &StoreConfig) -> Self {
        let store = Self::disconnected(config.key_prefix.clone());

        match config.url.as_deref().map(str::trim) {
            None | Some("") => {
                warn!("No store URL configured; response caching disabled");
            }
            Some(MEMORY_URL) => {
                info!(
                    "Using in-process store (max_entries={})",
                    config.memory_max_entries
                );
                store.attach(Arc::new(MemoryBackend::new(config.memory_max_entries)));
            }
            Some(url) => {
                let url = url.to_string();
                let timeout = config.connect_timeout;
                let handle = store.clone();
                tokio::spawn(async move {
                    match RedisBackend::connect(&url, timeout).await {
                        Ok(backend) => {
                            handle.attach(Arc::new(backend));
                        }
                        Err(e) => warn!(
                            "Store connection to {} failed, running degraded: {}",
                            redact_url(&url),
                            e
                        ),
                    }
                });
            }
        }

        store
    }

    // == Lifecycle ==
    /// Installs `backend`; later calls use it. Refused once the store has
    /// been closed, so a late background connect cannot revive it.
    pub fn attach(&self, backend: Arc<dyn KvBackend>) -> bool {
        let name = backend.name();
        let mut slot = match self.backend.write() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if self.closed.load(Ordering::Acquire) {
            info!("Store closed, not attaching backend={}", name);
            return false;
        }
        *slot = Some(backend);
        self.healthy.store(true, Ordering::Relaxed);
        info!("Store attached: backend={}", name);
        true
    }

    /// Detaches the backend for good. Every later operation is a no-op miss.
    pub fn close(&self) {
        let previous = {
            let mut slot = match self.backend.write() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
            };
            self.closed.store(true, Ordering::Release);
            slot.take()
        };
        self.healthy.store(false, Ordering::Relaxed);
        if let Some(backend) = previous {
            info!("Store closed: backend={}", backend.name());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// True when a backend is attached and the last call to it succeeded.
    pub fn is_connected(&self) -> bool {
        self.current().is_some() && self.healthy.load(Ordering::Relaxed)
    }

    /// Name of the attached backend, if any.
    pub fn backend_name(&self) -> Option<&'static str> {
        self.current().map(|b| b.name())
    }

    // == Keys ==
    /// Builds a namespaced key from `parts`.
    pub fn key<S: AsRef<str>>(&self, parts: &[S]) -> String {
        self.keys.key(parts)
    }

    pub fn key_builder(&self) -> &KeyBuilder {
        &self.keys
    }

    // == Raw Operations ==
    /// Raw value at `key`, or `None` when absent, expired, or unreachable.
    pub async fn get(&self, key: &str) -> Option<String> {
        let result = match self.current() {
            Some(backend) => backend.get(key).await,
            None => return None,
        };
        self.settle("GET", key, result).flatten()
    }

    /// Stores `value` at `key` for `ttl_seconds`. Returns `false` on failure.
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> bool {
        let result = match self.current() {
            Some(backend) => backend.set_ex(key, value, ttl_seconds).await,
            None => return false,
        };
        self.settle("SET", key, result).is_some()
    }

    /// Removes `key`. Deleting an absent key still returns `true`.
    pub async fn delete(&self, key: &str) -> bool {
        let result = match self.current() {
            Some(backend) => backend.del(key).await,
            None => return false,
        };
        self.settle("DEL", key, result).is_some()
    }

    /// Clears the whole store. Returns `false` on failure.
    pub async fn flush(&self) -> bool {
        let result = match self.current() {
            Some(backend) => backend.flush().await,
            None => return false,
        };
        self.settle("FLUSH", "*", result).is_some()
    }

    /// Sweeps expired entries from an in-process backend.
    pub fn purge_expired(&self) -> usize {
        self.current().map(|b| b.purge_expired()).unwrap_or(0)
    }

    // == JSON Helpers ==
    /// Decodes the JSON value at `key`. Malformed JSON reads as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Ignoring malformed JSON at {}: {}", key, e);
                None
            }
        }
    }

    /// Encodes `value` as JSON and stores it. Returns `false` on failure.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> bool {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl_seconds).await,
            Err(e) => {
                warn!("Store SET_JSON error for {}: {}", key, StoreError::from(e));
                false
            }
        }
    }

    // == Counter ==
    /// Adds one to the counter at `key`.
    ///
    /// The expiry is set only when the counter is created, so later
    /// increments inside the window never extend it.
    pub async fn increment(&self, key: &str, ttl_seconds: u64) -> Increment {
        let Some(backend) = self.current() else {
            return Increment::Unavailable;
        };

        let count = match self.settle("INCR", key, backend.incr(key).await) {
            Some(count) if count > 0 => count as u64,
            Some(count) => {
                warn!("Store INCR returned non-positive count {} for {}", count, key);
                return Increment::Unavailable;
            }
            None => return Increment::Unavailable,
        };

        if count == 1 {
            let result = backend.expire(key, ttl_seconds).await;
            self.settle("EXPIRE", key, result)
                .map(|_| Increment::Counted(count))
                .unwrap_or(Increment::Unavailable)
        } else {
            Increment::Counted(count)
        }
    }

    // == Internals ==
    fn current(&self) -> Option<Arc<dyn KvBackend>> {
        match self.backend.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Converts a backend result into an option, logging and recording
    /// failures.
    fn settle<T>(&self, op: &'static str, key: &str, result: StoreResult<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.healthy.store(true, Ordering::Relaxed);
                Some(value)
            }
            Err(e) => {
                self.healthy.store(false, Ordering::Relaxed);
                warn!("Store {} error for {}: {}", op, key, e);
                None
            }
        }
    }
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore")
            .field("prefix", &self.keys.prefix())
            .field("backend", &self.backend_name())
            .field("connected", &self.is_connected())
            .finish()
    }
}
