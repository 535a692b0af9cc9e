//! Stored Value Module
//!
//! A single value held by the in-process backend, with expiry bookkeeping.

// == Stored Value ==
/// A raw string value plus its expiry, both in clock milliseconds.
#[derive(Debug, Clone)]
pub struct StoredValue {
    /// The stored value
    pub value: String,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoredValue {
    // == Constructor ==
    /// Creates a value that expires `ttl_seconds` after `now_ms`.
    pub fn new(value: String, now_ms: u64, ttl_seconds: Option<u64>) -> Self {
        Self {
            value,
            expires_at: ttl_seconds.map(|ttl| expiry(now_ms, ttl)),
        }
    }

    // == Is Expired ==
    /// An entry is expired once `now_ms` reaches its expiration time.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires,
            None => false,
        }
    }

    // == Expire ==
    /// Sets a fresh expiry relative to `now_ms`.
    pub fn expire_in(&mut self, now_ms: u64, ttl_seconds: u64) {
        self.expires_at = Some(expiry(now_ms, ttl_seconds));
    }

    // == Time To Live ==
    /// Remaining lifetime in seconds; `Some(0)` once expired, `None` when persistent.
    pub fn ttl_remaining(&self, now_ms: u64) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(now_ms) / 1000)
    }
}

/// Expiry timestamp, pinned to `u64::MAX` for absurdly long TTLs.
fn expiry(now_ms: u64, ttl_seconds: u64) -> u64 {
    now_ms.saturating_add(ttl_seconds.saturating_mul(1000))
}
