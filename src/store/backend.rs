//! Store Backend Module
//!
//! The seam between `KvStore` and whatever actually holds the bytes.

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::info;

use crate::error::{StoreError, StoreResult};

// == Backend Trait ==
/// Raw key-value operations. Implementations report failures; `KvStore`
/// decides how to degrade.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Returns the value at `key`, `None` when absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Stores `value` at `key` with an expiry of `ttl_seconds`.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()>;

    /// Removes `key`, returning how many keys were deleted.
    async fn del(&self, key: &str) -> StoreResult<u64>;

    /// Atomically adds one to the counter at `key`, creating it at 1.
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    /// Sets the expiry of an existing key.
    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<()>;

    /// Removes every key in the current database.
    async fn flush(&self) -> StoreResult<()>;

    /// Drops expired entries the backend does not expire on its own.
    /// Returns how many were removed.
    fn purge_expired(&self) -> usize {
        0
    }

    /// Short backend name for logs and stats.
    fn name(&self) -> &'static str;
}

// == Redis Backend ==
/// Redis-backed store using a reconnecting multiplexed connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Connects to `url`, giving up after `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> StoreResult<Self> {
        let client = Client::open(url)?;
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Unavailable)??;

        info!("Redis connected: {}", redact_url(url));
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        let deleted: u64 = conn.del(key).await?;
        Ok(deleted)
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        let count: i64 = conn.incr(key, 1).await?;
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: bool = conn.expire(key, ttl_seconds as i64).await?;
        Ok(())
    }

    async fn flush(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// Strips credentials from a connection URL before it is logged.
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
