//! Backends for exercising store failure paths in tests.

use async_trait::async_trait;

use super::backend::KvBackend;
use crate::error::{StoreError, StoreResult};

/// Backend whose every call fails at the transport level.
pub(crate) struct BrokenBackend;

#[async_trait]
impl KvBackend for BrokenBackend {
    async fn get(&self, _: &str) -> StoreResult<Option<String>> {
        Err(StoreError::Unavailable)
    }
    async fn set_ex(&self, _: &str, _: &str, _: u64) -> StoreResult<()> {
        Err(StoreError::Unavailable)
    }
    async fn del(&self, _: &str) -> StoreResult<u64> {
        Err(StoreError::Unavailable)
    }
    async fn incr(&self, _: &str) -> StoreResult<i64> {
        Err(StoreError::Unavailable)
    }
    async fn expire(&self, _: &str, _: u64) -> StoreResult<()> {
        Err(StoreError::Unavailable)
    }
    async fn flush(&self) -> StoreResult<()> {
        Err(StoreError::Unavailable)
    }
    fn name(&self) -> &'static str {
        "broken"
    }
}
