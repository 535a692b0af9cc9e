//! Background Tasks Module
//!
//! Contains background tasks that run alongside the server.
//!
//! # Tasks
//! - TTL Cleanup: Sweeps expired entries from the in-process store
//! - Warm-up: Probes the store and pre-fetches configured paths at startup

mod cleanup;
mod warmup;

pub use cleanup::spawn_cleanup_task;
pub use warmup::{probe_store, spawn_warmup};
