//! Startup Warm-up Task
//!
//! Probes the store and pre-fetches popular paths through the cached router
//! so the first real callers see hits.

use axum::{body::Body, http::Request, Router};
use tokio::task::JoinHandle;
use tower::ServiceExt;
use tracing::{debug, info, warn};

use crate::cache::X_CACHE;
use crate::store::KvStore;

/// TTL of the probe key written at startup.
const PROBE_TTL_SECS: u64 = 10;

/// Writes and reads back a short-lived probe key.
///
/// Returns `true` when the store answered both calls.
pub async fn probe_store(store: &KvStore) -> bool {
    let key = store.key(&["warmup"]);
    if !store.set(&key, "test", PROBE_TTL_SECS).await {
        return false;
    }
    store.get(&key).await.is_some()
}

/// Spawns the fire-and-forget warm-up. Serving never waits on it.
///
/// Each path is requested once through `app`, so it is cached with the same
/// key and TTL a client request would produce.
pub fn spawn_warmup(store: KvStore, app: Router, paths: Vec<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !probe_store(&store).await {
            warn!("Cache warm-up skipped: store not reachable");
            return;
        }
        info!("Cache warm-up started for {} paths", paths.len());

        let mut warmed = 0usize;
        for path in &paths {
            let request = match Request::get(path.as_str()).body(Body::empty()) {
                Ok(request) => request,
                Err(e) => {
                    warn!("Cache warm-up: invalid path {}: {}", path, e);
                    continue;
                }
            };

            match app.clone().oneshot(request).await {
                Ok(response) if response.status().is_success() => {
                    warmed += 1;
                    debug!(
                        "Cache warm-up: {} -> {:?}",
                        path,
                        response.headers().get(X_CACHE)
                    );
                }
                Ok(response) => warn!("Cache warm-up: {} returned {}", path, response.status()),
                Err(e) => match e {},
            }
        }

        info!("Cache warm-up complete: {}/{} paths", warmed, paths.len());
    })
}
