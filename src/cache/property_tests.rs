//! Property-Based Tests for the Cache Module
//!
//! Uses proptest to check key derivation and store-backed caching behaviour.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use crate::cache::{derive_cache_key, ApiResponse, CacheOptions, CacheRequest, ResponseCache};
use crate::store::{KeyBuilder, KvStore, ManualClock, MemoryBackend};

// == Strategies ==
/// URL path segments after `/api/`
fn path_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,16}(/[a-z0-9_-]{1,16}){0,3}".prop_map(|s| format!("/api/{s}"))
}

/// Query strings of one to four `k=v` pairs
fn query_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z]{1,6}=[a-z0-9]{0,6}", 1..4).prop_map(|pairs| pairs.join("&"))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // **Property 1: Deterministic Key Derivation**
    // Deriving the key twice for the same path and query yields the same key,
    // and the key embeds the query verbatim.
    #[test]
    fn prop_key_derivation_is_deterministic(
        path in path_strategy(),
        query in prop::option::of(query_strategy()),
    ) {
        let keys = KeyBuilder::default();
        let request = CacheRequest::get(path.clone(), query.as_deref());

        let first = derive_cache_key(&keys, &request);
        let second = derive_cache_key(&keys, &CacheRequest::get(path, query.as_deref()));
        prop_assert_eq!(&first, &second);

        match query {
            Some(q) => {
                let suffix = format!(":?{q}");
                prop_assert!(first.as_str().ends_with(&suffix))
            }
            None => prop_assert!(first.as_str().ends_with(":no-params")),
        }
    }

    // **Property 2: Distinct Requests, Distinct Keys**
    // Two different query strings on the same path never share a key.
    #[test]
    fn prop_different_queries_do_not_collide(
        path in path_strategy(),
        a in query_strategy(),
        b in query_strategy(),
    ) {
        prop_assume!(a != b);
        let keys = KeyBuilder::default();

        let ka = derive_cache_key(&keys, &CacheRequest::get(path.clone(), Some(&a)));
        let kb = derive_cache_key(&keys, &CacheRequest::get(path, Some(&b)));
        prop_assert_ne!(ka, kb);
    }

    // **Property 3: Hit Round-trip**
    // For any 2xx JSON body, the second identical GET is a HIT with the same
    // body, and the handler ran exactly once.
    #[test]
    fn prop_hit_round_trip(
        path in path_strategy(),
        status in 200u16..300,
        value in any::<i64>(),
    ) {
        let rt = runtime();
        let store = KvStore::with_backend("prop", Arc::new(MemoryBackend::new(100)));
        let cache = ResponseCache::new(store);
        let request = CacheRequest::get(path, None);
        let options = CacheOptions::default();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let (first, second) = rt.block_on(async {
            let run = || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(ApiResponse::new(status, json!({ "value": value })))
            };
            let first = cache.handle(&request, &options, run).await.unwrap();
            let second = cache.handle(&request, &options, run).await.unwrap();
            (first, second)
        });

        prop_assert_eq!(first.header("x-cache"), Some("MISS"));
        prop_assert_eq!(second.header("x-cache"), Some("HIT"));
        prop_assert_eq!(second.status, status);
        prop_assert_eq!(&second.body, &first.body);
        prop_assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    // **Property 4: Non-2xx Bypass**
    // Responses outside [200, 300) always reach the handler and are never stored.
    #[test]
    fn prop_non_success_never_cached(
        status in prop_oneof![100u16..200, 300u16..600],
        repeats in 1usize..5,
    ) {
        let rt = runtime();
        let backend = Arc::new(MemoryBackend::new(100));
        let cache = ResponseCache::new(KvStore::with_backend("prop", backend.clone()));
        let request = CacheRequest::get("/api/videos", None);
        let options = CacheOptions::default();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        rt.block_on(async {
            for _ in 0..repeats {
                let response = cache
                    .handle(&request, &options, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, Infallible>(ApiResponse::new(status, json!(null)))
                    })
                    .await
                    .unwrap();
                assert!(response.header("x-cache").is_none());
            }
        });

        prop_assert_eq!(counter.load(Ordering::SeqCst), repeats);
        prop_assert!(backend.is_empty());
    }

    // **Property 5: Fixed Window Counter**
    // Within a window the counter counts 1..=n; once the window ends it
    // restarts at 1 regardless of how many calls were made.
    #[test]
    fn prop_counter_resets_after_window(calls in 1u64..50, window in 1u64..120) {
        let rt = runtime();
        let clock = ManualClock::new(0);
        let backend = MemoryBackend::with_clock(100, Arc::new(clock.clone()));
        let store = KvStore::with_backend("prop", Arc::new(backend));

        rt.block_on(async {
            for expected in 1..=calls {
                assert_eq!(store.increment("c", window).await.count(), expected);
            }
            clock.advance_secs(window);
            assert_eq!(store.increment("c", window).await.count(), 1);
        });
    }
}
