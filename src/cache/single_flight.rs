//! In-flight miss coalescing.
//!
//! The first request to miss on a key becomes the leader and runs the
//! handler; requests missing on the same key meanwhile follow and receive the
//! leader's result. A leader that is dropped without completing (cancelled or
//! panicked) releases its followers with no result.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use super::ApiResponse;
use crate::lock::mutex_lock;

#[derive(Debug, Clone)]
enum FlightState {
    Pending,
    Done(Option<ApiResponse>),
}

type Calls = Mutex<HashMap<String, (u64, watch::Receiver<FlightState>)>>;

// == Single Flight ==
/// Registry of handler runs currently in progress, by cache key.
#[derive(Debug, Default)]
pub struct SingleFlight {
    calls: Arc<Calls>,
    next_id: AtomicU64,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the flight for `key`, starting one if none is running.
    pub fn join(&self, key: &str) -> Flight {
        let mut calls = mutex_lock(&self.calls, "cache::single_flight", "join");

        if let Some((_, rx)) = calls.get(key) {
            return Flight::Follower(Follower { rx: rx.clone() });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(FlightState::Pending);
        calls.insert(key.to_string(), (id, rx));

        Flight::Leader(Leader {
            key: key.to_string(),
            id,
            tx,
            calls: self.calls.clone(),
        })
    }

    /// Number of keys with a handler run in progress.
    pub fn in_flight(&self) -> usize {
        mutex_lock(&self.calls, "cache::single_flight", "in_flight").len()
    }
}

// == Flight ==
/// Role of a request within a flight.
#[derive(Debug)]
pub enum Flight {
    Leader(Leader),
    Follower(Follower),
}

/// Handle held by the request that runs the handler.
#[derive(Debug)]
pub struct Leader {
    key: String,
    id: u64,
    tx: watch::Sender<FlightState>,
    calls: Arc<Calls>,
}

impl Leader {
    /// Publishes the result to followers and ends the flight.
    ///
    /// `None` tells followers the result is theirs to compute.
    pub fn complete(self, result: Option<ApiResponse>) {
        let _ = self.tx.send(FlightState::Done(result));
    }
}

impl Drop for Leader {
    fn drop(&mut self) {
        let mut calls = mutex_lock(&self.calls, "cache::single_flight", "leave");
        if calls.get(&self.key).is_some_and(|(id, _)| *id == self.id) {
            calls.remove(&self.key);
        }
    }
}

/// Handle held by a request waiting on someone else's handler run.
#[derive(Debug)]
pub struct Follower {
    rx: watch::Receiver<FlightState>,
}

impl Follower {
    /// Waits for the leader. `None` when the leader had nothing shareable or
    /// went away.
    pub async fn wait(mut self) -> Option<ApiResponse> {
        let state = self
            .rx
            .wait_for(|state| matches!(state, FlightState::Done(_)))
            .await
            .ok()?;

        match &*state {
            FlightState::Done(result) => result.clone(),
            FlightState::Pending => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_first_join_leads_second_follows() {
        let flights = SingleFlight::new();

        let leader = flights.join("k");
        let follower = flights.join("k");
        assert!(matches!(leader, Flight::Leader(_)));
        assert!(matches!(follower, Flight::Follower(_)));
        assert_eq!(flights.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_follower_receives_leader_result() {
        let flights = SingleFlight::new();

        let Flight::Leader(leader) = flights.join("k") else {
            panic!("expected leader");
        };
        let Flight::Follower(follower) = flights.join("k") else {
            panic!("expected follower");
        };

        let waiter = tokio::spawn(follower.wait());
        leader.complete(Some(ApiResponse::ok(json!({"x": 1}))));

        let result = waiter.await.unwrap();
        assert_eq!(result, Some(ApiResponse::ok(json!({"x": 1}))));
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_dropped_leader_releases_followers() {
        let flights = SingleFlight::new();

        let leader = flights.join("k");
        let Flight::Follower(follower) = flights.join("k") else {
            panic!("expected follower");
        };

        drop(leader);
        assert_eq!(follower.wait().await, None);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_new_flight_after_completion() {
        let flights = SingleFlight::new();

        if let Flight::Leader(leader) = flights.join("k") {
            leader.complete(None);
        }
        assert!(matches!(flights.join("k"), Flight::Leader(_)));
    }

    #[tokio::test]
    async fn test_keys_fly_independently() {
        let flights = SingleFlight::new();

        let _a = flights.join("a");
        assert!(matches!(flights.join("b"), Flight::Leader(_)));
    }
}
