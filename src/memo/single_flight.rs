//! Single-Flight Module
//!
//! Async front for a [`Memoizer`] where only one computation per key is in
//! flight: the first caller computes, concurrent callers for the same key
//! wait for its result.
//!
//! If the computing caller fails or is dropped, its error stays with it,
//! nothing is stored, and the waiting callers retry (one of them becomes the
//! next leader).

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use crate::cache::{CacheKey, Clock, SystemClock};
use crate::error::MemoError;
use crate::memo::{CallArgs, Memoizer};

type Flights<V> = Mutex<HashMap<CacheKey, watch::Receiver<Option<V>>>>;

enum Flight<V> {
    Cached(V),
    Leader(watch::Sender<Option<V>>),
    Follower(watch::Receiver<Option<V>>),
}

// == Single Flight ==
/// Deduplicates concurrent misses on the same key.
pub struct SingleFlight<V, C = SystemClock> {
    cache: Memoizer<V, C>,
    in_flight: Arc<Flights<V>>,
}

impl<V, C> Clone for SingleFlight<V, C> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<V: Clone, C: Clock> SingleFlight<V, C> {
    pub fn new(cache: Memoizer<V, C>) -> Self {
        Self {
            cache,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn cache(&self) -> &Memoizer<V, C> {
        &self.cache
    }

    /// Number of keys currently being computed.
    pub fn in_flight(&self) -> usize {
        self.flights().len()
    }

    // == Get Or Compute ==
    /// Serves `args` from the cache, joins an in-flight computation for the
    /// same key, or runs `func` as the leader.
    pub async fn get_or_compute<F, Fut, E>(&self, args: &CallArgs, func: F) -> Result<V, E>
    where
        F: FnOnce(CallArgs) -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: From<MemoError>,
    {
        let key = self.cache.derive_key(args)?;

        let sender = loop {
            match self.join_or_lead(&key) {
                Flight::Cached(value) => {
                    self.cache.record_hit();
                    return Ok(value);
                }
                Flight::Leader(sender) => break sender,
                Flight::Follower(mut receiver) => {
                    debug!(key = %key, "waiting on in-flight computation");
                    if let Some(value) = wait_for(&mut receiver).await {
                        self.cache.record_hit();
                        return Ok(value);
                    }
                    debug!(key = %key, "in-flight computation abandoned, retrying");
                }
            }
        };

        // Dropped on every exit, including cancellation of this future
        let _landing = Landing {
            flights: &self.in_flight,
            key: &key,
        };

        debug!(key = %key, "cache miss, computing as leader");
        let forwarded = self.cache.forwarded(args).into_owned();
        match func(forwarded).await {
            Ok(value) => {
                self.cache.store(key.clone(), value.clone());
                sender.send_replace(Some(value.clone()));
                Ok(value)
            }
            Err(err) => {
                self.cache.record_failure();
                debug!(key = %key, "computation failed, nothing stored");
                Err(err)
            }
        }
    }

    // The cache is checked under the flights lock: a leader stores its value
    // before deregistering, so a missing flight with a missing value means
    // nobody is computing this key. Only the leader's pass counts as a miss.
    fn join_or_lead(&self, key: &CacheKey) -> Flight<V> {
        let mut flights = self.flights();
        if let Some(value) = self.cache.peek(key) {
            return Flight::Cached(value);
        }
        if let Some(receiver) = flights.get(key) {
            return Flight::Follower(receiver.clone());
        }
        self.cache.record_miss(key);
        let (sender, receiver) = watch::channel(None);
        flights.insert(key.clone(), receiver);
        Flight::Leader(sender)
    }

    fn flights(&self) -> MutexGuard<'_, HashMap<CacheKey, watch::Receiver<Option<V>>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Waits for the leader's value; None if the leader went away without one.
async fn wait_for<V: Clone>(receiver: &mut watch::Receiver<Option<V>>) -> Option<V> {
    loop {
        let current = receiver.borrow_and_update().as_ref().cloned();
        if current.is_some() {
            return current;
        }
        if receiver.changed().await.is_err() {
            return receiver.borrow().as_ref().cloned();
        }
    }
}

/// Deregisters the leader's flight when dropped.
struct Landing<'a, V> {
    flights: &'a Flights<V>,
    key: &'a CacheKey,
}

impl<V> Drop for Landing<'_, V> {
    fn drop(&mut self) {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        flights.remove(self.key);
    }
}
