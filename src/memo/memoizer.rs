//! Memoizer Module
//!
//! Wraps computations with a [`CacheStore`]: derive key, serve a live entry,
//! otherwise compute, store and return.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::cache::{CacheKey, CacheStats, CacheStore, Clock, SystemClock};
use crate::config::{CacheConfig, NamedArgs};
use crate::error::{MemoError, Result};
use crate::memo::{CallArgs, KeyDeriver, TypedRepr};

// == Memoizer ==
/// A bounded TTL cache that memoizes computations over [`CallArgs`].
///
/// Clones share the same store. The store lock is held only around lookups
/// and stores, never while the wrapped function runs, so two concurrent
/// misses on one key may both compute; see
/// [`SingleFlight`](crate::memo::SingleFlight) to prevent that.
pub struct Memoizer<V, C = SystemClock> {
    store: Arc<Mutex<CacheStore<V, C>>>,
    keys: Arc<dyn KeyDeriver>,
    named_args: NamedArgs,
}

impl<V, C> Clone for Memoizer<V, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            keys: Arc::clone(&self.keys),
            named_args: self.named_args,
        }
    }
}

impl<V, C> fmt::Debug for Memoizer<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoizer")
            .field("named_args", &self.named_args)
            .finish_non_exhaustive()
    }
}

impl<V: Clone> Memoizer<V, SystemClock> {
    // == Constructor ==
    /// Creates a memoizer on the wall clock with the default key scheme.
    ///
    /// Fails with [`MemoError::Config`] on a zero `maxsize` or `timeout`.
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<V: Clone, C: Clock> Memoizer<V, C> {
    /// Creates a memoizer reading time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: C) -> Result<Self> {
        let store = CacheStore::with_clock(&config, clock)?;
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            keys: Arc::new(TypedRepr),
            named_args: config.named_args,
        })
    }

    /// Replaces the key derivation scheme.
    pub fn with_key_deriver(mut self, keys: impl KeyDeriver + 'static) -> Self {
        self.keys = Arc::new(keys);
        self
    }

    // == Wrap ==
    /// Returns `func` memoized through this cache.
    pub fn wrap<F>(&self, func: F) -> Memoized<F, V, C>
    where
        F: Fn(&CallArgs) -> V,
    {
        Memoized {
            cache: self.clone(),
            func,
        }
    }

    /// Returns a fallible `func` memoized through this cache.
    ///
    /// Only successful results are stored.
    pub fn wrap_fallible<F, E>(&self, func: F) -> TryMemoized<F, V, C>
    where
        F: Fn(&CallArgs) -> std::result::Result<V, E>,
        E: From<MemoError>,
    {
        TryMemoized {
            cache: self.clone(),
            func,
        }
    }

    // == Get Or Compute ==
    /// Serves `args` from the cache or computes it with `func`.
    pub fn get_or_compute<F>(&self, args: &CallArgs, func: F) -> Result<V>
    where
        F: FnOnce(&CallArgs) -> V,
    {
        self.try_get_or_compute(args, |args| Ok::<V, MemoError>(func(args)))
    }

    /// Fallible variant of [`get_or_compute`](Self::get_or_compute).
    ///
    /// A failure from `func` is returned unchanged and leaves the cache as it
    /// was. Key derivation failures are converted into `E`.
    pub fn try_get_or_compute<F, E>(&self, args: &CallArgs, func: F) -> std::result::Result<V, E>
    where
        F: FnOnce(&CallArgs) -> std::result::Result<V, E>,
        E: From<MemoError>,
    {
        let key = self.derive_key(args)?;
        if let Some(value) = self.lookup(&key) {
            debug!(key = %key, "cache hit");
            return Ok(value);
        }

        debug!(key = %key, "cache miss, computing");
        match func(&self.forwarded(args)) {
            Ok(value) => {
                self.store(key, value.clone());
                Ok(value)
            }
            Err(err) => {
                self.lock().record_failure();
                debug!(key = %key, "computation failed, nothing stored");
                Err(err)
            }
        }
    }

    // == Key Access ==
    pub fn derive_key(&self, args: &CallArgs) -> Result<CacheKey> {
        self.keys.derive(args)
    }

    /// Live value for `key`, if any.
    pub fn lookup(&self, key: &CacheKey) -> Option<V> {
        self.lock().lookup(key).cloned()
    }

    /// Stores `value` under `key`, returning the evicted key if the size
    /// bound forced one out.
    pub fn store(&self, key: CacheKey, value: V) -> Option<CacheKey> {
        self.lock().store(key, value)
    }

    /// Physical presence of `key`, stale entries included.
    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Keys in eviction order, oldest first.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.lock().keys()
    }

    // == Maintenance ==
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Drops every expired entry now. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.lock().sweep_expired()
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn named_args(&self) -> NamedArgs {
        self.named_args
    }

    /// Arguments as the wrapped function will see them.
    pub(crate) fn forwarded<'a>(&self, args: &'a CallArgs) -> Cow<'a, CallArgs> {
        match self.named_args {
            NamedArgs::Drop if !args.named_args().is_empty() => Cow::Owned(args.without_named()),
            _ => Cow::Borrowed(args),
        }
    }

    /// Live value for `key` without counting a hit or miss.
    pub(crate) fn peek(&self, key: &CacheKey) -> Option<V> {
        self.lock().peek(key).cloned()
    }

    pub(crate) fn record_hit(&self) {
        self.lock().record_hit();
    }

    pub(crate) fn record_miss(&self, key: &CacheKey) {
        self.lock().record_miss(key);
    }

    pub(crate) fn record_failure(&self) {
        self.lock().record_failure();
    }

    // A panic elsewhere cannot leave the store half-updated, so the guard
    // of a poisoned lock is still consistent.
    fn lock(&self) -> MutexGuard<'_, CacheStore<V, C>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// == Memoized ==
/// An infallible function bound to a [`Memoizer`].
pub struct Memoized<F, V, C = SystemClock> {
    cache: Memoizer<V, C>,
    func: F,
}

impl<F, V, C> Memoized<F, V, C>
where
    F: Fn(&CallArgs) -> V,
    V: Clone,
    C: Clock,
{
    /// Calls the memoized function. Fails only if no key can be derived.
    pub fn call(&self, args: &CallArgs) -> Result<V> {
        self.cache.get_or_compute(args, &self.func)
    }

    pub fn cache(&self) -> &Memoizer<V, C> {
        &self.cache
    }
}

// == Try Memoized ==
/// A fallible function bound to a [`Memoizer`].
pub struct TryMemoized<F, V, C = SystemClock> {
    cache: Memoizer<V, C>,
    func: F,
}

impl<F, V, C, E> TryMemoized<F, V, C>
where
    F: Fn(&CallArgs) -> std::result::Result<V, E>,
    E: From<MemoError>,
    V: Clone,
    C: Clock,
{
    /// Calls the memoized function, propagating its errors unchanged.
    pub fn call(&self, args: &CallArgs) -> std::result::Result<V, E> {
        self.cache.try_get_or_compute(args, &self.func)
    }

    pub fn cache(&self) -> &Memoizer<V, C> {
        &self.cache
    }
}
