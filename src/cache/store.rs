//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with insertion-order tracking
//! and lazy TTL expiry.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::{CacheEntry, CacheKey, CacheStats, Clock, InsertionOrder, SystemClock};
use crate::config::CacheConfig;
use crate::error::Result;

// == Cache Store ==
/// Bounded store with oldest-first eviction and per-entry TTL.
///
/// Expiry is detected on lookup and never removes anything by itself: a
/// stale entry stays until it is overwritten, evicted, cleared or swept.
/// Lookups do not change eviction order.
#[derive(Debug)]
pub struct CacheStore<V, C = SystemClock> {
    /// Key-value storage
    entries: HashMap<CacheKey, CacheEntry<V>>,
    /// Insertion order tracker
    order: InsertionOrder<CacheKey>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    maxsize: usize,
    /// TTL in milliseconds applied to every stored entry
    timeout_ms: u64,
    clock: C,
}

impl<V> CacheStore<V, SystemClock> {
    // == Constructor ==
    /// Creates a store on the wall clock.
    ///
    /// Fails with a configuration error on a zero `maxsize` or `timeout`.
    pub fn new(config: &CacheConfig) -> Result<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<V, C: Clock> CacheStore<V, C> {
    /// Creates a store reading time from `clock`.
    pub fn with_clock(config: &CacheConfig, clock: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            stats: CacheStats::new(),
            maxsize: config.maxsize,
            timeout_ms: config.timeout_ms(),
            clock,
        })
    }

    // == Lookup ==
    /// Returns the value for `key` if present and not expired.
    ///
    /// A stale entry is reported as absent but left in place.
    pub fn lookup(&mut self, key: &CacheKey) -> Option<&V> {
        let now = self.clock.now_ms();
        match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                None
            }
            Some(entry) if entry.is_expired_at(now) => {
                debug!(key = %key, expired_ms_ago = now - entry.expires_at, "stale entry");
                self.stats.record_expired();
                None
            }
            Some(entry) => {
                debug!(key = %key, ttl_remaining_ms = entry.ttl_remaining_ms(now), "live entry");
                self.stats.record_hit();
                Some(&entry.value)
            }
        }
    }

    // == Peek ==
    /// Returns the value for `key` if present and not expired, without
    /// touching statistics.
    pub fn peek(&self, key: &CacheKey) -> Option<&V> {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .filter(|entry| entry.ttl_remaining_ms(now) > 0)
            .map(|entry| &entry.value)
    }

    /// Counts a lookup answered without consulting the store again.
    pub(crate) fn record_hit(&mut self) {
        self.stats.record_hit();
    }

    /// Counts a lookup that found nothing usable for `key`: expired if a
    /// stale entry is still in place, a plain miss otherwise.
    pub(crate) fn record_miss(&mut self, key: &CacheKey) {
        if self.entries.contains_key(key) {
            self.stats.record_expired();
        } else {
            self.stats.record_miss();
        }
    }

    // == Store ==
    /// Stores `value` under `key` with a fresh expiry.
    ///
    /// An existing key is overwritten and becomes the newest insertion. If
    /// the store then holds more than `maxsize` entries, exactly one entry,
    /// the oldest insertion, is evicted and its key returned.
    pub fn store(&mut self, key: CacheKey, value: V) -> Option<CacheKey> {
        let entry = CacheEntry::new(value, self.clock.now_ms(), self.timeout_ms);
        self.order.touch(&key);
        self.entries.insert(key, entry);

        let mut evicted = None;
        if self.entries.len() > self.maxsize {
            if let Some(oldest) = self.order.evict_oldest() {
                self.entries.remove(&oldest);
                self.stats.record_eviction();
                debug!(key = %oldest, "evicted oldest entry");
                evicted = Some(oldest);
            }
        }

        self.stats.set_total_entries(self.entries.len());
        evicted
    }

    // == Clear ==
    /// Removes every entry. Statistics counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.stats.set_total_entries(0);
    }

    // == Sweep Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Only called explicitly or by the background sweep task.
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired_keys: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.remove(key);
            self.order.remove(key);
        }

        self.stats.set_total_entries(self.entries.len());
        expired_keys.len()
    }

    // == Inspection ==
    /// Raw entry access, stale entries included. Does not touch statistics.
    pub fn entry(&self, key: &CacheKey) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    /// Physical presence, stale entries included.
    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys from oldest to newest insertion, i.e. in eviction order.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.order.iter().cloned().collect()
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub(crate) fn record_failure(&mut self) {
        self.stats.record_failure();
    }

    pub fn maxsize(&self) -> usize {
        self.maxsize
    }

    // == Length ==
    /// Returns the current number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
