//! Insertion Order Module
//!
//! Tracks the order in which keys were last stored, for oldest-first eviction.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Stale queue slots tolerated before a compaction pass.
const COMPACT_SLACK: usize = 16;

// == Insertion Order ==
/// Tracks insertion order for FIFO eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Oldest insertion
/// - Back = Newest insertion (or overwrite)
///
/// Re-inserting a key pushes a fresh slot to the back and leaves the old slot
/// behind as stale; each slot carries a sequence number and only the slot
/// matching `live` counts. Stale slots are skipped on eviction and compacted
/// away once they outnumber live keys, so every operation is O(1) amortized.
#[derive(Debug)]
pub struct InsertionOrder<K> {
    /// Slots in insertion order, possibly stale
    queue: VecDeque<(K, u64)>,
    /// Current sequence number per tracked key
    live: HashMap<K, u64>,
    next_seq: u64,
}

impl<K> Default for InsertionOrder<K> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            live: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<K: Eq + Hash + Clone> InsertionOrder<K> {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as the newest insertion.
    ///
    /// If the key is already tracked, it moves to the back.
    pub fn touch(&mut self, key: &K) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.live.insert(key.clone(), seq);
        self.queue.push_back((key.clone(), seq));
        self.compact_if_needed();
    }

    // == Remove ==
    /// Stops tracking a key.
    pub fn remove(&mut self, key: &K) {
        if self.live.remove(key).is_some() {
            self.compact_if_needed();
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the oldest key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<K> {
        while let Some((key, seq)) = self.queue.pop_front() {
            if self.live.get(&key) == Some(&seq) {
                self.live.remove(&key);
                return Some(key);
            }
        }
        None
    }

    // == Iterate ==
    /// Iterates tracked keys from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        self.queue
            .iter()
            .filter(|(key, seq)| self.live.get(key) == Some(seq))
            .map(|(key, _)| key)
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.queue.clear();
        self.live.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.live.contains_key(key)
    }

    fn compact_if_needed(&mut self) {
        if self.queue.len() > 2 * self.live.len() + COMPACT_SLACK {
            let live = &self.live;
            self.queue.retain(|(key, seq)| live.get(key) == Some(seq));
        }
    }
}
