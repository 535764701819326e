//! Cache Module
//!
//! Bounded in-memory storage with TTL expiration and insertion-order eviction.

mod clock;
mod entry;
mod key;
mod order;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use key::CacheKey;
pub use order::InsertionOrder;
pub use stats::CacheStats;
pub use store::CacheStore;
