//! TTL Memo - A bounded, time-expiring memoization cache
//!
//! Serves repeated calls with identical arguments from memory, for up to a
//! fixed number of distinct argument combinations and a fixed time-to-live.
//! Eviction is oldest-insertion-first; expiry is detected on read.
//!
//! ```
//! use ttl_memo::{CacheConfig, CallArgs, Memoizer};
//!
//! let cache = Memoizer::new(CacheConfig::new(128, 60)).unwrap();
//! let square = cache.wrap(|args: &CallArgs| {
//!     let n = args.get(0).and_then(|v| v.as_i64()).unwrap_or(0);
//!     n * n
//! });
//!
//! let args = CallArgs::new().arg(12).unwrap();
//! assert_eq!(square.call(&args).unwrap(), 144);
//! assert_eq!(square.call(&args).unwrap(), 144);
//! assert_eq!(cache.stats().hits, 1);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod memo;
pub mod tasks;

pub use cache::{CacheKey, CacheStats, Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, NamedArgs};
pub use error::{MemoError, Result};
pub use memo::{CallArgs, KeyDeriver, Memoizer, SingleFlight, Structural, TypedRepr};
pub use tasks::spawn_sweep_task;
