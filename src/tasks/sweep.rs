//! Expiry Sweep Task
//!
//! Background task that periodically removes expired entries from a
//! memoizer's store.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Clock;
use crate::memo::Memoizer;

/// Spawns a background task that periodically sweeps expired entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. Each sweep holds the store lock only while scanning.
///
/// # Arguments
/// * `cache` - Memoizer whose store is swept (clones share the store)
/// * `interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, to abort it on shutdown.
///
/// # Example
/// ```ignore
/// let cache = Memoizer::new(CacheConfig::default())?;
/// let sweep_handle = spawn_sweep_task(cache.clone(), 30);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task<V, C>(cache: Memoizer<V, C>, interval_secs: u64) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
    C: Clock + 'static,
{
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.sweep_expired();

            if removed > 0 {
                info!("Expiry sweep: removed {} expired entries", removed);
            } else {
                debug!("Expiry sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheKey, ManualClock};
    use crate::config::CacheConfig;

    fn cache() -> (Memoizer<String, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let cache = Memoizer::with_clock(CacheConfig::new(100, 10), clock.clone()).unwrap();
        (cache, clock)
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let (cache, clock) = cache();
        cache.store(CacheKey::new("expire_soon"), "value".to_string());
        clock.advance(Duration::from_secs(11));

        let handle = spawn_sweep_task(cache.clone(), 1);

        // Wait for the first sweep to run
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(
            !cache.contains_key(&CacheKey::new("expire_soon")),
            "Expired entry should have been swept"
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_live_entries() {
        let (cache, clock) = cache();
        cache.store(CacheKey::new("long_lived"), "value".to_string());
        clock.advance(Duration::from_secs(5));

        let handle = spawn_sweep_task(cache.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(
            cache.lookup(&CacheKey::new("long_lived")),
            Some("value".to_string()),
            "Live entry should not be removed"
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let (cache, _) = cache();

        let handle = spawn_sweep_task(cache, 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
