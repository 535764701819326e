//! TTL Memo demo
//!
//! Memoizes a deliberately slow computation and reports cache behaviour.
//!
//! # Sequence
//! 1. Initialize tracing subscriber for logging
//! 2. Load configuration from environment variables
//! 3. Create the memoizer (rejects invalid configuration)
//! 4. Start the expiry sweep task if an interval is configured
//! 5. Run repeated synchronous calls (misses, then hits)
//! 6. Run concurrent calls through the single-flight front
//! 7. Log a statistics snapshot and shut down

use std::time::Instant;

use anyhow::Context;
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttl_memo::{spawn_sweep_task, CacheConfig, CallArgs, Memoizer, SingleFlight};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_memo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting TTL memo demo");

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: maxsize={}, timeout={:?}, named_args={:?}, sweep_interval={:?}",
        config.maxsize, config.timeout, config.named_args, config.sweep_interval
    );

    let cache: Memoizer<u64> =
        Memoizer::new(config.clone()).context("invalid cache configuration")?;

    let sweep_handle = config
        .sweep_interval
        .map(|secs| spawn_sweep_task(cache.clone(), secs));

    // Synchronous memoization: the repeated limit is served from memory
    let primes = cache.wrap(|args: &CallArgs| count_primes(limit_arg(args)));
    for limit in [200_000u64, 100_000, 200_000] {
        let args = CallArgs::new().arg(limit)?;
        let started = Instant::now();
        let count = primes.call(&args)?;
        info!(
            limit,
            count,
            elapsed_us = started.elapsed().as_micros() as u64,
            "primes below limit"
        );
    }

    // Single-flight: four concurrent callers, one computation
    let flight = SingleFlight::new(cache.clone());
    let args = CallArgs::new().arg(400_000u64)?;
    let callers: Vec<_> = (0..4)
        .map(|_| {
            let flight = flight.clone();
            let args = args.clone();
            tokio::spawn(async move {
                flight
                    .get_or_compute(&args, |args| async move {
                        let limit = limit_arg(&args);
                        tokio::task::spawn_blocking(move || count_primes(limit))
                            .await
                            .map_err(anyhow::Error::from)
                    })
                    .await
            })
        })
        .collect();

    for caller in callers {
        let count = caller.await??;
        info!(count, "single-flight caller finished");
    }

    let stats = cache.stats();
    info!(
        "Cache stats: {} (hit rate {:.2})",
        serde_json::to_string(&stats)?,
        stats.hit_rate()
    );

    if let Some(handle) = sweep_handle {
        handle.abort();
        warn!("Sweep task aborted");
    }

    info!("Demo complete");
    Ok(())
}

fn limit_arg(args: &CallArgs) -> u64 {
    args.get(0).and_then(Value::as_u64).unwrap_or(0)
}

/// Counts primes below `limit` by trial division.
fn count_primes(limit: u64) -> u64 {
    (2..limit)
        .filter(|&n| (2..).take_while(|d| d * d <= n).all(|d| n % d != 0))
        .count() as u64
}
