//! Configuration Module
//!
//! Cache parameters, with defaults and loading from environment variables.

use std::env;
use std::time::Duration;

use serde::Serialize;

use crate::error::{MemoError, Result};

/// Default maximum number of distinct keys retained.
pub const DEFAULT_MAXSIZE: usize = 255;

/// Default time-to-live applied to every new entry.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// == Named Argument Policy ==
/// What happens to named arguments when the wrapped function is invoked.
///
/// Named arguments always participate in key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NamedArgs {
    /// Only positional arguments reach the wrapped function.
    #[default]
    Drop,
    /// Positional and named arguments are passed through unchanged.
    Forward,
}

impl NamedArgs {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "drop" => Some(Self::Drop),
            "forward" => Some(Self::Forward),
            _ => None,
        }
    }
}

/// Cache configuration, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheConfig {
    /// Maximum number of distinct keys the cache retains
    pub maxsize: usize,
    /// TTL applied to every stored entry, millisecond resolution
    pub timeout: Duration,
    /// Named argument forwarding policy
    pub named_args: NamedArgs,
    /// Background sweep interval in seconds, None = expiry is only detected on read
    pub sweep_interval: Option<u64>,
}

impl CacheConfig {
    /// Creates a config with the given bounds and default policies.
    ///
    /// Use [`CacheConfig::with_timeout`] for sub-second or fractional TTLs.
    pub fn new(maxsize: usize, timeout_secs: u64) -> Self {
        Self {
            maxsize,
            timeout: Duration::from_secs(timeout_secs),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_named_args(mut self, named_args: NamedArgs) -> Self {
        self.named_args = named_args;
        self
    }

    pub fn with_sweep_interval(mut self, secs: u64) -> Self {
        self.sweep_interval = (secs > 0).then_some(secs);
        self
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMO_MAXSIZE` - Maximum cached keys (default: 255)
    /// - `MEMO_TIMEOUT` - Entry TTL in seconds, fractions allowed (default: 60)
    /// - `MEMO_NAMED_ARGS` - `drop` or `forward` (default: drop)
    /// - `MEMO_SWEEP_INTERVAL` - Sweep frequency in seconds, 0 or unset disables it
    ///
    /// Missing or unparsable values fall back to the defaults. Range checks
    /// happen when the cache is constructed.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let sweep_interval = lookup("MEMO_SWEEP_INTERVAL")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0);

        Self {
            maxsize: lookup("MEMO_MAXSIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.maxsize),
            timeout: lookup("MEMO_TIMEOUT")
                .and_then(|v| v.parse::<f64>().ok())
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .unwrap_or(defaults.timeout),
            named_args: lookup("MEMO_NAMED_ARGS")
                .and_then(|v| NamedArgs::parse(&v))
                .unwrap_or(defaults.named_args),
            sweep_interval,
        }
    }

    // == Validate ==
    /// Rejects a zero maxsize and TTLs shorter than one clock tick (1ms).
    pub fn validate(&self) -> Result<()> {
        if self.maxsize == 0 {
            return Err(MemoError::Config("maxsize must be positive".to_string()));
        }
        if self.timeout_ms() == 0 {
            return Err(MemoError::Config(
                "timeout must be at least 1ms".to_string(),
            ));
        }
        Ok(())
    }

    /// TTL in milliseconds, the resolution of the cache clock.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            maxsize: DEFAULT_MAXSIZE,
            timeout: DEFAULT_TIMEOUT,
            named_args: NamedArgs::Drop,
            sweep_interval: None,
        }
    }
}
