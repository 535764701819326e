//! Error types for the memoization cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Memo Error Enum ==
/// Errors raised by the cache itself.
///
/// Failures of the wrapped computation are not represented here: they are
/// returned to the caller in the computation's own error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoError {
    /// An argument could not be turned into a stable key representation
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Invalid cache configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, MemoError>;
