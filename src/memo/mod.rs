//! Memo Module
//!
//! Memoization on top of the cache: the call argument model, key derivation,
//! the synchronous memoizer and the opt-in single-flight async front.

mod args;
mod derive;
mod finite;
mod memoizer;
mod single_flight;

pub use args::CallArgs;
pub use derive::{printed, type_tag, KeyDeriver, Structural, TypedRepr};
pub use memoizer::{Memoized, Memoizer, TryMemoized};
pub use single_flight::SingleFlight;
