//! Background Tasks Module
//!
//! # Tasks
//! - Expiry sweep: removes expired entries at a configured interval. Opt-in;
//!   without it expiry is only detected when a key is read.

mod sweep;

pub use sweep::spawn_sweep_task;
