//! Periodic integration of presence into duration counters.

pub mod scheduler;

pub use scheduler::{AccrualScheduler, TickOutcome, TickReport};
