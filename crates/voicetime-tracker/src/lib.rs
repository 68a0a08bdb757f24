//! # voicetime-tracker
//!
//! Presence tracking and time-accrual engine. Provides:
//!
//! - An owned presence store keeping per-member entries and per-channel
//!   membership sets in lock-step
//! - An identity cache holding the latest known names of users and members
//! - Classification of before/after voice transitions into join, leave and
//!   move operations
//! - One-shot seeding from the gateway's startup snapshot
//! - A monotonic accrual scheduler with union-time semantics per channel
//!   and per guild
//! - [`PresenceEngine`], which serializes all of the above behind a single
//!   lock, and [`TrackerRunner`], which drives it from gateway events and a
//!   fixed-interval tick

pub mod accrual;
pub mod engine;
pub mod ingest;
pub mod presence;
mod publish;
pub mod runner;
pub mod seeder;

pub use accrual::scheduler::{AccrualScheduler, TickOutcome, TickReport};
pub use engine::PresenceEngine;
pub use ingest::transition::Transition;
pub use presence::identity::IdentityCache;
pub use presence::store::{PresenceChange, PresenceSnapshot, PresenceStore};
pub use runner::TrackerRunner;
pub use seeder::SeedOutcome;
