//! # voicetime-core
//!
//! Core crate for voicetime. Contains configuration schemas, typed
//! snowflake identifiers, gateway event types, the collaborator traits
//! implemented by the metrics and gateway crates, and the unified error
//! system.
//!
//! This crate has **no** internal dependencies on other voicetime crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
