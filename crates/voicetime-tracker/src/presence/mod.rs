//! Voice presence state and identity records.

pub mod identity;
pub mod store;

pub use identity::IdentityCache;
pub use store::{PresenceChange, PresenceSnapshot, PresenceStore};
