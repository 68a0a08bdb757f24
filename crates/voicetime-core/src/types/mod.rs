//! Shared domain types.

pub mod id;
pub mod identity;

pub use id::{ChannelId, GuildId, UserId};
pub use identity::{MemberProfile, UserIdentity, resolve_display_name};
