//! Outbound metrics contract.

use crate::types::{GuildId, UserId, UserIdentity};

use super::directory::{ChannelLabels, GuildLabels};

/// Receives accumulator increments, gauge sets and informational records.
///
/// Every call is a fire-and-forget local update: implementations must not
/// block or perform I/O, because callers invoke them while holding the
/// presence lock.
pub trait MetricsSink: Send + Sync + std::fmt::Debug + 'static {
    /// Add `seconds` to `user_presence_seconds_total{guild,user}`.
    fn add_user_seconds(&self, guild_id: GuildId, user_id: UserId, seconds: f64);

    /// Add `seconds` to `channel_active_seconds_total{guild,channel,channel_name}`.
    fn add_channel_seconds(&self, labels: &ChannelLabels, seconds: f64);

    /// Add `seconds` to `guild_active_seconds_total{guild,guild_name}`.
    fn add_guild_seconds(&self, labels: &GuildLabels, seconds: f64);

    /// Set `channel_active` (0/1) and `channel_active_users` for a channel.
    fn set_channel_occupancy(&self, labels: &ChannelLabels, users: usize);

    /// Record the latest account names of a user.
    fn set_user_info(&self, user_id: UserId, identity: &UserIdentity);

    /// Record the latest display name of a member in a guild.
    fn set_member_display(&self, guild_id: GuildId, user_id: UserId, display_name: &str);
}
