//! Startup enumeration of current voice membership.

use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, GuildId, MemberProfile};

/// Every known guild with its voice channels and their current occupants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySnapshot {
    /// Guilds visible to the connection.
    pub guilds: Vec<GuildSnapshot>,
}

/// One guild in a [`GatewaySnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSnapshot {
    /// Guild ID.
    pub guild_id: GuildId,
    /// Guild name.
    pub name: String,
    /// Voice-like channels of the guild.
    pub channels: Vec<ChannelSnapshot>,
}

/// One voice channel in a [`GuildSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    /// Channel ID.
    pub channel_id: ChannelId,
    /// Channel name.
    pub name: String,
    /// Members currently connected to the channel.
    pub members: Vec<MemberProfile>,
}

impl GatewaySnapshot {
    /// Total number of connected members across all guilds.
    pub fn member_count(&self) -> usize {
        self.guilds
            .iter()
            .flat_map(|g| g.channels.iter())
            .map(|c| c.members.len())
            .sum()
    }
}
