//! Name cache — guild and voice channel names seen on the gateway.

use dashmap::DashMap;

use voicetime_core::traits::NameDirectory;
use voicetime_core::types::{ChannelId, GuildId};

/// Latest known guild and voice channel names.
///
/// Written by the gateway session, read by the tracker when it labels
/// metrics. Entries are never evicted: deleted channels and guilds keep
/// their names so trailing leave events are labelled like the joins were.
#[derive(Debug, Default)]
pub struct NameCache {
    /// Guild ID → name
    guilds: DashMap<GuildId, String>,
    /// (Guild ID, Channel ID) → name, voice and stage channels only
    channels: DashMap<(GuildId, ChannelId), String>,
}

impl NameCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a guild name
    pub fn set_guild(&self, guild_id: GuildId, name: &str) {
        self.guilds.insert(guild_id, name.to_string());
    }

    /// Record a voice channel name
    pub fn set_channel(&self, guild_id: GuildId, channel_id: ChannelId, name: &str) {
        self.channels
            .insert((guild_id, channel_id), name.to_string());
    }

    /// Known voice channels of a guild, ordered by ID
    pub fn channels_of(&self, guild_id: GuildId) -> Vec<(ChannelId, String)> {
        let mut channels: Vec<_> = self
            .channels
            .iter()
            .filter(|entry| entry.key().0 == guild_id)
            .map(|entry| (entry.key().1, entry.value().clone()))
            .collect();
        channels.sort_by_key(|(id, _)| *id);
        channels
    }

    /// Number of known guilds
    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }
}

impl NameDirectory for NameCache {
    fn guild_name(&self, guild_id: GuildId) -> Option<String> {
        self.guilds.get(&guild_id).map(|r| r.value().clone())
    }

    fn channel_name(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<String> {
        self.channels
            .get(&(guild_id, channel_id))
            .map(|r| r.value().clone())
    }
}
