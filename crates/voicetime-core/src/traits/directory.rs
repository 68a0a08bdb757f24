//! Name lookup for metric labels.

use std::fmt::Display;

use crate::types::{ChannelId, GuildId};

/// Resolves human-readable names for guilds and channels.
///
/// Implemented by the gateway's name cache. Lookups may fail when the
/// gateway has not seen (or has since dropped) an entity; callers then
/// fall back to [`placeholder_label`].
pub trait NameDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Name of a guild, if known.
    fn guild_name(&self, guild_id: GuildId) -> Option<String>;

    /// Name of a voice channel, if known.
    fn channel_name(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<String>;

    /// Labels for channel-scoped series, with a placeholder name when unknown.
    fn channel_labels(&self, guild_id: GuildId, channel_id: ChannelId) -> ChannelLabels {
        ChannelLabels {
            guild_id,
            channel_id,
            channel_name: self
                .channel_name(guild_id, channel_id)
                .unwrap_or_else(|| placeholder_label(channel_id)),
        }
    }

    /// Labels for guild-scoped series, with a placeholder name when unknown.
    fn guild_labels(&self, guild_id: GuildId) -> GuildLabels {
        GuildLabels {
            guild_id,
            guild_name: self
                .guild_name(guild_id)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| placeholder_label(guild_id)),
        }
    }
}

/// Label used for an entity whose name cannot be resolved.
pub fn placeholder_label(id: impl Display) -> String {
    format!("id:{id}")
}

/// Label set for channel counters and gauges.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelLabels {
    /// Guild ID.
    pub guild_id: GuildId,
    /// Channel ID.
    pub channel_id: ChannelId,
    /// Resolved channel name or placeholder.
    pub channel_name: String,
}

/// Label set for guild counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GuildLabels {
    /// Guild ID.
    pub guild_id: GuildId,
    /// Resolved guild name or placeholder.
    pub guild_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Empty;

    impl NameDirectory for Empty {
        fn guild_name(&self, _guild_id: GuildId) -> Option<String> {
            None
        }

        fn channel_name(&self, _guild_id: GuildId, _channel_id: ChannelId) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_unknown_names_use_placeholder() {
        let labels = Empty.channel_labels(GuildId::new(1), ChannelId::new(42));
        assert_eq!(labels.channel_name, "id:42");
        assert_eq!(Empty.guild_labels(GuildId::new(9)).guild_name, "id:9");
    }
}
