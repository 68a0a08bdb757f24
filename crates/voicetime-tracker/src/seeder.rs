//! One-shot seeding of the presence store from the gateway snapshot.

use serde::Serialize;
use tracing::{debug, info};

use voicetime_core::events::GatewaySnapshot;

use crate::presence::store::PresenceStore;
use crate::publish::Publisher;

/// Result of a seeding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SeedOutcome {
    /// The store was populated.
    Seeded {
        /// Members recorded.
        members: usize,
        /// Channels that ended up occupied.
        channels: usize,
    },
    /// Seeding already ran in this process; nothing was changed.
    AlreadySeeded,
    /// The store already held presence from live events; nothing was
    /// changed.
    StoreNotEmpty,
}

/// Populate an empty store from `snapshot`.
///
/// Identity records are refreshed and occupancy gauges pushed for every
/// seeded channel. The caller is responsible for the once-per-process
/// guard; this function only refuses a non-empty store.
pub(crate) fn seed(
    store: &mut PresenceStore,
    publisher: Publisher<'_>,
    snapshot: &GatewaySnapshot,
) -> SeedOutcome {
    if !store.is_empty() {
        return SeedOutcome::StoreNotEmpty;
    }

    for guild in &snapshot.guilds {
        info!(" - connected to: {} (gid={})", guild.name, guild.guild_id);

        for channel in &guild.channels {
            for member in &channel.members {
                store.join(guild.guild_id, member.user_id, channel.channel_id);
                publisher.member(guild.guild_id, member);
            }
        }

        // gauges after the whole guild is in, a member listed twice ends up in one channel
        for channel in guild.channels.iter().filter(|c| !c.members.is_empty()) {
            publisher.channel_gauges(store, guild.guild_id, channel.channel_id);
            debug!(
                guild_id = %guild.guild_id,
                channel_id = %channel.channel_id,
                users = store.channel_size(guild.guild_id, channel.channel_id),
                "Seeded voice channel"
            );
        }
    }

    let members = store.member_count();
    if members > 0 {
        info!(
            "[seed] Initialized presence for {} member(s) already in voice.",
            members
        );
    }

    SeedOutcome::Seeded {
        members,
        channels: store.channel_count(),
    }
}
