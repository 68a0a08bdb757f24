//! Shared fixtures for tracker integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use voicetime_core::events::{
    ChannelSnapshot, GatewayEvent, GatewaySnapshot, GuildSnapshot, VoiceTransition,
};
use voicetime_core::traits::{ChannelLabels, GuildLabels, NameDirectory};
use voicetime_core::types::{ChannelId, GuildId, MemberProfile, UserId};
use voicetime_metrics::PrometheusSink;
use voicetime_tracker::{PresenceEngine, Transition};

pub const GUILD: GuildId = GuildId::new(1);
pub const OTHER_GUILD: GuildId = GuildId::new(2);
pub const GENERAL: ChannelId = ChannelId::new(10);
pub const GAMING: ChannelId = ChannelId::new(20);
pub const LOBBY: ChannelId = ChannelId::new(30);

/// Fixed guild and channel names.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    guilds: HashMap<GuildId, String>,
    channels: HashMap<(GuildId, ChannelId), String>,
}

impl StaticDirectory {
    /// `GUILD` with `GENERAL` and `GAMING`, `OTHER_GUILD` with `LOBBY`.
    pub fn standard() -> Self {
        let mut directory = Self::default();
        directory.guilds.insert(GUILD, "Guild".into());
        directory.guilds.insert(OTHER_GUILD, "Other".into());
        directory.channels.insert((GUILD, GENERAL), "General".into());
        directory.channels.insert((GUILD, GAMING), "Gaming".into());
        directory.channels.insert((OTHER_GUILD, LOBBY), "Lobby".into());
        directory
    }
}

impl NameDirectory for StaticDirectory {
    fn guild_name(&self, guild_id: GuildId) -> Option<String> {
        self.guilds.get(&guild_id).cloned()
    }

    fn channel_name(&self, guild_id: GuildId, channel_id: ChannelId) -> Option<String> {
        self.channels.get(&(guild_id, channel_id)).cloned()
    }
}

/// An engine wired to a Prometheus sink and the standard directory, with a
/// clock origin for readable timestamps.
pub struct TestTracker {
    pub engine: Arc<PresenceEngine>,
    pub sink: Arc<PrometheusSink>,
    pub directory: Arc<StaticDirectory>,
    pub origin: Instant,
}

impl TestTracker {
    /// Engine whose clock starts at the origin. Not seeded.
    pub fn new() -> Self {
        let sink = Arc::new(PrometheusSink::new().expect("sink"));
        let directory = Arc::new(StaticDirectory::standard());
        let origin = Instant::now();
        let engine = Arc::new(PresenceEngine::new(
            sink.clone(),
            directory.clone(),
            origin,
        ));
        Self {
            engine,
            sink,
            directory,
            origin,
        }
    }

    /// Engine seeded with an empty snapshot at the origin.
    pub fn seeded() -> Self {
        let tracker = Self::new();
        tracker
            .engine
            .seed(&GatewaySnapshot::default(), tracker.origin);
        tracker
    }

    /// The instant `seconds` after the origin.
    pub fn at(&self, seconds: f64) -> Instant {
        self.origin + Duration::from_secs_f64(seconds)
    }

    pub fn transition(
        &self,
        guild_id: GuildId,
        user: u64,
        before: Option<ChannelId>,
        after: Option<ChannelId>,
    ) -> Transition {
        self.engine.apply_transition(&VoiceTransition {
            guild_id,
            member: member(user),
            before,
            after,
        })
    }

    pub fn join(&self, user: u64, channel: ChannelId) -> Transition {
        self.transition(GUILD, user, None, Some(channel))
    }

    pub fn leave(&self, user: u64, channel: ChannelId) -> Transition {
        self.transition(GUILD, user, Some(channel), None)
    }

    pub fn accrue_at(&self, seconds: f64) {
        self.engine.accrue(self.at(seconds));
    }

    pub fn user_seconds(&self, guild_id: GuildId, user: u64) -> f64 {
        self.sink.user_seconds(guild_id, UserId::new(user))
    }

    pub fn channel_seconds(&self, guild_id: GuildId, channel_id: ChannelId) -> f64 {
        self.sink.channel_seconds(&self.channel_labels(guild_id, channel_id))
    }

    pub fn guild_seconds(&self, guild_id: GuildId) -> f64 {
        self.sink.guild_seconds(&self.guild_labels(guild_id))
    }

    /// `(channel_active, channel_active_users)` gauges.
    pub fn occupancy(&self, guild_id: GuildId, channel_id: ChannelId) -> (i64, i64) {
        self.sink
            .channel_occupancy(&self.channel_labels(guild_id, channel_id))
    }

    pub fn channel_labels(&self, guild_id: GuildId, channel_id: ChannelId) -> ChannelLabels {
        self.directory.channel_labels(guild_id, channel_id)
    }

    pub fn guild_labels(&self, guild_id: GuildId) -> GuildLabels {
        self.directory.guild_labels(guild_id)
    }

    pub fn is_consistent(&self) -> bool {
        self.engine.with_store(|store| store.is_consistent())
    }
}

/// A member with username `user{id}`.
pub fn member(id: u64) -> MemberProfile {
    MemberProfile::new(UserId::new(id), format!("user{id}"))
}

/// Snapshot of `GUILD` with the given members per channel.
pub fn snapshot(channels: Vec<(ChannelId, Vec<u64>)>) -> GatewaySnapshot {
    GatewaySnapshot {
        guilds: vec![GuildSnapshot {
            guild_id: GUILD,
            name: "Guild".into(),
            channels: channels
                .into_iter()
                .map(|(channel_id, users)| ChannelSnapshot {
                    channel_id,
                    name: format!("channel {channel_id}"),
                    members: users.into_iter().map(member).collect(),
                })
                .collect(),
        }],
    }
}

/// Join event for the runner.
pub fn join_event(user: u64, channel: ChannelId) -> GatewayEvent {
    GatewayEvent::VoiceStateChanged(VoiceTransition {
        guild_id: GUILD,
        member: member(user),
        before: None,
        after: Some(channel),
    })
}
