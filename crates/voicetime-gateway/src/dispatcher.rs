//! Dispatcher — turns decoded gateway dispatches into tracker events.
//!
//! Holds everything that must survive a reconnect: the voice-state cache,
//! the guild list and whether the initial snapshot went out. Voice changes
//! seen before the snapshot only update the cache; the snapshot then
//! carries them.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use voicetime_core::events::{ChannelSnapshot, GatewayEvent, GatewaySnapshot, GuildSnapshot};
use voicetime_core::traits::{NameDirectory, placeholder_label};
use voicetime_core::types::{ChannelId, GuildId, MemberProfile, UserId};

use crate::directory::NameCache;
use crate::protocol::{
    Dispatch, GuildCreate, GuildMemberUpdate, RawChannel, RawVoiceState, Ready, UnavailableGuild,
};
use crate::voice_cache::VoiceStateCache;

/// Session-independent gateway state.
#[derive(Debug)]
pub struct Dispatcher {
    /// Names shared with the tracker
    names: Arc<NameCache>,
    /// Who is connected where
    voice: VoiceStateCache,
    /// Guilds of the current session, in READY order
    guilds: Vec<GuildId>,
    /// Guilds listed in READY whose GUILD_CREATE is still outstanding
    pending: HashSet<GuildId>,
    /// Guilds whose GUILD_CREATE has been received
    available: HashSet<GuildId>,
    /// Whether the initial snapshot has been emitted
    synced: bool,
}

impl Dispatcher {
    /// Create a dispatcher writing names into `names`.
    pub fn new(names: Arc<NameCache>) -> Self {
        Self {
            names,
            voice: VoiceStateCache::new(),
            guilds: Vec::new(),
            pending: HashSet::new(),
            available: HashSet::new(),
            synced: false,
        }
    }

    /// Whether the initial snapshot has been emitted.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Whether the initial snapshot is held back by guilds listed in READY
    /// that have not been created yet.
    pub fn is_awaiting_guilds(&self) -> bool {
        !self.synced && !self.pending.is_empty()
    }

    /// Stop waiting for outstanding guilds and emit the initial snapshot
    /// with the guilds available so far.
    ///
    /// A guild created later is reconciled like any post-sync listing, so
    /// its members arrive as joins.
    pub fn expire_pending(&mut self) -> Vec<GatewayEvent> {
        if !self.is_awaiting_guilds() {
            return Vec::new();
        }

        let mut outstanding: Vec<GuildId> = self.pending.drain().collect();
        outstanding.sort_unstable();
        warn!(
            guilds = ?outstanding,
            "Guilds still unavailable after READY, syncing without them"
        );
        self.try_emit_snapshot()
    }

    /// The voice-state cache.
    pub fn voice(&self) -> &VoiceStateCache {
        &self.voice
    }

    /// Apply one dispatch, returning the events to forward.
    pub fn handle(&mut self, dispatch: Dispatch) -> Vec<GatewayEvent> {
        match dispatch {
            Dispatch::Ready(ready) => self.on_ready(ready),
            Dispatch::GuildCreate(guild) => self.on_guild_create(*guild),
            Dispatch::GuildUpdate(guild) => {
                self.names.set_guild(guild.id, &guild.name);
                Vec::new()
            }
            Dispatch::GuildDelete(guild) => self.on_guild_delete(guild),
            Dispatch::ChannelUpsert(channel) => {
                self.record_channel(&channel);
                Vec::new()
            }
            Dispatch::ChannelDelete(channel) => self.on_channel_delete(channel),
            Dispatch::VoiceStateUpdate(state) => self.on_voice_state(state),
            Dispatch::GuildMemberUpdate(update) => self.on_member_update(update),
            Dispatch::Other(name) => {
                debug!(event = %name, "Ignoring dispatch");
                Vec::new()
            }
        }
    }

    fn on_ready(&mut self, ready: Ready) -> Vec<GatewayEvent> {
        info!(
            "Logged in as {} (id={}), {} guild(s)",
            ready.user.username,
            ready.user.id,
            ready.guilds.len()
        );

        let listed: Vec<GuildId> = ready.guilds.iter().map(|g| g.id).collect();

        // guilds left while disconnected
        let departed: Vec<GuildId> = self
            .guilds
            .iter()
            .copied()
            .filter(|g| !listed.contains(g))
            .collect();
        let mut events = Vec::new();
        for guild_id in departed {
            let leaves = self.voice.clear_guild(guild_id);
            if self.synced {
                events.extend(leaves.into_iter().map(GatewayEvent::VoiceStateChanged));
            }
        }

        self.pending = listed.iter().copied().collect();
        self.available.retain(|g| listed.contains(g));
        self.guilds = listed;

        events.extend(self.try_emit_snapshot());
        events
    }

    fn on_guild_create(&mut self, guild: GuildCreate) -> Vec<GatewayEvent> {
        let guild_id = guild.id;
        self.names.set_guild(guild_id, &guild.name);
        for channel in &guild.channels {
            self.record_channel_in(guild_id, channel);
        }

        let listing: Vec<(MemberProfile, ChannelId)> = guild
            .voice_states
            .iter()
            .filter_map(|state| {
                let channel_id = state.channel_id?;
                let member = state
                    .member
                    .as_ref()
                    .and_then(|m| m.profile())
                    .or_else(|| {
                        guild
                            .members
                            .iter()
                            .filter_map(|m| m.profile())
                            .find(|p| p.user_id == state.user_id)
                    })
                    .unwrap_or_else(|| self.fallback_profile(guild_id, state.user_id));
                Some((member, channel_id))
            })
            .collect();

        if !self.guilds.contains(&guild_id) {
            self.guilds.push(guild_id);
        }
        self.available.insert(guild_id);
        self.pending.remove(&guild_id);

        let transitions = self.voice.reconcile_guild(guild_id, listing);
        if self.synced {
            if !transitions.is_empty() {
                info!(
                    guild_id = %guild_id,
                    changes = transitions.len(),
                    "Reconciled voice states after guild sync"
                );
            }
            transitions
                .into_iter()
                .map(GatewayEvent::VoiceStateChanged)
                .collect()
        } else {
            self.try_emit_snapshot()
        }
    }

    fn on_guild_delete(&mut self, guild: UnavailableGuild) -> Vec<GatewayEvent> {
        self.pending.remove(&guild.id);
        self.available.remove(&guild.id);

        let mut events = Vec::new();
        if guild.unavailable {
            debug!(guild_id = %guild.id, "Guild became unavailable");
        } else {
            info!(guild_id = %guild.id, "Removed from guild");
            self.guilds.retain(|g| *g != guild.id);
            let leaves = self.voice.clear_guild(guild.id);
            if self.synced {
                events.extend(leaves.into_iter().map(GatewayEvent::VoiceStateChanged));
            }
        }

        events.extend(self.try_emit_snapshot());
        events
    }

    fn on_channel_delete(&mut self, channel: RawChannel) -> Vec<GatewayEvent> {
        let Some(guild_id) = channel.guild_id else {
            return Vec::new();
        };
        let leaves = self.voice.clear_channel(guild_id, channel.id);
        if self.synced {
            leaves
                .into_iter()
                .map(GatewayEvent::VoiceStateChanged)
                .collect()
        } else {
            Vec::new()
        }
    }

    fn on_voice_state(&mut self, state: RawVoiceState) -> Vec<GatewayEvent> {
        let Some(guild_id) = state.guild_id else {
            return Vec::new();
        };
        let member = state
            .member
            .as_ref()
            .and_then(|m| m.profile())
            .unwrap_or_else(|| self.fallback_profile(guild_id, state.user_id));

        let transition = self.voice.apply(guild_id, member, state.channel_id);
        if self.synced {
            vec![GatewayEvent::VoiceStateChanged(transition)]
        } else {
            Vec::new()
        }
    }

    fn on_member_update(&mut self, update: GuildMemberUpdate) -> Vec<GatewayEvent> {
        let member = update.profile();
        self.voice.update_member(update.guild_id, &member);
        vec![
            GatewayEvent::UserUpdated {
                user_id: member.user_id,
                identity: member.identity.clone(),
            },
            GatewayEvent::MemberUpdated {
                guild_id: update.guild_id,
                member,
            },
        ]
    }

    fn record_channel(&self, channel: &RawChannel) {
        if let Some(guild_id) = channel.guild_id {
            self.record_channel_in(guild_id, channel);
        }
    }

    fn record_channel_in(&self, guild_id: GuildId, channel: &RawChannel) {
        if !channel.is_voice() {
            return;
        }
        if let Some(name) = channel.name.as_deref() {
            self.names.set_channel(guild_id, channel.id, name);
        }
    }

    /// Profile for a user the payload did not describe.
    fn fallback_profile(&self, guild_id: GuildId, user_id: UserId) -> MemberProfile {
        self.voice
            .member(guild_id, user_id)
            .cloned()
            .unwrap_or_else(|| MemberProfile::new(user_id, user_id.to_string()))
    }

    fn try_emit_snapshot(&mut self) -> Vec<GatewayEvent> {
        if self.synced || !self.pending.is_empty() {
            return Vec::new();
        }
        self.synced = true;

        let snapshot = self.build_snapshot();
        info!(
            "Gateway synced: {} guild(s), {} member(s) in voice",
            snapshot.guilds.len(),
            snapshot.member_count()
        );
        vec![GatewayEvent::Ready(snapshot)]
    }

    fn build_snapshot(&self) -> GatewaySnapshot {
        let guilds = self
            .guilds
            .iter()
            .filter(|g| self.available.contains(g))
            .map(|&guild_id| {
                let mut channels: Vec<(ChannelId, String)> = self.names.channels_of(guild_id);
                for channel_id in self.voice.occupied_channels(guild_id) {
                    if !channels.iter().any(|(id, _)| *id == channel_id) {
                        channels.push((channel_id, placeholder_label(channel_id)));
                    }
                }

                GuildSnapshot {
                    guild_id,
                    name: self
                        .names
                        .guild_name(guild_id)
                        .unwrap_or_else(|| placeholder_label(guild_id)),
                    channels: channels
                        .into_iter()
                        .map(|(channel_id, name)| ChannelSnapshot {
                            channel_id,
                            name,
                            members: self.voice.channel_members(guild_id, channel_id),
                        })
                        .collect(),
                }
            })
            .collect();

        GatewaySnapshot { guilds }
    }
}
