//! Voice state cache — the gateway-side view of who is connected where.
//!
//! VOICE_STATE_UPDATE only carries the new channel, so the previous one is
//! looked up here. After a re-identify the fresh GUILD_CREATE listing is
//! reconciled against the cache, turning whatever changed while
//! disconnected into ordinary transitions.

use std::collections::{BTreeSet, HashMap, HashSet};

use voicetime_core::events::VoiceTransition;
use voicetime_core::types::{ChannelId, GuildId, MemberProfile, UserId};

#[derive(Debug, Clone)]
struct VoiceEntry {
    channel_id: ChannelId,
    member: MemberProfile,
}

/// Current voice channel and profile of every connected member.
#[derive(Debug, Default)]
pub struct VoiceStateCache {
    /// (Guild ID, User ID) → connection
    states: HashMap<(GuildId, UserId), VoiceEntry>,
}

impl VoiceStateCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a member's new channel and return the transition from the
    /// cached one.
    pub fn apply(
        &mut self,
        guild_id: GuildId,
        member: MemberProfile,
        after: Option<ChannelId>,
    ) -> VoiceTransition {
        let key = (guild_id, member.user_id);
        let before = match after {
            Some(channel_id) => self.states.insert(
                key,
                VoiceEntry {
                    channel_id,
                    member: member.clone(),
                },
            ),
            None => self.states.remove(&key),
        }
        .map(|entry| entry.channel_id);

        VoiceTransition {
            guild_id,
            member,
            before,
            after,
        }
    }

    /// Replace the voice states of a guild with a complete listing.
    ///
    /// Returns a transition for every member whose channel differs from the
    /// cache, including a leave for every cached member the listing omits.
    pub fn reconcile_guild(
        &mut self,
        guild_id: GuildId,
        listing: Vec<(MemberProfile, ChannelId)>,
    ) -> Vec<VoiceTransition> {
        let mut listed = HashSet::new();
        let mut transitions = Vec::new();

        for (member, channel_id) in listing {
            listed.insert(member.user_id);
            let transition = self.apply(guild_id, member, Some(channel_id));
            if transition.before != transition.after {
                transitions.push(transition);
            }
        }

        let mut departed: Vec<MemberProfile> = self
            .states
            .iter()
            .filter(|((g, u), _)| *g == guild_id && !listed.contains(u))
            .map(|(_, entry)| entry.member.clone())
            .collect();
        departed.sort_by_key(|m| m.user_id);

        transitions.extend(
            departed
                .into_iter()
                .map(|member| self.apply(guild_id, member, None)),
        );
        transitions
    }

    /// Drop every member of a guild, returning their leaves.
    pub fn clear_guild(&mut self, guild_id: GuildId) -> Vec<VoiceTransition> {
        self.reconcile_guild(guild_id, Vec::new())
    }

    /// Drop every member of a channel, returning their leaves.
    pub fn clear_channel(&mut self, guild_id: GuildId, channel_id: ChannelId) -> Vec<VoiceTransition> {
        self.channel_members(guild_id, channel_id)
            .into_iter()
            .map(|member| self.apply(guild_id, member, None))
            .collect()
    }

    /// Replace the cached profile of a connected member.
    ///
    /// Returns `false` when the member is not connected.
    pub fn update_member(&mut self, guild_id: GuildId, member: &MemberProfile) -> bool {
        match self.states.get_mut(&(guild_id, member.user_id)) {
            Some(entry) => {
                entry.member = member.clone();
                true
            }
            None => false,
        }
    }

    /// Cached profile of a connected member.
    pub fn member(&self, guild_id: GuildId, user_id: UserId) -> Option<&MemberProfile> {
        self.states
            .get(&(guild_id, user_id))
            .map(|entry| &entry.member)
    }

    /// Channel a member is connected to.
    pub fn channel_of(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        self.states
            .get(&(guild_id, user_id))
            .map(|entry| entry.channel_id)
    }

    /// Members connected to a channel, ordered by user ID.
    pub fn channel_members(&self, guild_id: GuildId, channel_id: ChannelId) -> Vec<MemberProfile> {
        let mut members: Vec<MemberProfile> = self
            .states
            .iter()
            .filter(|((g, _), entry)| *g == guild_id && entry.channel_id == channel_id)
            .map(|(_, entry)| entry.member.clone())
            .collect();
        members.sort_by_key(|m| m.user_id);
        members
    }

    /// Channels of a guild with at least one member, ordered by ID.
    pub fn occupied_channels(&self, guild_id: GuildId) -> BTreeSet<ChannelId> {
        self.states
            .iter()
            .filter(|((g, _), _)| *g == guild_id)
            .map(|(_, entry)| entry.channel_id)
            .collect()
    }

    /// Number of connected members across all guilds.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no member is connected.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId::new(1);

    fn member(id: u64) -> MemberProfile {
        MemberProfile::new(UserId::new(id), format!("user{id}"))
    }

    #[test]
    fn test_apply_reports_previous_channel() {
        let mut cache = VoiceStateCache::new();

        let join = cache.apply(GUILD, member(7), Some(ChannelId::new(10)));
        assert_eq!((join.before, join.after), (None, Some(ChannelId::new(10))));

        let moved = cache.apply(GUILD, member(7), Some(ChannelId::new(11)));
        assert_eq!(moved.before, Some(ChannelId::new(10)));

        let left = cache.apply(GUILD, member(7), None);
        assert_eq!((left.before, left.after), (Some(ChannelId::new(11)), None));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reconcile_emits_only_differences() {
        let mut cache = VoiceStateCache::new();
        cache.apply(GUILD, member(1), Some(ChannelId::new(10)));
        cache.apply(GUILD, member(2), Some(ChannelId::new(10)));
        cache.apply(GUILD, member(3), Some(ChannelId::new(10)));
        cache.apply(GuildId::new(2), member(9), Some(ChannelId::new(90)));

        let transitions = cache.reconcile_guild(
            GUILD,
            vec![
                (member(1), ChannelId::new(10)),
                (member(2), ChannelId::new(11)),
                (member(4), ChannelId::new(10)),
            ],
        );

        let summary: Vec<_> = transitions
            .iter()
            .map(|t| (t.member.user_id.get(), t.before, t.after))
            .collect();
        assert_eq!(
            summary,
            vec![
                (2, Some(ChannelId::new(10)), Some(ChannelId::new(11))),
                (4, None, Some(ChannelId::new(10))),
                (3, Some(ChannelId::new(10)), None),
            ]
        );
        assert_eq!(cache.channel_of(GuildId::new(2), UserId::new(9)), Some(ChannelId::new(90)));
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_clear_guild_leaves_everyone() {
        let mut cache = VoiceStateCache::new();
        cache.apply(GUILD, member(1), Some(ChannelId::new(10)));
        cache.apply(GUILD, member(2), Some(ChannelId::new(11)));

        let leaves = cache.clear_guild(GUILD);

        assert_eq!(leaves.len(), 2);
        assert!(leaves.iter().all(|t| t.after.is_none() && t.before.is_some()));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_channel_members_and_profile_update() {
        let mut cache = VoiceStateCache::new();
        cache.apply(GUILD, member(2), Some(ChannelId::new(10)));
        cache.apply(GUILD, member(1), Some(ChannelId::new(10)));

        let mut renamed = member(1);
        renamed.nick = Some("Nick".into());
        assert!(cache.update_member(GUILD, &renamed));
        assert!(!cache.update_member(GUILD, &member(5)));

        let members = cache.channel_members(GUILD, ChannelId::new(10));
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].display_name(), "Nick");
        assert_eq!(
            cache.occupied_channels(GUILD).into_iter().collect::<Vec<_>>(),
            vec![ChannelId::new(10)]
        );
    }
}
