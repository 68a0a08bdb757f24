//! Presence store — who is currently connected to which voice channel.
//!
//! Two maps are kept in lock-step:
//!
//! - `entries`: `(guild, user) → channel`, at most one per member
//! - `channels`: `(guild, channel) → {user}`, never empty
//!
//! Every user appears in exactly the membership set named by its entry.
//! The store is not synchronized; [`crate::PresenceEngine`] owns it behind
//! its lock.

use std::collections::{HashMap, HashSet};

use voicetime_core::types::{ChannelId, GuildId, UserId};

/// Effect of a store mutation on one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceChange {
    /// Channel the member occupied before the operation.
    pub previous: Option<ChannelId>,
    /// Channel the member occupies after the operation.
    pub current: Option<ChannelId>,
}

impl PresenceChange {
    /// Whether the operation changed anything.
    pub fn is_noop(&self) -> bool {
        self.previous == self.current
    }

    /// Channels whose occupancy changed, at most two and without repeats.
    pub fn touched(&self) -> impl Iterator<Item = ChannelId> {
        let (previous, current) = if self.is_noop() {
            (None, None)
        } else {
            (self.previous, self.current)
        };
        previous.into_iter().chain(current)
    }
}

/// Owned in-memory presence state.
#[derive(Debug, Clone, Default)]
pub struct PresenceStore {
    /// (guild, user) → current channel
    entries: HashMap<(GuildId, UserId), ChannelId>,
    /// (guild, channel) → connected users
    channels: HashMap<(GuildId, ChannelId), HashSet<UserId>>,
}

impl PresenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `user_id` is connected to `channel_id`.
    ///
    /// A member that already has an entry is an ordering anomaly: the stale
    /// membership is dropped before the new one is added.
    pub fn join(&mut self, guild_id: GuildId, user_id: UserId, channel_id: ChannelId) -> PresenceChange {
        let previous = self.entries.insert((guild_id, user_id), channel_id);

        if let Some(stale) = previous.filter(|c| *c != channel_id) {
            self.remove_member(guild_id, stale, user_id);
        }

        self.channels
            .entry((guild_id, channel_id))
            .or_default()
            .insert(user_id);

        PresenceChange {
            previous,
            current: Some(channel_id),
        }
    }

    /// Record that `user_id` left voice in `guild_id`. No-op when the store
    /// never saw the member connect.
    pub fn leave(&mut self, guild_id: GuildId, user_id: UserId) -> PresenceChange {
        let previous = self.entries.remove(&(guild_id, user_id));

        if let Some(channel_id) = previous {
            self.remove_member(guild_id, channel_id, user_id);
        }

        PresenceChange {
            previous,
            current: None,
        }
    }

    /// Move `user_id` to `channel_id`. Without a prior entry this is a join.
    pub fn move_to(&mut self, guild_id: GuildId, user_id: UserId, channel_id: ChannelId) -> PresenceChange {
        // join already removes the old membership before adding the new one
        self.join(guild_id, user_id, channel_id)
    }

    /// Current channel of a member.
    pub fn channel_of(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        self.entries.get(&(guild_id, user_id)).copied()
    }

    /// Number of users connected to a channel.
    pub fn channel_size(&self, guild_id: GuildId, channel_id: ChannelId) -> usize {
        self.channels
            .get(&(guild_id, channel_id))
            .map_or(0, HashSet::len)
    }

    /// Number of members with an entry.
    pub fn member_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of non-empty channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Whether nobody is connected anywhere.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.channels.is_empty()
    }

    /// An owned copy of both maps for the accrual step.
    pub fn snapshot(&self) -> PresenceSnapshot {
        PresenceSnapshot {
            entries: self.entries.clone(),
            channels: self.channels.clone(),
        }
    }

    /// Check that entries and membership sets agree and that no empty set
    /// is retained.
    pub fn is_consistent(&self) -> bool {
        let entries_covered = self.entries.iter().all(|((g, u), c)| {
            self.channels
                .get(&(*g, *c))
                .is_some_and(|members| members.contains(u))
        });

        let members_backed = self.channels.iter().all(|((g, c), members)| {
            !members.is_empty()
                && members
                    .iter()
                    .all(|u| self.entries.get(&(*g, *u)) == Some(c))
        });

        entries_covered && members_backed
    }

    fn remove_member(&mut self, guild_id: GuildId, channel_id: ChannelId, user_id: UserId) {
        let key = (guild_id, channel_id);
        if let Some(members) = self.channels.get_mut(&key) {
            members.remove(&user_id);
            if members.is_empty() {
                self.channels.remove(&key);
            }
        }
    }
}

/// Immutable view of the store taken under the engine lock.
#[derive(Debug, Clone, Default)]
pub struct PresenceSnapshot {
    /// (guild, user) → current channel
    pub entries: HashMap<(GuildId, UserId), ChannelId>,
    /// (guild, channel) → connected users
    pub channels: HashMap<(GuildId, ChannelId), HashSet<UserId>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: GuildId = GuildId::new(1);
    const C1: ChannelId = ChannelId::new(10);
    const C2: ChannelId = ChannelId::new(20);
    const U1: UserId = UserId::new(100);
    const U2: UserId = UserId::new(200);

    #[test]
    fn test_join_then_leave() {
        let mut store = PresenceStore::new();
        let change = store.join(G, U1, C1);
        assert_eq!(change.previous, None);
        assert_eq!(store.channel_size(G, C1), 1);
        assert!(store.is_consistent());

        let change = store.leave(G, U1);
        assert_eq!(change.previous, Some(C1));
        assert!(store.is_empty());
        assert!(store.is_consistent());
    }

    #[test]
    fn test_duplicate_join_overwrites() {
        let mut store = PresenceStore::new();
        store.join(G, U1, C1);
        let change = store.join(G, U1, C2);

        assert_eq!(change.previous, Some(C1));
        assert_eq!(store.channel_of(G, U1), Some(C2));
        assert_eq!(store.channel_size(G, C1), 0);
        assert_eq!(store.channel_count(), 1);
        assert!(store.is_consistent());
        assert_eq!(change.touched().collect::<Vec<_>>(), vec![C1, C2]);
    }

    #[test]
    fn test_repeated_join_same_channel_is_noop() {
        let mut store = PresenceStore::new();
        store.join(G, U1, C1);
        let change = store.join(G, U1, C1);
        assert!(change.is_noop());
        assert_eq!(change.touched().count(), 0);
        assert_eq!(store.channel_size(G, C1), 1);
    }

    #[test]
    fn test_leave_unknown_member_is_noop() {
        let mut store = PresenceStore::new();
        let change = store.leave(G, U1);
        assert!(change.is_noop());
        assert!(store.is_empty());
    }

    #[test]
    fn test_move_prunes_empty_channel() {
        let mut store = PresenceStore::new();
        store.join(G, U1, C1);
        store.join(G, U2, C1);
        store.move_to(G, U1, C2);
        assert_eq!(store.channel_size(G, C1), 1);
        store.move_to(G, U2, C2);
        assert_eq!(store.channel_count(), 1);
        assert_eq!(store.channel_size(G, C2), 2);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_move_without_entry_degrades_to_join() {
        let mut store = PresenceStore::new();
        let change = store.move_to(G, U1, C2);
        assert_eq!(change.previous, None);
        assert_eq!(store.channel_of(G, U1), Some(C2));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_same_user_in_two_guilds_is_independent() {
        let other = GuildId::new(2);
        let mut store = PresenceStore::new();
        store.join(G, U1, C1);
        store.join(other, U1, C2);
        store.leave(G, U1);
        assert_eq!(store.channel_of(other, U1), Some(C2));
        assert_eq!(store.member_count(), 1);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = PresenceStore::new();
        store.join(G, U1, C1);
        let snapshot = store.snapshot();
        store.leave(G, U1);
        assert_eq!(snapshot.entries.get(&(G, U1)), Some(&C1));
        assert!(store.is_empty());
    }

    #[test]
    fn test_adversarial_sequence_keeps_invariants() {
        let users = [U1, U2, UserId::new(300)];
        let channels = [C1, C2, ChannelId::new(30)];
        let mut store = PresenceStore::new();

        // deterministic pseudo-random walk over join/leave/move
        let mut seed: u64 = 0x9e37_79b9_7f4a_7c15;
        for _ in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let user = users[(seed % 3) as usize];
            let channel = channels[((seed >> 8) % 3) as usize];
            match (seed >> 16) % 3 {
                0 => store.join(G, user, channel),
                1 => store.leave(G, user),
                _ => store.move_to(G, user, channel),
            };
            assert!(store.is_consistent());
        }
    }
}
