//! Latest known names per user and per guild member.
//!
//! Purely informational: nothing in accrual reads these records. Entries
//! are overwritten on every observation and never removed.

use dashmap::DashMap;

use voicetime_core::types::{GuildId, MemberProfile, UserId, UserIdentity};

/// Cache of user identities and per-guild display names.
#[derive(Debug, Default)]
pub struct IdentityCache {
    /// User ID → account names
    users: DashMap<UserId, UserIdentity>,
    /// (Guild ID, User ID) → resolved display name
    displays: DashMap<(GuildId, UserId), String>,
}

impl IdentityCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the account names of a user.
    pub fn record_user(&self, user_id: UserId, identity: &UserIdentity) {
        self.users.insert(user_id, identity.clone());
    }

    /// Record a guild member: its account names and its resolved display
    /// name. Returns the display name.
    pub fn record_member(&self, guild_id: GuildId, member: &MemberProfile) -> String {
        self.record_user(member.user_id, &member.identity);
        let display = member.display_name().to_string();
        self.displays
            .insert((guild_id, member.user_id), display.clone());
        display
    }

    /// Latest account names of a user.
    pub fn user(&self, user_id: UserId) -> Option<UserIdentity> {
        self.users.get(&user_id).map(|r| r.value().clone())
    }

    /// Latest display name of a member in a guild.
    pub fn display_name(&self, guild_id: GuildId, user_id: UserId) -> Option<String> {
        self.displays
            .get(&(guild_id, user_id))
            .map(|r| r.value().clone())
    }

    /// Number of users with a recorded identity.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_member_overwrites() {
        let cache = IdentityCache::new();
        let guild = GuildId::new(1);
        let mut member = MemberProfile::new(UserId::new(5), "alice");

        assert_eq!(cache.record_member(guild, &member), "alice");
        member.nick = Some("Ally".into());
        assert_eq!(cache.record_member(guild, &member), "Ally");

        assert_eq!(cache.display_name(guild, member.user_id).as_deref(), Some("Ally"));
        assert_eq!(cache.user(member.user_id).map(|u| u.username), Some("alice".into()));
        assert_eq!(cache.user_count(), 1);
    }

    #[test]
    fn test_display_is_per_guild() {
        let cache = IdentityCache::new();
        let mut member = MemberProfile::new(UserId::new(5), "alice");
        member.nick = Some("one".into());
        cache.record_member(GuildId::new(1), &member);
        member.nick = None;
        cache.record_member(GuildId::new(2), &member);

        assert_eq!(cache.display_name(GuildId::new(1), member.user_id).as_deref(), Some("one"));
        assert_eq!(cache.display_name(GuildId::new(2), member.user_id).as_deref(), Some("alice"));
    }
}
