//! Pushes presence-derived values to the metrics sink.

use voicetime_core::traits::{MetricsSink, NameDirectory};
use voicetime_core::types::{ChannelId, GuildId, MemberProfile, UserId, UserIdentity};

use crate::presence::identity::IdentityCache;
use crate::presence::store::PresenceStore;

/// Borrowed collaborators shared by the ingestor, seeder and scheduler.
#[derive(Clone, Copy)]
pub(crate) struct Publisher<'a> {
    pub(crate) sink: &'a dyn MetricsSink,
    pub(crate) directory: &'a dyn NameDirectory,
    pub(crate) identities: &'a IdentityCache,
}

impl Publisher<'_> {
    /// Set the occupancy gauges of a channel from the store.
    pub(crate) fn channel_gauges(&self, store: &PresenceStore, guild_id: GuildId, channel_id: ChannelId) {
        let labels = self.directory.channel_labels(guild_id, channel_id);
        self.sink
            .set_channel_occupancy(&labels, store.channel_size(guild_id, channel_id));
    }

    /// Refresh both identity records of a member. Returns its display name.
    pub(crate) fn member(&self, guild_id: GuildId, member: &MemberProfile) -> String {
        let display = self.identities.record_member(guild_id, member);
        self.sink.set_user_info(member.user_id, &member.identity);
        self.sink
            .set_member_display(guild_id, member.user_id, &display);
        display
    }

    /// Refresh the account-level record of a user.
    pub(crate) fn user(&self, user_id: UserId, identity: &UserIdentity) {
        self.identities.record_user(user_id, identity);
        self.sink.set_user_info(user_id, identity);
    }
}
