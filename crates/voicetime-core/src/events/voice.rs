//! Voice channel transitions.

use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, GuildId, MemberProfile};

/// A single before/after voice state notification for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceTransition {
    /// The guild the voice state belongs to.
    pub guild_id: GuildId,
    /// The member whose voice state changed.
    pub member: MemberProfile,
    /// Channel before the change, `None` when not connected.
    pub before: Option<ChannelId>,
    /// Channel after the change, `None` when disconnected.
    pub after: Option<ChannelId>,
}
