//! Events produced by the gateway collaborator.
//!
//! The gateway crate decodes its wire protocol into these types and sends
//! them over a channel; the tracker consumes them without knowing anything
//! about the transport.

pub mod snapshot;
pub mod voice;

use serde::{Deserialize, Serialize};

use crate::types::{GuildId, MemberProfile, UserId, UserIdentity};

pub use snapshot::{ChannelSnapshot, GatewaySnapshot, GuildSnapshot};
pub use voice::VoiceTransition;

/// Union of all events the gateway delivers to the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Current voice membership of every known guild, delivered once the
    /// initial connection has received all guilds.
    Ready(GatewaySnapshot),
    /// A member's voice channel changed (or was re-reported unchanged).
    VoiceStateChanged(VoiceTransition),
    /// A user's account-level names changed.
    UserUpdated {
        /// The user ID.
        user_id: UserId,
        /// Latest account names.
        identity: UserIdentity,
    },
    /// A guild member's profile (nickname or names) changed.
    MemberUpdated {
        /// The guild the member belongs to.
        guild_id: GuildId,
        /// Latest member profile.
        member: MemberProfile,
    },
}
