//! Gateway v10 wire types.
//!
//! Only the opcodes and dispatch fields the voice tracker needs are
//! modelled; unknown fields are ignored and unknown dispatches decode to
//! [`Dispatch::Other`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use voicetime_core::types::{ChannelId, GuildId, MemberProfile, UserId, UserIdentity};

/// Gateway opcodes.
pub mod opcode {
    /// An event was dispatched.
    pub const DISPATCH: u8 = 0;
    /// Heartbeat, sent by either side.
    pub const HEARTBEAT: u8 = 1;
    /// Start a new session.
    pub const IDENTIFY: u8 = 2;
    /// The client should reconnect.
    pub const RECONNECT: u8 = 7;
    /// The session has been invalidated.
    pub const INVALID_SESSION: u8 = 9;
    /// Sent immediately after connecting.
    pub const HELLO: u8 = 10;
    /// Heartbeat acknowledged.
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Gateway intent bits.
pub mod intents {
    /// Guild, channel and role lifecycle.
    pub const GUILDS: u64 = 1 << 0;
    /// Member updates (privileged).
    pub const GUILD_MEMBERS: u64 = 1 << 1;
    /// Voice state updates.
    pub const GUILD_VOICE_STATES: u64 = 1 << 7;

    /// Intents requested at identify.
    pub const VOICE_TRACKING: u64 = GUILDS | GUILD_MEMBERS | GUILD_VOICE_STATES;
}

/// Channel type of a guild voice channel.
pub const CHANNEL_TYPE_VOICE: u8 = 2;
/// Channel type of a stage channel.
pub const CHANNEL_TYPE_STAGE: u8 = 13;

/// Envelope of every gateway message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayload {
    /// Opcode.
    pub op: u8,
    /// Event data.
    #[serde(default)]
    pub d: Option<Value>,
    /// Sequence number, dispatches only.
    #[serde(default)]
    pub s: Option<u64>,
    /// Event name, dispatches only.
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayPayload {
    /// Heartbeat carrying the last received sequence number.
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self {
            op: opcode::HEARTBEAT,
            d: Some(last_sequence.map_or(Value::Null, Value::from)),
            s: None,
            t: None,
        }
    }

    /// Identify for a fresh session.
    pub fn identify(token: &str, intents: u64) -> Self {
        Self {
            op: opcode::IDENTIFY,
            d: Some(serde_json::json!({
                "token": token,
                "intents": intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": env!("CARGO_PKG_NAME"),
                    "device": env!("CARGO_PKG_NAME"),
                },
            })),
            s: None,
            t: None,
        }
    }
}

/// Data of the Hello opcode.
#[derive(Debug, Clone, Deserialize)]
pub struct Hello {
    /// Heartbeat interval in milliseconds.
    pub heartbeat_interval: u64,
}

/// A user object.
#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
}

impl RawUser {
    /// Account names of the user.
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            username: self.username.clone(),
            global_name: self.global_name.clone(),
        }
    }
}

/// A guild member object.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMember {
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default)]
    pub nick: Option<String>,
}

impl RawMember {
    /// Profile of the member, when the user object is present.
    pub fn profile(&self) -> Option<MemberProfile> {
        self.user.as_ref().map(|user| MemberProfile {
            user_id: user.id,
            identity: user.identity(),
            nick: self.nick.clone(),
        })
    }
}

/// A channel object.
#[derive(Debug, Clone, Deserialize)]
pub struct RawChannel {
    pub id: ChannelId,
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
}

impl RawChannel {
    /// Whether members can be connected to this channel.
    pub fn is_voice(&self) -> bool {
        matches!(self.kind, CHANNEL_TYPE_VOICE | CHANNEL_TYPE_STAGE)
    }
}

/// A voice state object.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVoiceState {
    /// Absent inside GUILD_CREATE.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    pub channel_id: Option<ChannelId>,
    pub user_id: UserId,
    #[serde(default)]
    pub member: Option<RawMember>,
}

/// A guild entry of READY or GUILD_DELETE.
#[derive(Debug, Clone, Deserialize)]
pub struct UnavailableGuild {
    pub id: GuildId,
    #[serde(default)]
    pub unavailable: bool,
}

/// Data of READY.
#[derive(Debug, Clone, Deserialize)]
pub struct Ready {
    pub user: RawUser,
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
}

/// Data of GUILD_CREATE.
#[derive(Debug, Clone, Deserialize)]
pub struct GuildCreate {
    pub id: GuildId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub channels: Vec<RawChannel>,
    #[serde(default)]
    pub members: Vec<RawMember>,
    #[serde(default)]
    pub voice_states: Vec<RawVoiceState>,
}

/// Data of GUILD_UPDATE.
#[derive(Debug, Clone, Deserialize)]
pub struct GuildUpdate {
    pub id: GuildId,
    pub name: String,
}

/// Data of GUILD_MEMBER_UPDATE.
#[derive(Debug, Clone, Deserialize)]
pub struct GuildMemberUpdate {
    pub guild_id: GuildId,
    pub user: RawUser,
    #[serde(default)]
    pub nick: Option<String>,
}

impl GuildMemberUpdate {
    /// Updated profile of the member.
    pub fn profile(&self) -> MemberProfile {
        MemberProfile {
            user_id: self.user.id,
            identity: self.user.identity(),
            nick: self.nick.clone(),
        }
    }
}

/// A decoded dispatch event.
#[derive(Debug, Clone)]
pub enum Dispatch {
    Ready(Ready),
    GuildCreate(Box<GuildCreate>),
    GuildUpdate(GuildUpdate),
    GuildDelete(UnavailableGuild),
    ChannelUpsert(RawChannel),
    ChannelDelete(RawChannel),
    VoiceStateUpdate(RawVoiceState),
    GuildMemberUpdate(GuildMemberUpdate),
    /// A dispatch the tracker does not consume.
    Other(String),
}

impl Dispatch {
    /// Decode the data of the dispatch named `name`.
    pub fn decode(name: &str, data: Value) -> Result<Self, serde_json::Error> {
        Ok(match name {
            "READY" => Self::Ready(serde_json::from_value(data)?),
            "GUILD_CREATE" => Self::GuildCreate(Box::new(serde_json::from_value(data)?)),
            "GUILD_UPDATE" => Self::GuildUpdate(serde_json::from_value(data)?),
            "GUILD_DELETE" => Self::GuildDelete(serde_json::from_value(data)?),
            "CHANNEL_CREATE" | "CHANNEL_UPDATE" => {
                Self::ChannelUpsert(serde_json::from_value(data)?)
            }
            "CHANNEL_DELETE" => Self::ChannelDelete(serde_json::from_value(data)?),
            "VOICE_STATE_UPDATE" => Self::VoiceStateUpdate(serde_json::from_value(data)?),
            "GUILD_MEMBER_UPDATE" => Self::GuildMemberUpdate(serde_json::from_value(data)?),
            other => Self::Other(other.to_string()),
        })
    }
}
