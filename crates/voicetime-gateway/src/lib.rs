//! # voicetime-gateway
//!
//! Discord gateway v10 client for voicetime. Provides:
//!
//! - WebSocket session handling (Hello, Identify, heartbeat, reconnect)
//! - Dispatch decoding into [`GatewayEvent`](voicetime_core::events::GatewayEvent)s
//! - A guild/channel name directory used for metric labels
//! - A voice-state cache that supplies the `before` side of transitions

pub mod client;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod voice_cache;

pub use client::GatewayClient;
pub use directory::NameCache;
pub use dispatcher::Dispatcher;
pub use error::GatewayError;
pub use voice_cache::VoiceStateCache;
