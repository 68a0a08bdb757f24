//! Error type for the gateway session.
//!
//! Transport, protocol and session-control failures are consolidated into
//! `GatewayError`, which maps to `voicetime_core::error::AppError`.

use thiserror::Error;
use tokio_tungstenite::tungstenite;
use voicetime_core::error::{AppError, ErrorKind};

/// Close codes after which reconnecting cannot succeed.
const FATAL_CLOSE_CODES: [u16; 6] = [4004, 4010, 4011, 4012, 4013, 4014];

/// Close code for a rejected token.
const AUTHENTICATION_FAILED: u16 = 4004;

/// Errors ending a gateway session.
#[derive(Debug, Error)]
pub enum GatewayError {
    // --- Transport errors ---
    /// WebSocket transport failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The server closed the connection.
    #[error("Gateway closed the connection (code {code}): {reason}")]
    Closed {
        /// Close code, 1005 when none was sent.
        code: u16,
        /// Close reason text.
        reason: String,
    },

    /// The stream ended without a close frame.
    #[error("Gateway stream ended unexpectedly")]
    StreamEnded,

    // --- Protocol errors ---
    /// A payload could not be decoded.
    #[error("Invalid gateway payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The first payload was not Hello.
    #[error("Expected Hello, received op {op}")]
    MissingHello {
        /// Opcode actually received.
        op: u8,
    },

    /// The previous heartbeat was never acknowledged.
    #[error("Heartbeat not acknowledged, connection is stale")]
    HeartbeatTimeout,

    // --- Session control ---
    /// The gateway asked the client to reconnect (op 7).
    #[error("Gateway requested a reconnect")]
    ReconnectRequested,

    /// The session was invalidated (op 9).
    #[error("Gateway invalidated the session")]
    InvalidSession,
}

impl GatewayError {
    /// Whether reconnecting is pointless (bad token, bad intents, bad shard).
    pub fn is_fatal(&self) -> bool {
        matches!(self, GatewayError::Closed { code, .. } if FATAL_CLOSE_CODES.contains(code))
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match &err {
            GatewayError::Closed {
                code: AUTHENTICATION_FAILED,
                ..
            } => AppError::authentication(err.to_string()),
            GatewayError::Payload(_) => {
                AppError::with_source(ErrorKind::Serialization, err.to_string(), err)
            }
            _ => AppError::with_source(ErrorKind::Gateway, err.to_string(), err),
        }
    }
}
