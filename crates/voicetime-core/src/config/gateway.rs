//! Gateway connection configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the voice gateway connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bot token used to identify. Required.
    #[serde(default)]
    pub token: String,
    /// Gateway websocket URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Initial reconnect delay in milliseconds.
    #[serde(default = "default_initial_backoff")]
    pub reconnect_initial_backoff_ms: u64,
    /// Upper bound for the reconnect delay in seconds.
    #[serde(default = "default_max_backoff")]
    pub reconnect_max_backoff_seconds: u64,
    /// Capacity of the event channel between gateway and tracker.
    #[serde(default = "default_event_buffer")]
    pub event_buffer_size: usize,
    /// How long to wait after READY for outstanding guilds before the
    /// startup snapshot goes out without them, in milliseconds.
    #[serde(default = "default_guild_ready_timeout")]
    pub guild_ready_timeout_ms: u64,
}

impl GatewayConfig {
    /// Initial reconnect delay.
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_backoff_ms)
    }

    /// Maximum reconnect delay.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_max_backoff_seconds)
    }

    /// Wait for outstanding guilds after READY.
    pub fn guild_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.guild_ready_timeout_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            url: default_url(),
            reconnect_initial_backoff_ms: default_initial_backoff(),
            reconnect_max_backoff_seconds: default_max_backoff(),
            event_buffer_size: default_event_buffer(),
            guild_ready_timeout_ms: default_guild_ready_timeout(),
        }
    }
}

fn default_url() -> String {
    "wss://gateway.discord.gg/?v=10&encoding=json".to_string()
}

fn default_initial_backoff() -> u64 {
    1000
}

fn default_max_backoff() -> u64 {
    60
}

fn default_event_buffer() -> usize {
    1024
}

fn default_guild_ready_timeout() -> u64 {
    2000
}
