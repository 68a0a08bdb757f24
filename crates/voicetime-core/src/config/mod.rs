//! Application configuration schemas.
//!
//! Configuration is merged from optional TOML files, `VOICETIME__*`
//! environment variables and the bare variable names the bot has always
//! accepted (`DISCORD_TOKEN`, `PROM_PORT`, `TICK_SECONDS`). Each sub-module
//! represents a logical configuration section.

pub mod accrual;
pub mod gateway;
pub mod logging;
pub mod metrics;

use std::time::Duration;

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

pub use self::accrual::AccrualConfig;
pub use self::gateway::GatewayConfig;
pub use self::logging::LoggingConfig;
pub use self::metrics::MetricsConfig;

use crate::error::AppError;

/// Bare environment variables and the config keys they override.
const LEGACY_ENV: [(&str, &str); 3] = [
    ("DISCORD_TOKEN", "gateway.token"),
    ("PROM_PORT", "metrics.port"),
    ("TICK_SECONDS", "accrual.tick_seconds"),
];

/// Shortest accepted accrual tick.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Longest accepted accrual tick.
const MAX_TICK: Duration = Duration::from_secs(24 * 60 * 60);

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gateway connection settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Prometheus exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Accrual loop settings.
    #[serde(default)]
    pub accrual: AccrualConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration for the given environment name.
    ///
    /// Merges `config/default.toml`, `config/{env}.toml`, variables prefixed
    /// with `VOICETIME__` and the legacy bare variables, in that order.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let builder = config::Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                Environment::with_prefix("VOICETIME")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::build(builder, |key| std::env::var(key).ok())
    }

    /// Apply legacy overrides from `lookup` and deserialize.
    pub fn build(
        builder: ConfigBuilder<DefaultState>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let mut builder = builder;
        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(key, lookup(var))?;
        }

        builder
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Reject configurations the process cannot start with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.gateway.token.trim().is_empty() {
            return Err(AppError::configuration(
                "Gateway token is missing; set DISCORD_TOKEN or VOICETIME__GATEWAY__TOKEN",
            ));
        }

        let tick = self.accrual.tick_seconds;
        match Duration::try_from_secs_f64(tick) {
            Ok(period) if (MIN_TICK..=MAX_TICK).contains(&period) => {}
            _ => {
                return Err(AppError::validation(format!(
                    "accrual.tick_seconds must be between {} and {} seconds, got {tick}",
                    MIN_TICK.as_secs_f64(),
                    MAX_TICK.as_secs_f64()
                )));
            }
        }

        if self.metrics.port == 0 {
            return Err(AppError::validation("metrics.port must be non-zero"));
        }

        if self.gateway.event_buffer_size == 0 {
            return Err(AppError::validation(
                "gateway.event_buffer_size must be non-zero",
            ));
        }

        Ok(())
    }
}
