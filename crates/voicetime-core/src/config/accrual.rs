//! Accrual scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the periodic time-accrual loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccrualConfig {
    /// Seconds between accrual ticks.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f64,
}

impl AccrualConfig {
    /// The tick interval as a [`Duration`].
    ///
    /// Only meaningful after [`super::AppConfig::validate`] has accepted the
    /// value.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tick_seconds)
    }
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
        }
    }
}

fn default_tick_seconds() -> f64 {
    5.0
}
