//! Tracker runner — main loop feeding gateway events and accrual ticks
//! into the engine.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};

use voicetime_core::config::AccrualConfig;
use voicetime_core::events::GatewayEvent;

use crate::accrual::scheduler::TickOutcome;
use crate::engine::PresenceEngine;

/// Drives a [`PresenceEngine`] from the gateway event stream and a
/// fixed-interval ticker.
///
/// The ticker is armed only after the first `Ready` snapshot has been
/// handled, so the first tick never precedes seeding.
#[derive(Debug)]
pub struct TrackerRunner {
    /// Engine being driven
    engine: Arc<PresenceEngine>,
    /// Time between accrual ticks
    tick_interval: Duration,
}

impl TrackerRunner {
    /// Create a runner for `engine`.
    pub fn new(engine: Arc<PresenceEngine>, config: &AccrualConfig) -> Self {
        Self {
            engine,
            tick_interval: config.tick_interval(),
        }
    }

    /// Run until the cancel signal is received or the event stream closes.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<GatewayEvent>,
        mut cancel: watch::Receiver<bool>,
    ) {
        info!(
            "Tracker started with tick_interval={:?}, waiting for gateway snapshot",
            self.tick_interval
        );

        let mut ticker: Option<Interval> = None;

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        info!("Tracker received shutdown signal");
                        break;
                    }
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("Gateway event stream closed");
                        break;
                    };

                    let is_ready = matches!(event, GatewayEvent::Ready(_));
                    self.engine.handle_event(&event, Instant::now());

                    if is_ready && ticker.is_none() {
                        ticker = Some(self.start_ticker());
                        info!("Accrual loop started (every {:?})", self.tick_interval);
                    }
                }
                _ = next_tick(&mut ticker) => {
                    self.tick();
                }
            }
        }

        info!("Tracker shut down complete");
    }

    fn start_ticker(&self) -> Interval {
        let mut interval = time::interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    fn tick(&self) {
        match self.engine.accrue(Instant::now()) {
            TickOutcome::Accrued(report) => debug!(
                dt = report.dt_seconds,
                users = report.users,
                channels = report.channels_active,
                guilds = report.guilds_active,
                "Accrual tick"
            ),
            TickOutcome::Skipped => {}
        }
    }
}

/// Wait for the next tick, or forever while the ticker is not armed.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
