//! Accrual scheduler — turns "currently present" into "seconds present".
//!
//! Each tick measures the monotonic time since the previous accepted tick
//! and adds it to:
//!
//! - every present member's own counter
//! - every occupied channel's counter, once regardless of occupant count
//! - every guild with at least one occupied channel, once regardless of
//!   how many channels are occupied

use std::collections::HashSet;

use serde::Serialize;
use tokio::time::Instant;
use tracing::trace;

use voicetime_core::types::GuildId;

use crate::presence::store::PresenceSnapshot;
use crate::publish::Publisher;

/// Bookkeeping for the accrual clock.
#[derive(Debug, Clone)]
pub struct AccrualScheduler {
    /// Reading of the last accepted tick.
    last_tick: Instant,
    /// Number of accepted ticks.
    ticks: u64,
}

/// What a tick did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// The clock reading did not advance past the last tick; nothing was
    /// accrued and the last tick was kept.
    Skipped,
    /// Elapsed time was accrued.
    Accrued(TickReport),
}

/// Summary of an accepted tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    /// Seconds accrued by this tick.
    pub dt_seconds: f64,
    /// Members credited.
    pub users: usize,
    /// Occupied channels credited.
    pub channels_active: usize,
    /// Guilds credited.
    pub guilds_active: usize,
}

impl AccrualScheduler {
    /// Start measuring from `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            last_tick: start,
            ticks: 0,
        }
    }

    /// Reading of the last accepted tick.
    pub fn last_tick(&self) -> Instant {
        self.last_tick
    }

    /// Number of accepted ticks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Move the baseline to `now` without accruing anything. Presence that
    /// existed before the baseline is never counted.
    pub fn restart(&mut self, now: Instant) {
        self.last_tick = now;
    }

    /// Positive seconds elapsed between the last tick and `now`, if any.
    pub fn elapsed(&self, now: Instant) -> Option<f64> {
        now.checked_duration_since(self.last_tick)
            .map(|d| d.as_secs_f64())
            .filter(|dt| *dt > 0.0)
    }

    /// Accrue the time since the last tick over `snapshot`.
    pub(crate) fn tick(
        &mut self,
        now: Instant,
        snapshot: &PresenceSnapshot,
        publisher: Publisher<'_>,
    ) -> TickOutcome {
        let Some(dt) = self.elapsed(now) else {
            trace!("Accrual tick skipped, clock did not advance");
            return TickOutcome::Skipped;
        };
        self.last_tick = now;
        self.ticks += 1;

        let sink = publisher.sink;
        let directory = publisher.directory;

        for (guild_id, user_id) in snapshot.entries.keys() {
            sink.add_user_seconds(*guild_id, *user_id, dt);
        }

        let mut channels_active = 0usize;
        let mut active_guilds: HashSet<GuildId> = HashSet::new();
        for ((guild_id, channel_id), members) in &snapshot.channels {
            let labels = directory.channel_labels(*guild_id, *channel_id);
            if members.is_empty() {
                sink.set_channel_occupancy(&labels, 0);
                continue;
            }

            sink.add_channel_seconds(&labels, dt);
            sink.set_channel_occupancy(&labels, members.len());
            channels_active += 1;
            active_guilds.insert(*guild_id);
        }

        for guild_id in &active_guilds {
            sink.add_guild_seconds(&directory.guild_labels(*guild_id), dt);
        }

        TickOutcome::Accrued(TickReport {
            dt_seconds: dt,
            users: snapshot.entries.len(),
            channels_active,
            guilds_active: active_guilds.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[test]
    fn test_elapsed_rejects_non_positive() {
        let start = Instant::now();
        let scheduler = AccrualScheduler::new(start);
        assert_eq!(scheduler.elapsed(start), None);
        assert_eq!(scheduler.elapsed(start - Duration::from_millis(1)), None);
        assert_eq!(scheduler.elapsed(start + Duration::from_secs(2)), Some(2.0));
    }

    #[test]
    fn test_restart_moves_baseline() {
        let start = Instant::now();
        let mut scheduler = AccrualScheduler::new(start);
        let later = start + Duration::from_secs(3);
        scheduler.restart(later);
        assert_eq!(scheduler.last_tick(), later);
        assert_eq!(scheduler.ticks(), 0);
    }
}
