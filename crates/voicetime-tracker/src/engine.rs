//! Presence engine — serializes every presence mutation, snapshot and tick
//! behind one lock.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::time::Instant;
use tracing::{debug, warn};

use voicetime_core::events::{GatewayEvent, GatewaySnapshot, VoiceTransition};
use voicetime_core::traits::{MetricsSink, NameDirectory};
use voicetime_core::types::{GuildId, MemberProfile, UserId, UserIdentity};

use crate::accrual::scheduler::{AccrualScheduler, TickOutcome};
use crate::ingest::ingestor::EventIngestor;
use crate::ingest::transition::Transition;
use crate::presence::identity::IdentityCache;
use crate::presence::store::{PresenceSnapshot, PresenceStore};
use crate::publish::Publisher;
use crate::seeder::{self, SeedOutcome};

/// State guarded by the engine lock.
#[derive(Debug)]
struct TrackerState {
    store: PresenceStore,
    scheduler: AccrualScheduler,
    seeded: bool,
}

/// Owns the presence store and drives it from gateway events and ticks.
pub struct PresenceEngine {
    /// Store, accrual clock and seeding flag
    state: Mutex<TrackerState>,
    /// Latest known names
    identities: IdentityCache,
    /// Metrics destination
    sink: Arc<dyn MetricsSink>,
    /// Guild and channel names for labels
    directory: Arc<dyn NameDirectory>,
}

impl std::fmt::Debug for PresenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceEngine").finish()
    }
}

impl PresenceEngine {
    /// Create an engine whose accrual clock starts at `start`.
    pub fn new(
        sink: Arc<dyn MetricsSink>,
        directory: Arc<dyn NameDirectory>,
        start: Instant,
    ) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                store: PresenceStore::new(),
                scheduler: AccrualScheduler::new(start),
                seeded: false,
            }),
            identities: IdentityCache::new(),
            sink,
            directory,
        }
    }

    /// Dispatch one gateway event.
    pub fn handle_event(&self, event: &GatewayEvent, now: Instant) {
        match event {
            GatewayEvent::Ready(snapshot) => {
                self.seed(snapshot, now);
            }
            GatewayEvent::VoiceStateChanged(transition) => {
                self.apply_transition(transition);
            }
            GatewayEvent::UserUpdated { user_id, identity } => {
                self.update_user(*user_id, identity);
            }
            GatewayEvent::MemberUpdated { guild_id, member } => {
                self.update_member(*guild_id, member);
            }
        }
    }

    /// Seed the store from the gateway's startup snapshot.
    ///
    /// Only the first snapshot is handled. It populates the store when no
    /// live event got there first, and in either case moves the accrual
    /// baseline to `now` so time before startup is never credited.
    pub fn seed(&self, snapshot: &GatewaySnapshot, now: Instant) -> SeedOutcome {
        let mut guard = self.lock();
        if guard.seeded {
            debug!("Ignoring repeated seed snapshot");
            return SeedOutcome::AlreadySeeded;
        }

        let state = &mut *guard;
        let outcome = seeder::seed(&mut state.store, self.publisher(), snapshot);
        if outcome == SeedOutcome::StoreNotEmpty {
            warn!(
                members = state.store.member_count(),
                "Seed snapshot arrived after live presence was recorded, skipping"
            );
        }

        state.scheduler.restart(now);
        state.seeded = true;
        outcome
    }

    /// Apply a voice transition.
    pub fn apply_transition(&self, transition: &VoiceTransition) -> Transition {
        let mut state = self.lock();
        EventIngestor::new(&mut state.store, self.publisher()).apply(transition)
    }

    /// Refresh a user's account names.
    pub fn update_user(&self, user_id: UserId, identity: &UserIdentity) {
        self.publisher().user(user_id, identity);
    }

    /// Refresh a member's display name and account names.
    pub fn update_member(&self, guild_id: GuildId, member: &MemberProfile) {
        self.publisher().member(guild_id, member);
    }

    /// Accrue elapsed time up to `now`.
    ///
    /// The elapsed-time computation, the baseline update and the snapshot
    /// all happen under the engine lock, so overlapping calls cannot both
    /// credit the same interval.
    pub fn accrue(&self, now: Instant) -> TickOutcome {
        let mut state = self.lock();
        let snapshot = state.store.snapshot();
        state.scheduler.tick(now, &snapshot, self.publisher())
    }

    /// Whether the startup snapshot has been handled.
    pub fn is_seeded(&self) -> bool {
        self.lock().seeded
    }

    /// An owned copy of current presence.
    pub fn snapshot(&self) -> PresenceSnapshot {
        self.lock().store.snapshot()
    }

    /// Run `f` against the store under the engine lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&PresenceStore) -> R) -> R {
        f(&self.lock().store)
    }

    /// Identity records.
    pub fn identities(&self) -> &IdentityCache {
        &self.identities
    }

    fn publisher(&self) -> Publisher<'_> {
        Publisher {
            sink: self.sink.as_ref(),
            directory: self.directory.as_ref(),
            identities: &self.identities,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
