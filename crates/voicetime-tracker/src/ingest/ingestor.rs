//! Event ingestor — applies classified voice transitions to the store.

use tracing::{debug, info};

use voicetime_core::events::VoiceTransition;
use voicetime_core::types::ChannelId;

use crate::presence::store::{PresenceChange, PresenceStore};
use crate::publish::Publisher;

use super::transition::Transition;

/// Applies voice notifications to a borrowed store.
///
/// Constructed by [`crate::PresenceEngine`] for the duration of one event
/// while the engine lock is held.
pub struct EventIngestor<'a> {
    store: &'a mut PresenceStore,
    publisher: Publisher<'a>,
}

impl<'a> EventIngestor<'a> {
    pub(crate) fn new(store: &'a mut PresenceStore, publisher: Publisher<'a>) -> Self {
        Self { store, publisher }
    }

    /// Classify and apply one notification.
    ///
    /// Unchanged notifications are discarded without touching the store or
    /// the identity records.
    pub fn apply(&mut self, event: &VoiceTransition) -> Transition {
        let transition = Transition::classify(event.before, event.after);
        let guild_id = event.guild_id;
        let user_id = event.member.user_id;

        let change = match transition {
            Transition::Unchanged => return transition,
            Transition::Join { channel } => self.store.join(guild_id, user_id, channel),
            Transition::Leave { .. } => self.store.leave(guild_id, user_id),
            Transition::Move { to, .. } => self.store.move_to(guild_id, user_id, to),
        };

        if !matches_expectation(&transition, &change) {
            debug!(
                guild_id = %guild_id,
                user_id = %user_id,
                transition = transition.as_str(),
                stored = ?change.previous,
                "Voice transition disagrees with stored presence, overwriting"
            );
        }

        let name = self.publisher.member(guild_id, &event.member);

        match transition {
            Transition::Join { channel } => {
                info!(
                    "[JOIN] {} (uid={}) joined #{} | guild={} (gid={})",
                    name,
                    user_id,
                    self.channel_name(event, channel),
                    self.guild_name(event),
                    guild_id
                );
            }
            Transition::Leave { channel } => {
                info!(
                    "[LEAVE] {} (uid={}) left #{} | guild={} (gid={})",
                    name,
                    user_id,
                    self.channel_name(event, channel),
                    self.guild_name(event),
                    guild_id
                );
            }
            Transition::Move { from, to } => {
                debug!(
                    "[MOVE] {} (uid={}) #{} -> #{} | gid={}",
                    name,
                    user_id,
                    self.channel_name(event, from),
                    self.channel_name(event, to),
                    guild_id
                );
            }
            Transition::Unchanged => {}
        }

        for channel in touched_channels(&transition, &change) {
            self.publisher.channel_gauges(self.store, guild_id, channel);
        }

        transition
    }

    fn channel_name(&self, event: &VoiceTransition, channel: ChannelId) -> String {
        self.publisher
            .directory
            .channel_labels(event.guild_id, channel)
            .channel_name
    }

    fn guild_name(&self, event: &VoiceTransition) -> String {
        self.publisher.directory.guild_labels(event.guild_id).guild_name
    }
}

/// Whether the store held what the notification claimed as `before`.
fn matches_expectation(transition: &Transition, change: &PresenceChange) -> bool {
    match transition {
        Transition::Join { .. } => change.previous.is_none(),
        Transition::Leave { channel } => change.previous == Some(*channel),
        Transition::Move { from, .. } => change.previous == Some(*from),
        Transition::Unchanged => true,
    }
}

/// Channels named by the notification plus any stale channel the store
/// dropped, without repeats.
fn touched_channels(transition: &Transition, change: &PresenceChange) -> Vec<ChannelId> {
    let named = match *transition {
        Transition::Join { channel } | Transition::Leave { channel } => vec![channel],
        Transition::Move { from, to } => vec![from, to],
        Transition::Unchanged => Vec::new(),
    };

    let mut channels: Vec<ChannelId> = Vec::with_capacity(3);
    for channel in named.into_iter().chain(change.previous) {
        if !channels.contains(&channel) {
            channels.push(channel);
        }
    }
    channels
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ChannelId = ChannelId::new(1);
    const B: ChannelId = ChannelId::new(2);
    const C: ChannelId = ChannelId::new(3);

    #[test]
    fn test_touched_channels_include_stale_entry() {
        let change = PresenceChange {
            previous: Some(C),
            current: Some(A),
        };
        let touched = touched_channels(&Transition::Join { channel: A }, &change);
        assert_eq!(touched, vec![A, C]);
    }

    #[test]
    fn test_touched_channels_move_without_repeats() {
        let change = PresenceChange {
            previous: Some(A),
            current: Some(B),
        };
        let touched = touched_channels(&Transition::Move { from: A, to: B }, &change);
        assert_eq!(touched, vec![A, B]);
    }

    #[test]
    fn test_expectation_checks() {
        let clean = PresenceChange {
            previous: None,
            current: Some(A),
        };
        assert!(matches_expectation(&Transition::Join { channel: A }, &clean));

        let missed = PresenceChange {
            previous: None,
            current: None,
        };
        assert!(!matches_expectation(&Transition::Leave { channel: A }, &missed));
    }
}
