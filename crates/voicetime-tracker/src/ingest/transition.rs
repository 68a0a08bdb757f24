//! Classification of before/after voice states.

use serde::Serialize;

use voicetime_core::types::ChannelId;

/// What a single voice notification means for presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// Connected to a channel from nowhere.
    Join {
        /// Channel joined.
        channel: ChannelId,
    },
    /// Disconnected from a channel.
    Leave {
        /// Channel left.
        channel: ChannelId,
    },
    /// Switched from one channel to another.
    Move {
        /// Channel left.
        from: ChannelId,
        /// Channel joined.
        to: ChannelId,
    },
    /// Before and after are identical (mute, deafen, stream toggles, or a
    /// re-reported state). Discarded.
    Unchanged,
}

impl Transition {
    /// Classify a notification by its before and after channels.
    pub fn classify(before: Option<ChannelId>, after: Option<ChannelId>) -> Self {
        match (before, after) {
            (None, Some(channel)) => Self::Join { channel },
            (Some(channel), None) => Self::Leave { channel },
            (Some(from), Some(to)) if from != to => Self::Move { from, to },
            _ => Self::Unchanged,
        }
    }

    /// Short label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Move { .. } => "move",
            Self::Unchanged => "unchanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ChannelId = ChannelId::new(1);
    const B: ChannelId = ChannelId::new(2);

    #[test]
    fn test_classify() {
        assert_eq!(Transition::classify(None, Some(A)), Transition::Join { channel: A });
        assert_eq!(Transition::classify(Some(A), None), Transition::Leave { channel: A });
        assert_eq!(
            Transition::classify(Some(A), Some(B)),
            Transition::Move { from: A, to: B }
        );
    }

    #[test]
    fn test_equal_states_are_unchanged() {
        assert_eq!(Transition::classify(None, None), Transition::Unchanged);
        assert_eq!(Transition::classify(Some(A), Some(A)), Transition::Unchanged);
    }
}
