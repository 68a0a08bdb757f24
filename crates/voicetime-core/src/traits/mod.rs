//! Collaborator traits defined in `voicetime-core` and implemented by
//! other crates.

pub mod directory;
pub mod metrics;

pub use directory::{ChannelLabels, GuildLabels, NameDirectory, placeholder_label};
pub use metrics::MetricsSink;
