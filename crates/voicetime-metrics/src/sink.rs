//! Prometheus-backed metrics sink.

use dashmap::DashMap;
use prometheus::{CounterVec, Encoder, IntGaugeVec, Opts, Registry, TextEncoder};

use voicetime_core::error::AppError;
use voicetime_core::result::AppResult;
use voicetime_core::traits::{ChannelLabels, GuildLabels, MetricsSink};
use voicetime_core::types::{ChannelId, GuildId, UserId, UserIdentity};

/// Registry plus every series the tracker writes.
///
/// Info records are gauges fixed at 1 whose labels carry the names. When a
/// name changes the previous series is removed so only the latest one is
/// exported. Occupancy gauges follow channel renames the same way; counters
/// keep their old series.
pub struct PrometheusSink {
    registry: Registry,
    user_seconds: CounterVec,
    channel_seconds: CounterVec,
    guild_seconds: CounterVec,
    channel_active: IntGaugeVec,
    channel_active_users: IntGaugeVec,
    user_info: IntGaugeVec,
    user_display: IntGaugeVec,
    /// User ID → labels of the exported info series
    user_info_labels: DashMap<UserId, UserIdentity>,
    /// (Guild ID, User ID) → exported display name
    user_display_labels: DashMap<(GuildId, UserId), String>,
    /// (Guild ID, Channel ID) → channel name on the occupancy gauges
    channel_name_labels: DashMap<(GuildId, ChannelId), String>,
}

impl std::fmt::Debug for PrometheusSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusSink").finish()
    }
}

impl PrometheusSink {
    /// Create a sink with a fresh registry.
    pub fn new() -> AppResult<Self> {
        Self::with_registry(Registry::new())
    }

    /// Create a sink registering its series in `registry`.
    pub fn with_registry(registry: Registry) -> AppResult<Self> {
        let user_seconds = CounterVec::new(
            Opts::new(
                "user_presence_seconds_total",
                "Cumulative seconds a user spent in any voice channel",
            ),
            &["guild", "user"],
        )?;
        let channel_seconds = CounterVec::new(
            Opts::new(
                "channel_active_seconds_total",
                "Cumulative seconds a voice channel had at least one user (union time)",
            ),
            &["guild", "channel", "channel_name"],
        )?;
        let guild_seconds = CounterVec::new(
            Opts::new(
                "guild_active_seconds_total",
                "Cumulative seconds a guild had at least one user in any voice channel (union time)",
            ),
            &["guild", "guild_name"],
        )?;
        let channel_active = IntGaugeVec::new(
            Opts::new("channel_active", "1 if a voice channel has at least one user, else 0"),
            &["guild", "channel", "channel_name"],
        )?;
        let channel_active_users = IntGaugeVec::new(
            Opts::new("channel_active_users", "Current number of users in the voice channel"),
            &["guild", "channel", "channel_name"],
        )?;
        let user_info = IntGaugeVec::new(
            Opts::new("user_info", "Latest known username and global name for a user"),
            &["user", "username", "global_name"],
        )?;
        let user_display = IntGaugeVec::new(
            Opts::new(
                "user_display_info",
                "Latest known display name (nickname aware) for a user in a guild",
            ),
            &["guild", "user", "display_name"],
        )?;

        registry.register(Box::new(user_seconds.clone()))?;
        registry.register(Box::new(channel_seconds.clone()))?;
        registry.register(Box::new(guild_seconds.clone()))?;
        registry.register(Box::new(channel_active.clone()))?;
        registry.register(Box::new(channel_active_users.clone()))?;
        registry.register(Box::new(user_info.clone()))?;
        registry.register(Box::new(user_display.clone()))?;

        Ok(Self {
            registry,
            user_seconds,
            channel_seconds,
            guild_seconds,
            channel_active,
            channel_active_users,
            user_info,
            user_display,
            user_info_labels: DashMap::new(),
            user_display_labels: DashMap::new(),
            channel_name_labels: DashMap::new(),
        })
    }

    /// Render all series in the Prometheus text exposition format.
    pub fn render(&self) -> AppResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| AppError::metrics(format!("Exposition is not UTF-8: {e}")))
    }

    /// Current value of a user's presence counter.
    pub fn user_seconds(&self, guild_id: GuildId, user_id: UserId) -> f64 {
        let (guild, user) = (guild_id.to_string(), user_id.to_string());
        self.user_seconds.with_label_values(&[&guild, &user]).get()
    }

    /// Current value of a channel's active counter.
    pub fn channel_seconds(&self, labels: &ChannelLabels) -> f64 {
        self.channel_seconds
            .with_label_values(&channel_values(labels).as_refs())
            .get()
    }

    /// Current value of a guild's active counter.
    pub fn guild_seconds(&self, labels: &GuildLabels) -> f64 {
        let guild = labels.guild_id.to_string();
        self.guild_seconds
            .with_label_values(&[&guild, &labels.guild_name])
            .get()
    }

    /// Current `(channel_active, channel_active_users)` of a channel.
    pub fn channel_occupancy(&self, labels: &ChannelLabels) -> (i64, i64) {
        let values = channel_values(labels);
        let refs = values.as_refs();
        (
            self.channel_active.with_label_values(&refs).get(),
            self.channel_active_users.with_label_values(&refs).get(),
        )
    }

    /// Names currently exported for a user.
    pub fn user_info(&self, user_id: UserId) -> Option<UserIdentity> {
        self.user_info_labels
            .get(&user_id)
            .map(|r| r.value().clone())
    }

    /// Display name currently exported for a member.
    pub fn member_display(&self, guild_id: GuildId, user_id: UserId) -> Option<String> {
        self.user_display_labels
            .get(&(guild_id, user_id))
            .map(|r| r.value().clone())
    }
}

impl MetricsSink for PrometheusSink {
    fn add_user_seconds(&self, guild_id: GuildId, user_id: UserId, seconds: f64) {
        if seconds.is_nan() || seconds <= 0.0 {
            return;
        }
        let (guild, user) = (guild_id.to_string(), user_id.to_string());
        self.user_seconds
            .with_label_values(&[&guild, &user])
            .inc_by(seconds);
    }

    fn add_channel_seconds(&self, labels: &ChannelLabels, seconds: f64) {
        if seconds.is_nan() || seconds <= 0.0 {
            return;
        }
        self.channel_seconds
            .with_label_values(&channel_values(labels).as_refs())
            .inc_by(seconds);
    }

    fn add_guild_seconds(&self, labels: &GuildLabels, seconds: f64) {
        if seconds.is_nan() || seconds <= 0.0 {
            return;
        }
        let guild = labels.guild_id.to_string();
        self.guild_seconds
            .with_label_values(&[&guild, &labels.guild_name])
            .inc_by(seconds);
    }

    fn set_channel_occupancy(&self, labels: &ChannelLabels, users: usize) {
        let values = channel_values(labels);
        let refs = values.as_refs();

        if let Some(previous) = self.channel_name_labels.insert(
            (labels.guild_id, labels.channel_id),
            labels.channel_name.clone(),
        ) {
            if previous != labels.channel_name {
                let old = [refs[0], refs[1], previous.as_str()];
                let _ = self.channel_active.remove_label_values(&old);
                let _ = self.channel_active_users.remove_label_values(&old);
            }
        }

        let users = i64::try_from(users).unwrap_or(i64::MAX);
        self.channel_active_users.with_label_values(&refs).set(users);
        self.channel_active
            .with_label_values(&refs)
            .set(i64::from(users > 0));
    }

    fn set_user_info(&self, user_id: UserId, identity: &UserIdentity) {
        let user = user_id.to_string();
        let global = identity.global_name.clone().unwrap_or_default();

        if let Some(previous) = self.user_info_labels.insert(user_id, identity.clone()) {
            if previous != *identity {
                let old_global = previous.global_name.unwrap_or_default();
                let _ = self
                    .user_info
                    .remove_label_values(&[&user, &previous.username, &old_global]);
            }
        }

        self.user_info
            .with_label_values(&[&user, &identity.username, &global])
            .set(1);
    }

    fn set_member_display(&self, guild_id: GuildId, user_id: UserId, display_name: &str) {
        let (guild, user) = (guild_id.to_string(), user_id.to_string());

        if let Some(previous) = self
            .user_display_labels
            .insert((guild_id, user_id), display_name.to_string())
        {
            if previous != display_name {
                let _ = self
                    .user_display
                    .remove_label_values(&[&guild, &user, &previous]);
            }
        }

        self.user_display
            .with_label_values(&[&guild, &user, display_name])
            .set(1);
    }
}

/// Owned label values for channel-scoped series.
struct ChannelValues([String; 3]);

impl ChannelValues {
    fn as_refs(&self) -> [&str; 3] {
        [&self.0[0], &self.0[1], &self.0[2]]
    }
}

fn channel_values(labels: &ChannelLabels) -> ChannelValues {
    ChannelValues([
        labels.guild_id.to_string(),
        labels.channel_id.to_string(),
        labels.channel_name.clone(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> ChannelLabels {
        ChannelLabels {
            guild_id: GuildId::new(1),
            channel_id: ChannelId::new(2),
            channel_name: "General".into(),
        }
    }

    #[test]
    fn test_counters_accumulate() {
        let sink = PrometheusSink::new().expect("sink");
        sink.add_user_seconds(GuildId::new(1), UserId::new(3), 5.0);
        sink.add_user_seconds(GuildId::new(1), UserId::new(3), 2.5);
        assert_eq!(sink.user_seconds(GuildId::new(1), UserId::new(3)), 7.5);

        sink.add_channel_seconds(&labels(), 4.0);
        assert_eq!(sink.channel_seconds(&labels()), 4.0);
    }

    #[test]
    fn test_non_positive_increments_ignored() {
        let sink = PrometheusSink::new().expect("sink");
        sink.add_user_seconds(GuildId::new(1), UserId::new(3), 0.0);
        sink.add_user_seconds(GuildId::new(1), UserId::new(3), -1.0);
        sink.add_user_seconds(GuildId::new(1), UserId::new(3), f64::NAN);
        assert_eq!(sink.user_seconds(GuildId::new(1), UserId::new(3)), 0.0);
    }

    #[test]
    fn test_occupancy_gauges() {
        let sink = PrometheusSink::new().expect("sink");
        sink.set_channel_occupancy(&labels(), 3);
        assert_eq!(sink.channel_occupancy(&labels()), (1, 3));
        sink.set_channel_occupancy(&labels(), 0);
        assert_eq!(sink.channel_occupancy(&labels()), (0, 0));
    }

    #[test]
    fn test_renamed_user_replaces_info_series() {
        let sink = PrometheusSink::new().expect("sink");
        let user = UserId::new(9);
        sink.set_user_info(
            user,
            &UserIdentity {
                username: "old".into(),
                global_name: None,
            },
        );
        sink.set_user_info(
            user,
            &UserIdentity {
                username: "new".into(),
                global_name: Some("New".into()),
            },
        );

        let text = sink.render().expect("render");
        assert!(text.contains("username=\"new\""));
        assert!(!text.contains("username=\"old\""));
        assert_eq!(sink.user_info(user).map(|i| i.username), Some("new".into()));
    }

    #[test]
    fn test_display_name_replaced_per_guild() {
        let sink = PrometheusSink::new().expect("sink");
        sink.set_member_display(GuildId::new(1), UserId::new(2), "first");
        sink.set_member_display(GuildId::new(1), UserId::new(2), "second");
        let text = sink.render().expect("render");
        assert!(text.contains("display_name=\"second\""));
        assert!(!text.contains("display_name=\"first\""));
    }

    #[test]
    fn test_render_lists_metric_names() {
        let sink = PrometheusSink::new().expect("sink");
        sink.add_guild_seconds(
            &GuildLabels {
                guild_id: GuildId::new(1),
                guild_name: "Guild".into(),
            },
            1.0,
        );
        let text = sink.render().expect("render");
        assert!(text.contains("guild_active_seconds_total{guild=\"1\",guild_name=\"Guild\"}"));
    }

    #[test]
    fn test_channel_rename_moves_occupancy_gauges() {
        let sink = PrometheusSink::new().expect("sink");
        let before = labels();
        let after = ChannelLabels {
            channel_name: "Renamed".into(),
            ..labels()
        };

        sink.set_channel_occupancy(&before, 2);
        sink.set_channel_occupancy(&after, 2);

        let text = sink.render().expect("render");
        let stale = format!("channel_name=\"{}\"", before.channel_name);
        assert!(!text.lines().any(|line| {
            (line.starts_with("channel_active{") || line.starts_with("channel_active_users{"))
                && line.contains(&stale)
        }));
        assert_eq!(sink.channel_occupancy(&after), (1, 2));
    }
}
