use std::time::Duration;

use {
    rollcall_common::ChannelId,
    rollcall_config::RosterConfig,
    serde::Serialize,
};

use crate::{expiry::ExpiryPolicy, render::RenderOptions};

/// Engine tuning, usually built from [`RosterConfig`].
#[derive(Debug, Clone)]
pub struct RosterSettings {
    pub render: RenderOptions,
    /// Minimum spacing between two refreshes of one channel.
    pub throttle: Duration,
    /// Periodic refresh of every monitored channel.
    pub tick_interval: Option<Duration>,
    pub expiry: ExpiryPolicy,
    /// Recent messages scanned when purging stale bot messages.
    pub history_limit: usize,
    /// Consecutive failed refreshes before an alert is raised.
    pub failure_alert_threshold: u32,
    /// Delete every live roster message on shutdown.
    pub teardown_on_shutdown: bool,
}

impl Default for RosterSettings {
    fn default() -> Self {
        Self::from(&RosterConfig::default())
    }
}

impl From<&RosterConfig> for RosterSettings {
    fn from(config: &RosterConfig) -> Self {
        Self {
            render: RenderOptions::from(config),
            throttle: config.throttle(),
            tick_interval: config.tick_interval(),
            expiry: ExpiryPolicy::from(config),
            history_limit: config.history_limit,
            failure_alert_threshold: config.failure_alert_threshold.max(1),
            teardown_on_shutdown: config.teardown_on_shutdown,
        }
    }
}

/// Result of [`crate::RosterService::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The channel was not monitored before.
    Started,
    /// Already monitored; expiry re-armed and an immediate refresh requested.
    Renewed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `off` command.
    Command,
    /// Close button on the roster message.
    Closed,
    /// Inactivity window elapsed.
    Expired,
    /// Process shutdown.
    Shutdown,
}

/// Notification about roster changes, delivered to the optional notify
/// callback of [`crate::RosterService`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RosterNotification {
    Started {
        channel_id: ChannelId,
    },
    Stopped {
        channel_id: ChannelId,
        reason: StopReason,
    },
    /// The channel has failed `failures` refreshes in a row. Raised once per
    /// failure streak.
    RefreshFailing {
        channel_id: ChannelId,
        failures: u32,
        error: String,
    },
    /// A refresh succeeded after an alert was raised.
    Recovered {
        channel_id: ChannelId,
    },
}
