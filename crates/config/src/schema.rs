/// Config schema types (slack credentials, roster engine tuning, metrics).
use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RollcallConfig {
    pub slack: SlackConfig,
    pub roster: RosterConfig,
    pub metrics: MetricsConfig,
}

/// Slack app credentials and command names.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Bot user OAuth token (`xoxb-...`).
    #[serde(serialize_with = "serialize_secret")]
    pub bot_token: Secret<String>,

    /// App-level token with `connections:write` for Socket Mode (`xapp-...`).
    #[serde(serialize_with = "serialize_secret")]
    pub app_token: Secret<String>,

    /// Base URL for the plain-HTTP `users.info` lookup. Overridden in tests.
    pub api_base_url: String,

    /// Slash commands that start/stop a roster.
    pub commands: Vec<String>,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("app_token", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("commands", &self.commands)
            .finish()
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: Secret::new(String::new()),
            app_token: Secret::new(String::new()),
            api_base_url: "https://slack.com/api".into(),
            commands: vec!["/tally".into(), "/bueller".into()],
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// How a roster is rendered into a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// One line of names, `Alice? Bob?`.
    #[default]
    Text,
    /// Header, one block per member and a close button.
    Blocks,
}

/// Roster engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub render_mode: RenderMode,
    /// Header shown in blocks mode.
    pub title: String,
    /// Shown when nobody is present.
    pub placeholder: String,
    /// Add a close button in blocks mode.
    pub close_button: bool,
    /// Minimum spacing between two refreshes of one channel.
    pub throttle_ms: u64,
    /// Periodic refresh of every monitored channel. 0 disables the tick.
    pub tick_interval_ms: u64,
    /// Inactivity window after which monitoring stops. 0 disables expiry.
    pub expiry_secs: u64,
    /// How many recent messages are scanned for stale bot messages.
    pub history_limit: usize,
    /// Consecutive failed refreshes before the operator is alerted.
    pub failure_alert_threshold: u32,
    /// Delete every live roster message on graceful shutdown.
    pub teardown_on_shutdown: bool,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::Text,
            title: "Who's here".into(),
            placeholder: "Nobody here right now".into(),
            close_button: true,
            throttle_ms: 3_000,
            tick_interval_ms: 0,
            expiry_secs: 0,
            history_limit: 100,
            failure_alert_threshold: 5,
            teardown_on_shutdown: true,
        }
    }
}

impl RosterConfig {
    #[must_use]
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    #[must_use]
    pub fn tick_interval(&self) -> Option<Duration> {
        (self.tick_interval_ms > 0).then(|| Duration::from_millis(self.tick_interval_ms))
    }

    #[must_use]
    pub fn expiry_window(&self) -> Option<Duration> {
        (self.expiry_secs > 0).then(|| Duration::from_secs(self.expiry_secs))
    }
}

/// Metrics exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Prometheus scrape endpoint address.
    pub listen: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: "127.0.0.1:9464".into(),
        }
    }
}
