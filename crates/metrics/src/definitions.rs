//! Metric name and label definitions.
//!
//! Centralizing the names keeps dashboards and the instrumented crates in
//! agreement.

/// Roster engine metrics
pub mod roster {
    /// Total number of refresh executions started
    pub const REFRESHES_TOTAL: &str = "rollcall_refreshes_total";
    /// Total number of refreshes that failed
    pub const REFRESH_ERRORS_TOTAL: &str = "rollcall_refresh_errors_total";
    /// Triggers absorbed by an already pending or running refresh
    pub const REFRESHES_COALESCED_TOTAL: &str = "rollcall_refreshes_coalesced_total";
    /// Duration of one refresh (fetch, render, publish) in seconds
    pub const REFRESH_DURATION_SECONDS: &str = "rollcall_refresh_duration_seconds";
    /// Number of channels currently monitored
    pub const MONITORED_CHANNELS: &str = "rollcall_monitored_channels";
    /// Roster messages created (initial publish or republish)
    pub const MESSAGES_POSTED_TOTAL: &str = "rollcall_messages_posted_total";
    /// Member lookups that failed and were isolated
    pub const MEMBER_LOOKUP_FAILURES_TOTAL: &str = "rollcall_member_lookup_failures_total";
    /// Channels stopped by the inactivity timer
    pub const EXPIRATIONS_TOTAL: &str = "rollcall_expirations_total";
    /// Failure alerts raised for channels stuck failing
    pub const FAILURE_ALERTS_TOTAL: &str = "rollcall_failure_alerts_total";
}

/// Slack transport metrics
pub mod slack {
    /// Total Web API calls, labelled by `method`
    pub const API_CALLS_TOTAL: &str = "rollcall_slack_api_calls_total";
    /// Web API calls that returned `ok: false` or failed in transit
    pub const API_ERRORS_TOTAL: &str = "rollcall_slack_api_errors_total";
    /// Socket Mode envelopes received, labelled by `type`
    pub const ENVELOPES_TOTAL: &str = "rollcall_slack_envelopes_total";
}

/// Common label keys
pub mod labels {
    pub const METHOD: &str = "method";
    pub const ENVELOPE_TYPE: &str = "type";
    pub const REASON: &str = "reason";
}

/// Standard histogram buckets
pub mod buckets {
    /// Refresh duration buckets (in seconds), 10ms to 30s
    pub const REFRESH_DURATION: &[f64] = &[
        0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
    ];
}
