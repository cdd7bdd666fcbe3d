use std::sync::Arc;

use {
    anyhow::{Context, Result},
    rollcall_channels::ChatPlatform,
    rollcall_config::{RollcallConfig, Severity, validate_config},
    rollcall_metrics::{MetricsRecorderConfig, init_metrics},
    rollcall_roster::{RosterNotification, RosterService, RosterSettings},
    rollcall_slack::{SlackApi, SlackPlatform, SocketModeListener},
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

/// `rollcall run`: connect to Slack and serve roster commands until Ctrl-C.
pub async fn run(config: RollcallConfig) -> Result<()> {
    let validation = validate_config(&config);
    for d in &validation.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => info!(path = %d.path, "{}", d.message),
        }
    }
    if validation.has_errors() {
        anyhow::bail!(
            "configuration has {} error(s); run `rollcall check` for details",
            validation.count(Severity::Error)
        );
    }

    init_metrics(metrics_config(&config)?)?;

    let api = Arc::new(SlackApi::new(&config.slack)?);
    let platform = Arc::new(SlackPlatform::new(Arc::clone(&api)));
    let identity = platform
        .bot_identity()
        .await
        .context("slack authentication failed")?;
    info!(
        bot_user = %identity.user_id,
        bot_id = ?identity.bot_id,
        "slack bot authenticated"
    );

    let roster = RosterService::with_notify(
        platform,
        RosterSettings::from(&config.roster),
        Arc::new(log_notification),
    );
    let ticker = roster.spawn_ticker();

    let cancel = CancellationToken::new();
    let listener = SocketModeListener::new(api, roster.event_sink(), config.slack.commands.clone())
        .spawn(cancel.clone());
    info!(commands = ?config.slack.commands, "rollcall running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("shutdown requested");

    cancel.cancel();
    let stopped = roster.shutdown().await;
    listener.await?;
    if let Some(ticker) = ticker {
        ticker.await?;
    }

    info!(channels = stopped, "rollcall stopped");
    Ok(())
}

fn metrics_config(config: &RollcallConfig) -> Result<MetricsRecorderConfig> {
    let listen = if config.metrics.enabled {
        Some(
            config
                .metrics
                .listen
                .parse()
                .with_context(|| format!("invalid metrics.listen {:?}", config.metrics.listen))?,
        )
    } else {
        None
    };
    Ok(MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        listen,
        global_labels: Vec::new(),
    })
}

fn log_notification(notification: RosterNotification) {
    match notification {
        RosterNotification::Started { channel_id } => {
            info!(channel_id = %channel_id, "roster started");
        },
        RosterNotification::Stopped { channel_id, reason } => {
            info!(channel_id = %channel_id, reason = ?reason, "roster stopped");
        },
        RosterNotification::RefreshFailing {
            channel_id,
            failures,
            error,
        } => {
            warn!(channel_id = %channel_id, failures, error = %error, "roster needs attention");
        },
        RosterNotification::Recovered { channel_id } => {
            info!(channel_id = %channel_id, "roster recovered");
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_listen_is_only_parsed_when_enabled() {
        let mut config = RollcallConfig::default();
        config.metrics.listen = "not an address".into();
        assert!(metrics_config(&config).unwrap().listen.is_none());

        config.metrics.enabled = true;
        assert!(metrics_config(&config).is_err());

        config.metrics.listen = "0.0.0.0:9464".into();
        let metrics = metrics_config(&config).unwrap();
        assert_eq!(metrics.listen.unwrap().port(), 9464);
    }

    #[tokio::test]
    async fn run_refuses_invalid_config() {
        let err = run(RollcallConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("rollcall check"));
    }
}
