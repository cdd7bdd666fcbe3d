//! Metrics recorder initialization and configuration.

use {anyhow::Result, tracing::info};

/// Configuration for the metrics system.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    /// Whether metrics collection is enabled
    pub enabled: bool,
    /// Address the Prometheus scrape endpoint listens on
    pub listen: Option<std::net::SocketAddr>,
    /// Global labels to add to all metrics
    pub global_labels: Vec<(String, String)>,
}

/// Initialize the metrics system.
///
/// Call once at startup from inside the tokio runtime. With the `prometheus`
/// feature an HTTP scrape endpoint is spawned on `config.listen`; without it
/// the facade stays a no-op.
///
/// # Errors
///
/// Returns an error if the exporter fails to install.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<()> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(());
    }

    #[cfg(feature = "prometheus")]
    {
        install_prometheus(config)?;
        info!("prometheus metrics exporter initialized");
        Ok(())
    }

    #[cfg(not(feature = "prometheus"))]
    {
        let _ = config;
        info!("metrics feature not enabled at compile time");
        Ok(())
    }
}

#[cfg(feature = "prometheus")]
fn install_prometheus(config: MetricsRecorderConfig) -> Result<()> {
    use {
        crate::{buckets, roster},
        metrics_exporter_prometheus::{Matcher, PrometheusBuilder},
    };

    let mut builder = PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(roster::REFRESH_DURATION_SECONDS.to_string()),
        buckets::REFRESH_DURATION,
    )?;

    if let Some(addr) = config.listen {
        builder = builder.with_http_listener(addr);
    }

    for (key, value) in config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    builder.install()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_is_a_noop() {
        let config = MetricsRecorderConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_metrics(config).is_ok());
    }
}
