mod config_commands;
mod run_commands;

use std::path::{Path, PathBuf};

use {
    clap::{Parser, Subcommand},
    rollcall_config::{RollcallConfig, apply_env_overrides, discover_and_load},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "rollcall",
    about = "Live presence roster for Slack channels",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (overrides discovery of ./rollcall.toml and ~/.config/rollcall/).
    #[arg(long, global = true, env = "ROLLCALL_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Slack and serve roster commands (default).
    Run,
    /// Validate the config file.
    Check {
        /// Also show informational diagnostics.
        #[arg(long)]
        verbose: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the explicit config file, or discover one, then apply token
/// overrides from the environment.
fn load_config(path: Option<&Path>) -> anyhow::Result<RollcallConfig> {
    let config = match path {
        Some(path) => rollcall_config::load_config(path)?,
        None => discover_and_load(),
    };
    Ok(apply_env_overrides(config))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "rollcall starting");

    match cli.command {
        None | Some(Commands::Run) => {
            let config = load_config(cli.config.as_deref())?;
            run_commands::run(config).await
        },
        Some(Commands::Check { verbose }) => config_commands::check(cli.config.as_deref(), verbose),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, clap::CommandFactory, std::io::Write};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_is_the_default_command() {
        let cli = Cli::try_parse_from(["rollcall"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, "info");

        let cli = Cli::try_parse_from(["rollcall", "run", "--json-logs"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Run)));
        assert!(cli.json_logs);
    }

    #[test]
    fn check_accepts_global_flags() {
        let cli = Cli::try_parse_from([
            "rollcall",
            "check",
            "--verbose",
            "--config",
            "/tmp/rollcall.toml",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Check { verbose: true })));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/rollcall.toml")));
    }

    #[test]
    fn explicit_config_file_is_loaded() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[roster]\nthrottle_ms = 2500").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.roster.throttle_ms, 2500);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/rollcall.toml"))).is_err());
    }
}
