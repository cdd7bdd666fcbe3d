use std::path::{Path, PathBuf};

use {
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::RollcallConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "rollcall.toml",
    "rollcall.yaml",
    "rollcall.yml",
    "rollcall.json",
];

/// Environment variables that override the Slack tokens from the file.
pub const BOT_TOKEN_ENV: &str = "SLACK_BOT_TOKEN";
pub const APP_TOKEN_ENV: &str = "SLACK_APP_TOKEN";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<RollcallConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./rollcall.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/rollcall/rollcall.{toml,yaml,yml,json}` (user-global)
///
/// Returns `RollcallConfig::default()` if no config file is found.
pub fn discover_and_load() -> RollcallConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    RollcallConfig::default()
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/rollcall/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "rollcall").map(|d| d.config_dir().to_path_buf())
}

/// Let `SLACK_BOT_TOKEN` / `SLACK_APP_TOKEN` replace the file's tokens.
pub fn apply_env_overrides(config: RollcallConfig) -> RollcallConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

pub(crate) fn apply_env_overrides_with(
    mut config: RollcallConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> RollcallConfig {
    if let Some(token) = lookup(BOT_TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
        if !config.slack.bot_token.expose_secret().is_empty() {
            debug!(var = BOT_TOKEN_ENV, "environment overrides configured bot token");
        }
        config.slack.bot_token = Secret::new(token.trim().to_string());
    }
    if let Some(token) = lookup(APP_TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
        if !config.slack.app_token.expose_secret().is_empty() {
            debug!(var = APP_TOKEN_ENV, "environment overrides configured app token");
        }
        config.slack.app_token = Secret::new(token.trim().to_string());
    }
    config
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<RollcallConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
