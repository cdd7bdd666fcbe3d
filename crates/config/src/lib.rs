//! Configuration loading, validation and env substitution.
//!
//! Config files: `rollcall.toml`, `rollcall.yaml` or `rollcall.json`,
//! searched in `./` then `~/.config/rollcall/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{MetricsConfig, RenderMode, RollcallConfig, RosterConfig, SlackConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate, validate_config},
};
