//! Configuration validation.
//!
//! Detects unknown/misspelled fields, type errors and settings the roster
//! engine cannot run with (missing tokens, zero throttle).

use std::{collections::HashMap, path::Path};

use secrecy::ExposeSecret;

use crate::{
    loader::{APP_TOKEN_ENV, BOT_TOKEN_ENV, apply_env_overrides_with},
    schema::RollcallConfig,
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "credentials",
    /// "timing", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "roster.throttle_ms"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

/// Mirrors every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    let fields = |names: &[&'static str]| Struct(names.iter().map(|n| (*n, Leaf)).collect());

    Struct(HashMap::from([
        (
            "slack",
            fields(&["bot_token", "app_token", "api_base_url", "commands"]),
        ),
        (
            "roster",
            fields(&[
                "render_mode",
                "title",
                "placeholder",
                "close_button",
                "throttle_ms",
                "tick_interval_ms",
                "expiry_secs",
                "history_limit",
                "failure_alert_threshold",
                "teardown_on_shutdown",
            ]),
        ),
        ("metrics", fields(&["enabled", "listen"])),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
///
/// Token overrides from the environment are taken into account, so a file
/// without tokens is valid when `SLACK_BOT_TOKEN` and `SLACK_APP_TOKEN` are
/// set.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let lookup = |name: &str| std::env::var(name).ok();

    let Some(ref actual_path) = config_path else {
        let mut diagnostics = vec![Diagnostic::new(
            Severity::Info,
            "file-ref",
            "",
            "no config file found; using defaults",
        )];
        let config = apply_env_overrides_with(RollcallConfig::default(), lookup);
        check_semantics(&config, &mut diagnostics);
        return ValidationResult {
            diagnostics,
            config_path: None,
        };
    };

    if actual_path.extension().and_then(|e| e.to_str()) != Some("toml") {
        // Only TOML gets field-level checks; other formats are type-checked
        // by loading them.
        let mut diagnostics = Vec::new();
        match crate::loader::load_config(actual_path) {
            Ok(config) => {
                check_semantics(&apply_env_overrides_with(config, lookup), &mut diagnostics);
            },
            Err(e) => diagnostics.push(Diagnostic::new(
                Severity::Error,
                "type-error",
                "",
                e.to_string(),
            )),
        }
        return ValidationResult {
            diagnostics,
            config_path: Some(actual_path.clone()),
        };
    }

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let content = crate::env_subst::substitute_env(&content);
            let mut result = validate_toml_str_with(&content, lookup);
            result.config_path = Some(actual_path.clone());
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate a TOML string against the process environment.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    validate_toml_str_with(toml_str, |name| std::env::var(name).ok())
}

/// Semantic checks on an already loaded config.
#[must_use]
pub fn validate_config(config: &RollcallConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    check_semantics(config, &mut diagnostics);
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn validate_toml_str_with(
    toml_str: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("TOML syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    let schema = build_schema_map();
    check_unknown_fields(&toml_value, &schema, "", &mut diagnostics);

    match toml::from_str::<RollcallConfig>(toml_str) {
        Ok(config) => check_semantics(&apply_env_overrides_with(config, lookup), &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (toml::Value::Table(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };
    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }
        let level = if prefix.is_empty() {
            "at top level "
        } else {
            ""
        };
        let msg = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
            None => format!("unknown field {level}"),
        };
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "unknown-field",
            path,
            msg.trim(),
        ));
    }
}

fn check_semantics(config: &RollcallConfig, diagnostics: &mut Vec<Diagnostic>) {
    check_token(
        config.slack.bot_token.expose_secret(),
        "slack.bot_token",
        "xoxb-",
        BOT_TOKEN_ENV,
        diagnostics,
    );
    check_token(
        config.slack.app_token.expose_secret(),
        "slack.app_token",
        "xapp-",
        APP_TOKEN_ENV,
        diagnostics,
    );

    if config.slack.commands.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "credentials",
            "slack.commands",
            "no slash commands configured; rosters can only be started programmatically",
        ));
    }
    for (i, command) in config.slack.commands.iter().enumerate() {
        if !command.starts_with('/') {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                format!("slack.commands[{i}]"),
                format!("slash command \"{command}\" must start with '/'"),
            ));
        }
    }

    let roster = &config.roster;
    if roster.throttle_ms == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "timing",
            "roster.throttle_ms",
            "throttle window must be greater than zero",
        ));
    }
    if roster.tick_interval_ms > 0 && roster.tick_interval_ms < roster.throttle_ms {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "timing",
            "roster.tick_interval_ms",
            "tick interval is shorter than the throttle window; ticks will coalesce",
        ));
    }
    if roster.history_limit == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "timing",
            "roster.history_limit",
            "history_limit = 0 disables cleanup of stale roster messages",
        ));
    }
    if roster.failure_alert_threshold == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "timing",
            "roster.failure_alert_threshold",
            "failure alert threshold must be at least 1",
        ));
    }

    if config.metrics.enabled
        && config
            .metrics
            .listen
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "syntax",
            "metrics.listen",
            format!("\"{}\" is not a socket address", config.metrics.listen),
        ));
    }
}

fn check_token(
    token: &str,
    path: &'static str,
    prefix: &str,
    env_var: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if token.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "credentials",
            path,
            format!("missing token; set it in the config file or via {env_var}"),
        ));
    } else if !token.starts_with(prefix) {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "credentials",
            path,
            format!("token does not look like a {prefix}... token"),
        ));
    }
}
