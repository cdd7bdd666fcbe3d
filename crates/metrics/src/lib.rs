//! Metrics collection and export for rollcall.
//!
//! Instrumented crates record through the `metrics` facade macros re-exported
//! here, using the names in [`roster`] and [`slack`]. Nothing is recorded
//! until [`init_metrics`] installs a recorder.
//!
//! # Features
//!
//! - `prometheus`: expose a Prometheus scrape endpoint on the configured
//!   listen address.

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
