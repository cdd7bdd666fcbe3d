//! Live "who is here" roster messages.
//!
//! [`RosterService`] tracks the monitored channels and keeps exactly one
//! bot-authored roster message per channel in sync with member presence.
//! Refresh triggers are throttled and coalesced per channel, and monitoring
//! can expire after a period without start commands.

pub mod command;
pub mod error;
pub mod expiry;
pub mod fetcher;
pub mod lifecycle;
pub mod registry;
pub mod render;
pub mod scheduler;
pub mod service;
pub mod types;

pub use {
    command::RosterCommand,
    error::{Error, Result},
    expiry::ExpiryPolicy,
    fetcher::MemberSnapshot,
    render::{RenderOptions, Renderer},
    service::{NotifyFn, RosterEventSink, RosterService},
    types::{RosterNotification, RosterSettings, StartOutcome, StopReason},
};
