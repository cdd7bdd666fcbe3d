//! Chat platform contract.
//!
//! The roster engine talks to a chat platform only through the
//! [`ChatPlatform`] trait and receives operator input only through
//! [`EventSink`]. Concrete platforms (Slack) live in their own crates.

pub mod content;
pub mod error;
pub mod event;
pub mod memory;
pub mod platform;

pub use {
    content::{RosterBlock, RosterContent},
    error::{Error, Result},
    event::{EventSink, InboundEvent},
    platform::{BotIdentity, ChatPlatform, MemberInfo, PresenceState, RecentMessage},
};
