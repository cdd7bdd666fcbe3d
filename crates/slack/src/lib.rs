//! Slack transport for the roster engine, built on slack-morphism.
//!
//! [`SlackPlatform`] implements the outbound [`rollcall_channels::ChatPlatform`]
//! contract over the Web API. [`SocketModeListener`] feeds slash commands,
//! close-button presses and presence events into an
//! [`rollcall_channels::EventSink`].

pub mod api;
pub mod blocks;
pub mod error;
pub mod events;
pub mod platform;
pub mod profiles;
pub mod socket;

pub use {
    api::SlackApi,
    blocks::CLOSE_ACTION_ID,
    error::{Error, Result},
    platform::SlackPlatform,
    socket::SocketModeListener,
};
