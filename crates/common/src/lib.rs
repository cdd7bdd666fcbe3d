//! Shared identifier types, error definitions, and helpers used across all
//! rollcall crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, Result},
    types::{ChannelId, MemberId, MessageHandle},
};
