use {
    rollcall_common::{ChannelId, MemberId, MessageHandle},
    std::error::Error as StdError,
};

/// Crate-wide result type for platform operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed platform errors shared by every [`crate::ChatPlatform`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Listing the members of a channel failed (bad id, bot not a member,
    /// missing permission).
    #[error("channel {channel_id} unavailable: {reason}")]
    ChannelUnavailable {
        channel_id: ChannelId,
        reason: String,
    },

    /// Resolving a single member's attributes failed.
    #[error("lookup of member {member_id} failed: {reason}")]
    MemberLookupFailed { member_id: MemberId, reason: String },

    /// The referenced message no longer exists on the platform.
    #[error("message {handle} in channel {channel_id} is gone")]
    MessageGone {
        channel_id: ChannelId,
        handle: MessageHandle,
    },

    /// A create/update/delete call was rejected or did not complete.
    #[error("{operation} failed in channel {channel_id}: {reason}")]
    PlatformWriteFailed {
        operation: &'static str,
        channel_id: ChannelId,
        reason: String,
    },

    /// Input payload or parameter is invalid.
    #[error("invalid platform input: {message}")]
    InvalidInput { message: String },

    /// Wrapped source error from an external dependency.
    #[error("platform operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// JSON (de)serialization failed.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn channel_unavailable(channel_id: &ChannelId, reason: impl std::fmt::Display) -> Self {
        Self::ChannelUnavailable {
            channel_id: channel_id.clone(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn member_lookup_failed(member_id: &MemberId, reason: impl std::fmt::Display) -> Self {
        Self::MemberLookupFailed {
            member_id: member_id.clone(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn message_gone(channel_id: &ChannelId, handle: &MessageHandle) -> Self {
        Self::MessageGone {
            channel_id: channel_id.clone(),
            handle: handle.clone(),
        }
    }

    #[must_use]
    pub fn write_failed(
        operation: &'static str,
        channel_id: &ChannelId,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::PlatformWriteFailed {
            operation,
            channel_id: channel_id.clone(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether the error means the target message has to be re-created.
    #[must_use]
    pub fn is_message_gone(&self) -> bool {
        matches!(self, Self::MessageGone { .. })
    }
}
