#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Platform(#[from] rollcall_channels::Error),

    #[error("roster service is shutting down")]
    ShuttingDown,
}

impl Error {
    /// Short machine-readable reason, used as a metrics label.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        use rollcall_channels::Error as P;
        match self {
            Self::Platform(P::ChannelUnavailable { .. }) => "channel_unavailable",
            Self::Platform(P::MemberLookupFailed { .. }) => "member_lookup_failed",
            Self::Platform(P::MessageGone { .. }) => "message_gone",
            Self::Platform(P::PlatformWriteFailed { .. }) => "write_failed",
            Self::Platform(_) => "platform",
            Self::ShuttingDown => "shutting_down",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
