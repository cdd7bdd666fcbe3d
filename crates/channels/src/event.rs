use {
    async_trait::async_trait,
    rollcall_common::{ChannelId, MemberId, MessageHandle},
    serde::Serialize,
};

/// Operator and platform input delivered by a transport listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A roster slash command (`/tally`, `/bueller`) with its argument text.
    Command {
        command: String,
        channel_id: ChannelId,
        user_id: Option<MemberId>,
        text: String,
    },
    /// The close button on a roster message was pressed.
    Close {
        channel_id: ChannelId,
        message: Option<MessageHandle>,
        user_id: Option<MemberId>,
    },
    /// Some member's presence changed. The platform does not tell which
    /// channels are affected.
    PresenceChanged { user_id: Option<MemberId> },
}

impl InboundEvent {
    /// Short label used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::Close { .. } => "close",
            Self::PresenceChanged { .. } => "presence_changed",
        }
    }
}

/// Receiver of inbound events. The roster service provides the concrete
/// implementation; transports only call it.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Handle an event. For commands the returned text is shown to the
    /// invoking user as the command acknowledgement.
    async fn dispatch(&self, event: InboundEvent) -> Option<String>;
}
