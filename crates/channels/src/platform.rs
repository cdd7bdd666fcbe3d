use {
    async_trait::async_trait,
    rollcall_common::{ChannelId, MemberId, MessageHandle},
    serde::{Deserialize, Serialize},
};

use crate::{Result, content::RosterContent};

/// Presence of a member as far as the roster is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    Available,
    /// Currently in a huddle (ephemeral voice/video session).
    InHuddle,
    /// Attributes could not be resolved.
    Unknown,
}

/// Identity and presence attributes of one channel member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub id: MemberId,
    /// Raw account handle.
    pub name: String,
    /// Preferred display name, empty when the member never set one.
    pub display_name: String,
    pub last_name: String,
    pub first_name: String,
    pub is_bot: bool,
    pub presence: PresenceState,
}

impl MemberInfo {
    /// Resolve the name shown in the roster: display name, then surname, then
    /// given name, then the raw handle.
    #[must_use]
    pub fn resolved_name(&self) -> &str {
        [
            self.display_name.as_str(),
            self.last_name.as_str(),
            self.first_name.as_str(),
        ]
        .into_iter()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(self.name.as_str())
    }
}

/// A recent channel message, as returned by history listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentMessage {
    pub handle: MessageHandle,
    /// User that authored the message, if any.
    pub author_id: Option<String>,
    /// Bot integration that authored the message, if any.
    pub bot_id: Option<String>,
}

/// How the platform identifies this process's own messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BotIdentity {
    pub user_id: String,
    pub bot_id: Option<String>,
}

impl BotIdentity {
    /// Whether `message` was authored by this bot.
    #[must_use]
    pub fn authored(&self, message: &RecentMessage) -> bool {
        let by_bot_id = match (&self.bot_id, &message.bot_id) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => false,
        };
        by_bot_id || message.author_id.as_deref() == Some(self.user_id.as_str())
    }
}

/// Chat platform operations consumed by the roster engine.
///
/// Every method is a suspension point; implementations map their transport
/// failures onto the typed [`crate::Error`] variants.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Platform identifier (e.g. "slack").
    fn id(&self) -> &str;

    /// Identity used to recognise the bot's own messages.
    async fn bot_identity(&self) -> Result<BotIdentity>;

    /// List member ids of a channel. Fails with `ChannelUnavailable`.
    async fn list_members(&self, channel_id: &ChannelId) -> Result<Vec<MemberId>>;

    /// Resolve one member. Fails with `MemberLookupFailed`.
    async fn member_info(&self, member_id: &MemberId) -> Result<MemberInfo>;

    async fn post_message(
        &self,
        channel_id: &ChannelId,
        content: &RosterContent,
    ) -> Result<MessageHandle>;

    /// Edit a message in place. Fails with `MessageGone` when the target no
    /// longer exists.
    async fn update_message(
        &self,
        channel_id: &ChannelId,
        handle: &MessageHandle,
        content: &RosterContent,
    ) -> Result<()>;

    async fn delete_message(&self, channel_id: &ChannelId, handle: &MessageHandle) -> Result<()>;

    /// Most recent messages of a channel, newest first.
    async fn list_recent_messages(
        &self,
        channel_id: &ChannelId,
        limit: usize,
    ) -> Result<Vec<RecentMessage>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(display: &str, last: &str, first: &str) -> MemberInfo {
        MemberInfo {
            id: MemberId::new("U1"),
            name: "jdoe".into(),
            display_name: display.into(),
            last_name: last.into(),
            first_name: first.into(),
            is_bot: false,
            presence: PresenceState::Available,
        }
    }

    #[test]
    fn resolved_name_prefers_display_name() {
        assert_eq!(member("Jay", "Doe", "John").resolved_name(), "Jay");
    }

    #[test]
    fn resolved_name_falls_back_in_order() {
        assert_eq!(member("", "Doe", "John").resolved_name(), "Doe");
        assert_eq!(member("  ", "", "John").resolved_name(), "John");
        assert_eq!(member("", "", "").resolved_name(), "jdoe");
    }

    #[test]
    fn identity_matches_user_or_bot_id() {
        let me = BotIdentity {
            user_id: "UBOT".into(),
            bot_id: Some("B1".into()),
        };
        let by_user = RecentMessage {
            handle: MessageHandle::new("1.0"),
            author_id: Some("UBOT".into()),
            bot_id: None,
        };
        let by_bot = RecentMessage {
            handle: MessageHandle::new("2.0"),
            author_id: None,
            bot_id: Some("B1".into()),
        };
        let other = RecentMessage {
            handle: MessageHandle::new("3.0"),
            author_id: Some("U2".into()),
            bot_id: Some("B9".into()),
        };
        assert!(me.authored(&by_user));
        assert!(me.authored(&by_bot));
        assert!(!me.authored(&other));
    }
}
