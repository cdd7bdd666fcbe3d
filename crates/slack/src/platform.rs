//! [`ChatPlatform`] implementation on top of [`SlackApi`].

use std::sync::Arc;

use {
    async_trait::async_trait,
    rollcall_channels::{
        BotIdentity, ChatPlatform, Error as PlatformError, MemberInfo, PresenceState,
        RecentMessage, Result as PlatformResult, RosterContent,
    },
    rollcall_common::{ChannelId, MemberId, MessageHandle},
    slack_morphism::prelude::SlackHistoryMessage,
};

use crate::{Error, api::SlackApi, profiles::SlackUser};

/// `profile.huddle_state` of a member currently in a huddle.
const IN_HUDDLE: &str = "in_a_huddle";

/// Slackbot is a built-in user without the `is_bot` flag.
const SLACKBOT_ID: &str = "USLACKBOT";

/// Error codes meaning the message to edit or delete no longer exists.
/// `cant_delete_message` is a permission failure and stays a write failure.
const GONE_CODES: &[&str] = &["message_not_found", "cant_update_message"];

impl From<SlackUser> for MemberInfo {
    fn from(user: SlackUser) -> Self {
        let presence = if user.profile.huddle_state.as_deref() == Some(IN_HUDDLE) {
            PresenceState::InHuddle
        } else {
            PresenceState::Available
        };
        Self {
            is_bot: user.is_bot || user.id == SLACKBOT_ID,
            id: MemberId::new(user.id),
            name: user.name,
            display_name: user.profile.display_name,
            last_name: user.profile.last_name,
            first_name: user.profile.first_name,
            presence,
        }
    }
}

fn recent_message(message: SlackHistoryMessage) -> RecentMessage {
    RecentMessage {
        handle: MessageHandle::new(message.origin.ts.0),
        author_id: message.sender.user.map(|user| user.0),
        bot_id: message.sender.bot_id.map(|bot| bot.0),
    }
}

fn is_gone(err: &Error) -> bool {
    err.code().is_some_and(|code| GONE_CODES.contains(&code))
}

/// Map a failed edit or delete of an existing message.
fn edit_error(
    operation: &'static str,
    channel_id: &ChannelId,
    handle: &MessageHandle,
    err: &Error,
) -> PlatformError {
    if is_gone(err) {
        PlatformError::message_gone(channel_id, handle)
    } else {
        PlatformError::write_failed(operation, channel_id, err.reason())
    }
}

pub struct SlackPlatform {
    api: Arc<SlackApi>,
}

impl SlackPlatform {
    pub fn new(api: Arc<SlackApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ChatPlatform for SlackPlatform {
    fn id(&self) -> &str {
        "slack"
    }

    async fn bot_identity(&self) -> PlatformResult<BotIdentity> {
        let auth = self
            .api
            .auth_test()
            .await
            .map_err(|e| PlatformError::external("auth.test", e))?;
        Ok(BotIdentity {
            user_id: auth.user_id.0,
            bot_id: auth.bot_id.map(|bot| bot.0),
        })
    }

    async fn list_members(&self, channel_id: &ChannelId) -> PlatformResult<Vec<MemberId>> {
        self.api
            .conversations_members(channel_id.as_str())
            .await
            .map(|ids| ids.into_iter().map(MemberId::new).collect())
            .map_err(|e| PlatformError::channel_unavailable(channel_id, e.reason()))
    }

    async fn member_info(&self, member_id: &MemberId) -> PlatformResult<MemberInfo> {
        self.api
            .users_info(member_id.as_str())
            .await
            .map(MemberInfo::from)
            .map_err(|e| PlatformError::member_lookup_failed(member_id, e.reason()))
    }

    async fn post_message(
        &self,
        channel_id: &ChannelId,
        content: &RosterContent,
    ) -> PlatformResult<MessageHandle> {
        self.api
            .chat_post_message(channel_id.as_str(), content)
            .await
            .map(MessageHandle::new)
            .map_err(|e| PlatformError::write_failed("post", channel_id, e.reason()))
    }

    async fn update_message(
        &self,
        channel_id: &ChannelId,
        handle: &MessageHandle,
        content: &RosterContent,
    ) -> PlatformResult<()> {
        self.api
            .chat_update(channel_id.as_str(), handle.as_str(), content)
            .await
            .map_err(|e| edit_error("update", channel_id, handle, &e))
    }

    async fn delete_message(
        &self,
        channel_id: &ChannelId,
        handle: &MessageHandle,
    ) -> PlatformResult<()> {
        self.api
            .chat_delete(channel_id.as_str(), handle.as_str())
            .await
            .map_err(|e| edit_error("delete", channel_id, handle, &e))
    }

    async fn list_recent_messages(
        &self,
        channel_id: &ChannelId,
        limit: usize,
    ) -> PlatformResult<Vec<RecentMessage>> {
        let messages = self
            .api
            .conversations_history(channel_id.as_str(), limit)
            .await
            .map_err(|e| PlatformError::channel_unavailable(channel_id, e.reason()))?;
        Ok(messages.into_iter().map(recent_message).collect())
    }
}
