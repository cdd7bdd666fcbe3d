//! Slack Web API access through slack-morphism.
//!
//! Every call opens a short-lived session on the shared client with the bot
//! token. Failures keep the method name so they can be logged and mapped onto
//! platform errors by Slack error code.

use std::{future::Future, sync::Arc};

use {
    rollcall_channels::RosterContent,
    rollcall_config::SlackConfig,
    secrecy::ExposeSecret,
    slack_morphism::{errors::SlackClientError, prelude::*},
    tracing::debug,
};

#[cfg(feature = "metrics")]
use rollcall_metrics::{counter, labels, slack as slack_metrics};

use crate::{
    Error, Result, blocks,
    profiles::{ProfileApi, SlackUser},
};

/// Page size for `conversations.members`.
const MEMBERS_PAGE_SIZE: u16 = 200;

/// `conversations.history` rejects larger limits.
const MAX_HISTORY_LIMIT: u16 = 1000;

/// Authenticated Slack Web API client.
pub struct SlackApi {
    client: Arc<SlackHyperClient>,
    bot_token: SlackApiToken,
    app_token: SlackApiToken,
    profiles: ProfileApi,
}

impl SlackApi {
    pub fn new(config: &SlackConfig) -> Result<Self> {
        let connector =
            SlackClientHyperConnector::new().map_err(|e| Error::Connector(e.to_string()))?;
        Ok(Self {
            client: Arc::new(SlackClient::new(connector)),
            bot_token: token(config.bot_token.expose_secret()),
            app_token: token(config.app_token.expose_secret()),
            profiles: ProfileApi::new(config)?,
        })
    }

    pub fn client(&self) -> &Arc<SlackHyperClient> {
        &self.client
    }

    /// App-level token used to open Socket Mode connections.
    pub fn app_token(&self) -> &SlackApiToken {
        &self.app_token
    }

    pub async fn auth_test(&self) -> Result<SlackApiAuthTestResponse> {
        let session = self.client.open_session(&self.bot_token);
        call("auth.test", session.auth_test()).await
    }

    /// All member ids of a channel, following cursor pagination.
    pub async fn conversations_members(&self, channel: &str) -> Result<Vec<String>> {
        let session = self.client.open_session(&self.bot_token);
        let mut members = Vec::new();
        let mut cursor: Option<SlackCursorId> = None;
        loop {
            let mut request = SlackApiConversationsMembersRequest::new()
                .with_channel(SlackChannelId(channel.to_string()))
                .with_limit(MEMBERS_PAGE_SIZE);
            if let Some(cursor) = cursor.take() {
                request = request.with_cursor(cursor);
            }
            let page = call(
                "conversations.members",
                session.conversations_members(&request),
            )
            .await?;
            members.extend(page.members.into_iter().map(|id| id.0));

            cursor = next_cursor(page.response_metadata);
            if cursor.is_none() {
                break;
            }
            debug!(channel, fetched = members.len(), "fetching next member page");
        }
        Ok(members)
    }

    pub async fn users_info(&self, user: &str) -> Result<SlackUser> {
        self.profiles.users_info(user).await
    }

    /// Post a new message and return its `ts`.
    pub async fn chat_post_message(
        &self,
        channel: &str,
        content: &RosterContent,
    ) -> Result<String> {
        let session = self.client.open_session(&self.bot_token);
        let request = SlackApiChatPostMessageRequest::new(
            SlackChannelId(channel.to_string()),
            message_content(content, false),
        );
        let posted = call("chat.postMessage", session.chat_post_message(&request)).await?;
        Ok(posted.ts.0)
    }

    /// Replace text and blocks of a message. Text-only content clears the
    /// blocks of a message previously posted in blocks mode.
    pub async fn chat_update(
        &self,
        channel: &str,
        ts: &str,
        content: &RosterContent,
    ) -> Result<()> {
        let session = self.client.open_session(&self.bot_token);
        let request = SlackApiChatUpdateRequest::new(
            SlackChannelId(channel.to_string()),
            message_content(content, true),
            SlackTs(ts.to_string()),
        );
        call("chat.update", session.chat_update(&request)).await?;
        Ok(())
    }

    pub async fn chat_delete(&self, channel: &str, ts: &str) -> Result<()> {
        let session = self.client.open_session(&self.bot_token);
        let request = SlackApiChatDeleteRequest::new(
            SlackChannelId(channel.to_string()),
            SlackTs(ts.to_string()),
        );
        call("chat.delete", session.chat_delete(&request)).await?;
        Ok(())
    }

    /// Most recent messages, newest first.
    pub async fn conversations_history(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<SlackHistoryMessage>> {
        let session = self.client.open_session(&self.bot_token);
        let request = SlackApiConversationsHistoryRequest::new()
            .with_channel(SlackChannelId(channel.to_string()))
            .with_limit(history_limit(limit));
        let history = call(
            "conversations.history",
            session.conversations_history(&request),
        )
        .await?;
        Ok(history.messages)
    }
}

fn token(value: &str) -> SlackApiToken {
    SlackApiToken::new(SlackApiTokenValue(value.to_string()))
}

fn next_cursor(metadata: Option<SlackResponseMetadata>) -> Option<SlackCursorId> {
    metadata
        .and_then(|meta| meta.next_cursor)
        .filter(|cursor| !cursor.0.is_empty())
}

fn history_limit(limit: usize) -> u16 {
    u16::try_from(limit).map_or(MAX_HISTORY_LIMIT, |limit| limit.min(MAX_HISTORY_LIMIT))
}

/// Message body for a post or an update. Updates always send a block list so
/// that switching to text mode removes earlier blocks.
fn message_content(content: &RosterContent, replace_blocks: bool) -> SlackMessageContent {
    let message = SlackMessageContent::new().with_text(content.text.clone());
    let blocks = if content.is_structured() {
        blocks::to_slack_blocks(&content.blocks)
    } else {
        None
    };
    match blocks {
        Some(blocks) => message.with_blocks(blocks),
        None if replace_blocks => message.with_blocks(Vec::new()),
        None => message,
    }
}

async fn call<T>(
    method: &'static str,
    request: impl Future<Output = std::result::Result<T, SlackClientError>>,
) -> Result<T> {
    record_call(method);
    request.await.map_err(|e| {
        record_error(method);
        debug!(method, error = %e, "slack api call failed");
        Error::client(method, e)
    })
}

pub(crate) fn record_call(method: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(slack_metrics::API_CALLS_TOTAL, labels::METHOD => method).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = method;
}

pub(crate) fn record_error(method: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(slack_metrics::API_ERRORS_TOTAL, labels::METHOD => method).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = method;
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rollcall_channels::RosterBlock, serde_json::json};

    fn structured() -> RosterContent {
        RosterContent::text("A?").with_blocks(vec![
            RosterBlock::Header {
                text: "Who's here".into(),
            },
            RosterBlock::Member { name: "A".into() },
        ])
    }

    #[test]
    fn history_limit_is_capped() {
        assert_eq!(history_limit(5), 5);
        assert_eq!(history_limit(5_000), MAX_HISTORY_LIMIT);
        assert_eq!(history_limit(usize::MAX), MAX_HISTORY_LIMIT);
    }

    fn metadata(value: serde_json::Value) -> Option<SlackResponseMetadata> {
        Some(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn empty_cursor_ends_pagination() {
        assert!(next_cursor(None).is_none());
        assert!(next_cursor(metadata(json!({}))).is_none());
        assert!(next_cursor(metadata(json!({ "next_cursor": "" }))).is_none());

        let cursor = next_cursor(metadata(json!({ "next_cursor": "abc" })));
        assert_eq!(cursor.map(|c| c.0).as_deref(), Some("abc"));
    }

    #[test]
    fn post_sends_text_and_blocks() {
        let message = message_content(&structured(), false);
        assert_eq!(message.text.as_deref(), Some("A?"));
        assert_eq!(message.blocks.map(|b| b.len()), Some(2));
    }

    #[test]
    fn text_post_carries_no_blocks() {
        let message = message_content(&RosterContent::text("A? B?"), false);
        assert_eq!(message.text.as_deref(), Some("A? B?"));
        assert!(message.blocks.is_none());
    }

    #[test]
    fn text_update_clears_blocks() {
        let message = message_content(&RosterContent::text("A? B?"), true);
        assert_eq!(message.blocks.map(|b| b.len()), Some(0));
    }
}
