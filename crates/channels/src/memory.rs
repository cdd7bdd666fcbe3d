//! In-memory chat platform for tests and dry runs.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
    time::Duration,
};

use {
    async_trait::async_trait,
    rollcall_common::{ChannelId, MemberId, MessageHandle},
};

use crate::{
    Error, Result,
    content::RosterContent,
    platform::{BotIdentity, ChatPlatform, MemberInfo, PresenceState, RecentMessage},
};

/// A message stored by [`InMemoryPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub handle: MessageHandle,
    pub author_id: Option<String>,
    pub bot_id: Option<String>,
    pub content: RosterContent,
}

/// Number of calls made per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_members: usize,
    pub member_info: usize,
    pub posts: usize,
    pub updates: usize,
    pub deletes: usize,
    pub history: usize,
}

#[derive(Default)]
struct State {
    members: HashMap<ChannelId, Vec<MemberId>>,
    users: HashMap<MemberId, MemberInfo>,
    /// Oldest first.
    messages: HashMap<ChannelId, Vec<StoredMessage>>,
    unavailable: HashSet<ChannelId>,
    failing_lookups: HashSet<MemberId>,
    failing_writes: HashSet<ChannelId>,
    next_ts: u64,
    calls: CallCounts,
}

/// Platform backed by `HashMap`s. No network; every call can be delayed and
/// selectively failed.
pub struct InMemoryPlatform {
    identity: BotIdentity,
    latency: Mutex<Duration>,
    state: Mutex<State>,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new(BotIdentity {
            user_id: "UBOT".into(),
            bot_id: Some("BBOT".into()),
        })
    }
}

/// Build a human member fixture.
#[must_use]
pub fn person(id: &str, display_name: &str, presence: PresenceState) -> MemberInfo {
    MemberInfo {
        id: MemberId::new(id),
        name: id.to_lowercase(),
        display_name: display_name.into(),
        last_name: String::new(),
        first_name: String::new(),
        is_bot: false,
        presence,
    }
}

/// Build a bot member fixture.
#[must_use]
pub fn bot(id: &str, name: &str) -> MemberInfo {
    MemberInfo {
        is_bot: true,
        ..person(id, name, PresenceState::Available)
    }
}

impl InMemoryPlatform {
    pub fn new(identity: BotIdentity) -> Self {
        Self {
            identity,
            latency: Mutex::new(Duration::ZERO),
            state: Mutex::new(State::default()),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap_or_else(|e| e.into_inner());
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    /// Delay every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    /// Register a channel with the given members.
    pub fn add_channel(&self, channel_id: &str, members: impl IntoIterator<Item = MemberInfo>) {
        self.with_state(|state| {
            let ids = members
                .into_iter()
                .map(|info| {
                    let id = info.id.clone();
                    state.users.insert(id.clone(), info);
                    id
                })
                .collect();
            state.members.insert(ChannelId::new(channel_id), ids);
        });
    }

    /// Insert or replace a member's attributes.
    pub fn upsert_member(&self, info: MemberInfo) {
        self.with_state(|state| {
            state.users.insert(info.id.clone(), info);
        });
    }

    pub fn set_presence(&self, member_id: &str, presence: PresenceState) {
        self.with_state(|state| {
            if let Some(user) = state.users.get_mut(&MemberId::new(member_id)) {
                user.presence = presence;
            }
        });
    }

    /// Make `list_members` fail for a channel.
    pub fn set_channel_unavailable(&self, channel_id: &str, unavailable: bool) {
        self.with_state(|state| {
            toggle(&mut state.unavailable, ChannelId::new(channel_id), unavailable);
        });
    }

    /// Make `member_info` fail for a member.
    pub fn set_lookup_failing(&self, member_id: &str, failing: bool) {
        self.with_state(|state| {
            toggle(&mut state.failing_lookups, MemberId::new(member_id), failing);
        });
    }

    /// Make post/update/delete fail for a channel.
    pub fn set_writes_failing(&self, channel_id: &str, failing: bool) {
        self.with_state(|state| {
            toggle(&mut state.failing_writes, ChannelId::new(channel_id), failing);
        });
    }

    /// Seed a message as if posted by someone else (or by a previous run of
    /// this bot when `author` is the bot's own user id).
    pub fn seed_message(&self, channel_id: &str, author: &str, text: &str) -> MessageHandle {
        self.with_state(|state| {
            let handle = next_handle(state);
            state
                .messages
                .entry(ChannelId::new(channel_id))
                .or_default()
                .push(StoredMessage {
                    handle: handle.clone(),
                    author_id: Some(author.into()),
                    bot_id: None,
                    content: RosterContent::text(text),
                });
            handle
        })
    }

    /// Delete a message behind the engine's back.
    pub fn remove_message(&self, channel_id: &str, handle: &MessageHandle) {
        self.with_state(|state| {
            if let Some(messages) = state.messages.get_mut(&ChannelId::new(channel_id)) {
                messages.retain(|m| &m.handle != handle);
            }
        });
    }

    /// All messages currently in a channel, oldest first.
    pub fn messages(&self, channel_id: &str) -> Vec<StoredMessage> {
        self.with_state(|state| {
            state
                .messages
                .get(&ChannelId::new(channel_id))
                .cloned()
                .unwrap_or_default()
        })
    }

    /// Messages in a channel authored by this bot.
    pub fn bot_messages(&self, channel_id: &str) -> Vec<StoredMessage> {
        self.messages(channel_id)
            .into_iter()
            .filter(|m| self.identity.authored(&recent(m)))
            .collect()
    }

    pub fn calls(&self) -> CallCounts {
        self.with_state(|state| state.calls)
    }
}

fn toggle<T: std::hash::Hash + Eq>(set: &mut HashSet<T>, key: T, on: bool) {
    if on {
        set.insert(key);
    } else {
        set.remove(&key);
    }
}

fn next_handle(state: &mut State) -> MessageHandle {
    state.next_ts += 1;
    MessageHandle::new(format!("1700000000.{:06}", state.next_ts))
}

fn recent(message: &StoredMessage) -> RecentMessage {
    RecentMessage {
        handle: message.handle.clone(),
        author_id: message.author_id.clone(),
        bot_id: message.bot_id.clone(),
    }
}

#[async_trait]
impl ChatPlatform for InMemoryPlatform {
    fn id(&self) -> &str {
        "memory"
    }

    async fn bot_identity(&self) -> Result<BotIdentity> {
        Ok(self.identity.clone())
    }

    async fn list_members(&self, channel_id: &ChannelId) -> Result<Vec<MemberId>> {
        self.simulate_latency().await;
        self.with_state(|state| {
            state.calls.list_members += 1;
            if state.unavailable.contains(channel_id) {
                return Err(Error::channel_unavailable(channel_id, "channel_not_found"));
            }
            state
                .members
                .get(channel_id)
                .cloned()
                .ok_or_else(|| Error::channel_unavailable(channel_id, "not_in_channel"))
        })
    }

    async fn member_info(&self, member_id: &MemberId) -> Result<MemberInfo> {
        self.simulate_latency().await;
        self.with_state(|state| {
            state.calls.member_info += 1;
            if state.failing_lookups.contains(member_id) {
                return Err(Error::member_lookup_failed(member_id, "user_not_found"));
            }
            state
                .users
                .get(member_id)
                .cloned()
                .ok_or_else(|| Error::member_lookup_failed(member_id, "user_not_found"))
        })
    }

    async fn post_message(
        &self,
        channel_id: &ChannelId,
        content: &RosterContent,
    ) -> Result<MessageHandle> {
        self.simulate_latency().await;
        let identity = self.identity.clone();
        self.with_state(|state| {
            state.calls.posts += 1;
            if state.failing_writes.contains(channel_id) {
                return Err(Error::write_failed("post", channel_id, "internal_error"));
            }
            let handle = next_handle(state);
            state
                .messages
                .entry(channel_id.clone())
                .or_default()
                .push(StoredMessage {
                    handle: handle.clone(),
                    author_id: Some(identity.user_id),
                    bot_id: identity.bot_id,
                    content: content.clone(),
                });
            Ok(handle)
        })
    }

    async fn update_message(
        &self,
        channel_id: &ChannelId,
        handle: &MessageHandle,
        content: &RosterContent,
    ) -> Result<()> {
        self.simulate_latency().await;
        self.with_state(|state| {
            state.calls.updates += 1;
            if state.failing_writes.contains(channel_id) {
                return Err(Error::write_failed("update", channel_id, "internal_error"));
            }
            let message = state
                .messages
                .get_mut(channel_id)
                .and_then(|messages| messages.iter_mut().find(|m| &m.handle == handle))
                .ok_or_else(|| Error::message_gone(channel_id, handle))?;
            message.content = content.clone();
            Ok(())
        })
    }

    async fn delete_message(&self, channel_id: &ChannelId, handle: &MessageHandle) -> Result<()> {
        self.simulate_latency().await;
        self.with_state(|state| {
            state.calls.deletes += 1;
            if state.failing_writes.contains(channel_id) {
                return Err(Error::write_failed("delete", channel_id, "internal_error"));
            }
            let messages = state.messages.entry(channel_id.clone()).or_default();
            let before = messages.len();
            messages.retain(|m| &m.handle != handle);
            if messages.len() == before {
                return Err(Error::message_gone(channel_id, handle));
            }
            Ok(())
        })
    }

    async fn list_recent_messages(
        &self,
        channel_id: &ChannelId,
        limit: usize,
    ) -> Result<Vec<RecentMessage>> {
        self.simulate_latency().await;
        self.with_state(|state| {
            state.calls.history += 1;
            Ok(state
                .messages
                .get(channel_id)
                .map(|messages| messages.iter().rev().take(limit).map(recent).collect())
                .unwrap_or_default())
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn post_update_and_delete_roundtrip() {
        let platform = InMemoryPlatform::default();
        let channel = ChannelId::new("C1");

        let handle = platform
            .post_message(&channel, &RosterContent::text("Alice?"))
            .await
            .unwrap();
        platform
            .update_message(&channel, &handle, &RosterContent::text("Alice? Bob?"))
            .await
            .unwrap();
        assert_eq!(platform.messages("C1")[0].content.text, "Alice? Bob?");

        platform.delete_message(&channel, &handle).await.unwrap();
        assert!(platform.messages("C1").is_empty());
    }

    #[tokio::test]
    async fn update_of_removed_message_reports_gone() {
        let platform = InMemoryPlatform::default();
        let channel = ChannelId::new("C1");
        let handle = platform
            .post_message(&channel, &RosterContent::text("x"))
            .await
            .unwrap();
        platform.remove_message("C1", &handle);

        let err = platform
            .update_message(&channel, &handle, &RosterContent::text("y"))
            .await
            .unwrap_err();
        assert!(err.is_message_gone());
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let platform = InMemoryPlatform::default();
        platform.seed_message("C1", "U1", "first");
        platform.seed_message("C1", "U2", "second");
        let last = platform.seed_message("C1", "U3", "third");

        let recent = platform
            .list_recent_messages(&ChannelId::new("C1"), 2)
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].handle, last);
    }

    #[tokio::test]
    async fn unknown_channel_is_unavailable() {
        let platform = InMemoryPlatform::default();
        let err = platform
            .list_members(&ChannelId::new("C404"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChannelUnavailable { .. }));
    }
}
