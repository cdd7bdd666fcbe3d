//! The one live roster message per channel.
//!
//! Before a new message is posted every message this bot authored in the
//! recent history is deleted, so the channel never shows two rosters. Writes
//! name the epoch they run under; a post that lands after its session ended
//! is deleted again right away.

use std::sync::Arc;

use {
    rollcall_channels::{BotIdentity, ChatPlatform, RosterContent},
    rollcall_common::{ChannelId, MessageHandle},
    tokio::sync::OnceCell,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use rollcall_metrics::{counter, roster as roster_metrics};

use crate::{
    Result,
    registry::{Epoch, Registry},
};

/// What a [`Lifecycle::refresh`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Written {
    Updated(MessageHandle),
    Posted(MessageHandle),
    /// The session ended before anything could be written.
    Skipped,
}

pub struct Lifecycle {
    platform: Arc<dyn ChatPlatform>,
    registry: Arc<Registry>,
    history_limit: usize,
    identity: OnceCell<BotIdentity>,
}

impl Lifecycle {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        registry: Arc<Registry>,
        history_limit: usize,
    ) -> Self {
        Self {
            platform,
            registry,
            history_limit,
            identity: OnceCell::new(),
        }
    }

    async fn identity(&self) -> Result<&BotIdentity> {
        Ok(self
            .identity
            .get_or_try_init(|| self.platform.bot_identity())
            .await?)
    }

    /// Delete every message in the recent history authored by this bot.
    /// Returns how many were deleted.
    pub async fn ensure_clean(&self, channel_id: &ChannelId) -> Result<usize> {
        self.sweep(channel_id, false).await
    }

    /// Delete the bot's messages from recent history. With `yield_to_restart`
    /// the sweep stops as soon as the channel is monitored again, leaving the
    /// new session's message alone.
    async fn sweep(&self, channel_id: &ChannelId, yield_to_restart: bool) -> Result<usize> {
        if self.history_limit == 0 {
            return Ok(0);
        }
        let identity = self.identity().await?;
        let recent = self
            .platform
            .list_recent_messages(channel_id, self.history_limit)
            .await?;

        let mut deleted = 0;
        let mut first_error = None;
        for message in recent.iter().filter(|m| identity.authored(m)) {
            if yield_to_restart && self.registry.is_monitored(channel_id) {
                debug!(
                    channel_id = %channel_id,
                    "channel restarted, leaving cleanup to the new session"
                );
                break;
            }
            match self.platform.delete_message(channel_id, &message.handle).await {
                Ok(()) => deleted += 1,
                Err(e) if e.is_message_gone() => {},
                Err(e) => {
                    warn!(
                        channel_id = %channel_id,
                        handle = %message.handle,
                        error = %e,
                        "failed to delete stale roster message"
                    );
                    first_error.get_or_insert(e);
                },
            }
        }

        if deleted > 0 {
            info!(channel_id = %channel_id, deleted, "deleted stale roster messages");
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(deleted),
        }
    }

    /// Clean the channel and post `content` as the live message.
    pub async fn publish(
        &self,
        channel_id: &ChannelId,
        epoch: Epoch,
        content: &RosterContent,
    ) -> Result<Written> {
        if !self.registry.is_current(channel_id, epoch) {
            return Ok(Written::Skipped);
        }
        self.ensure_clean(channel_id).await?;
        if !self.registry.is_current(channel_id, epoch) {
            return Ok(Written::Skipped);
        }

        let handle = self.platform.post_message(channel_id, content).await?;
        if !self
            .registry
            .record_message(channel_id, epoch, handle.clone())
        {
            debug!(channel_id = %channel_id, handle = %handle, "session ended during post, retracting");
            self.delete_quietly(channel_id, &handle).await;
            return Ok(Written::Skipped);
        }

        #[cfg(feature = "metrics")]
        counter!(roster_metrics::MESSAGES_POSTED_TOTAL).increment(1);

        info!(channel_id = %channel_id, handle = %handle, "posted roster message");
        Ok(Written::Posted(handle))
    }

    /// Edit the live message in place, or publish one if there is none.
    ///
    /// A vanished message is replaced by a fresh post. Any other update
    /// failure leaves the recorded handle untouched for the next attempt.
    pub async fn refresh(
        &self,
        channel_id: &ChannelId,
        epoch: Epoch,
        content: &RosterContent,
    ) -> Result<Written> {
        let Some(active) = self.registry.active_message(channel_id, epoch) else {
            return Ok(Written::Skipped);
        };
        let Some(handle) = active else {
            return self.publish(channel_id, epoch, content).await;
        };

        match self
            .platform
            .update_message(channel_id, &handle, content)
            .await
        {
            Ok(()) => {
                debug!(channel_id = %channel_id, handle = %handle, "updated roster message");
                Ok(Written::Updated(handle))
            },
            Err(e) if e.is_message_gone() => {
                warn!(channel_id = %channel_id, handle = %handle, "roster message vanished, republishing");
                self.registry.clear_message(channel_id, epoch, &handle);
                self.publish(channel_id, epoch, content).await
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the live message (if any) and any strays.
    pub async fn teardown(&self, channel_id: &ChannelId, active: Option<MessageHandle>) {
        if let Some(handle) = active {
            self.delete_quietly(channel_id, &handle).await;
        }
        if let Err(e) = self.sweep(channel_id, true).await {
            warn!(channel_id = %channel_id, error = %e, "cleanup after teardown failed");
        }
    }

    /// Delete a message left over from an earlier process or session.
    pub async fn retract(&self, channel_id: &ChannelId, handle: &MessageHandle) {
        self.delete_quietly(channel_id, handle).await;
    }

    async fn delete_quietly(&self, channel_id: &ChannelId, handle: &MessageHandle) {
        match self.platform.delete_message(channel_id, handle).await {
            Ok(()) => debug!(channel_id = %channel_id, handle = %handle, "deleted roster message"),
            Err(e) if e.is_message_gone() => {},
            Err(e) => {
                warn!(channel_id = %channel_id, handle = %handle, error = %e, "failed to delete roster message");
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        rollcall_channels::{
            MemberInfo,
            memory::{InMemoryPlatform, StoredMessage},
        },
    };

    struct Fixture {
        platform: Arc<InMemoryPlatform>,
        registry: Arc<Registry>,
        lifecycle: Lifecycle,
    }

    fn fixture() -> Fixture {
        let platform = Arc::new(InMemoryPlatform::default());
        platform.add_channel("C1", Vec::<MemberInfo>::new());
        let registry = Arc::new(Registry::new());
        let lifecycle = Lifecycle::new(
            Arc::clone(&platform) as Arc<dyn ChatPlatform>,
            Arc::clone(&registry),
            100,
        );
        Fixture {
            platform,
            registry,
            lifecycle,
        }
    }

    fn c1() -> ChannelId {
        ChannelId::new("C1")
    }

    fn texts(messages: &[StoredMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.content.text.as_str()).collect()
    }

    #[tokio::test]
    async fn ensure_clean_deletes_only_own_messages() {
        let f = fixture();
        f.platform.seed_message("C1", "UBOT", "old roster");
        f.platform.seed_message("C1", "UHUMAN", "hello");
        f.platform.seed_message("C1", "UBOT", "older roster");

        let deleted = f.lifecycle.ensure_clean(&c1()).await.unwrap();

        assert_eq!(deleted, 2);
        assert_eq!(texts(&f.platform.messages("C1")), ["hello"]);
    }

    #[tokio::test]
    async fn publish_replaces_strays() {
        let f = fixture();
        f.platform.seed_message("C1", "UBOT", "stray");
        let epoch = f.registry.admit(&c1()).epoch;

        let written = f
            .lifecycle
            .publish(&c1(), epoch, &RosterContent::text("A?"))
            .await
            .unwrap();

        let Written::Posted(handle) = written else {
            panic!("expected a post, got {written:?}");
        };
        assert_eq!(texts(&f.platform.bot_messages("C1")), ["A?"]);
        assert_eq!(f.registry.active_message(&c1(), epoch), Some(Some(handle)));
    }

    #[tokio::test]
    async fn refresh_updates_in_place() {
        let f = fixture();
        let epoch = f.registry.admit(&c1()).epoch;
        let first = f
            .lifecycle
            .refresh(&c1(), epoch, &RosterContent::text("A?"))
            .await
            .unwrap();
        let second = f
            .lifecycle
            .refresh(&c1(), epoch, &RosterContent::text("A? B?"))
            .await
            .unwrap();

        let (Written::Posted(posted), Written::Updated(updated)) = (first, second) else {
            panic!("expected post then update");
        };
        assert_eq!(posted, updated);
        assert_eq!(f.platform.calls().posts, 1);
        assert_eq!(texts(&f.platform.bot_messages("C1")), ["A? B?"]);
    }

    #[tokio::test]
    async fn vanished_message_is_republished() {
        let f = fixture();
        let epoch = f.registry.admit(&c1()).epoch;
        let Written::Posted(handle) = f
            .lifecycle
            .refresh(&c1(), epoch, &RosterContent::text("A?"))
            .await
            .unwrap()
        else {
            panic!("expected a post");
        };
        f.platform.remove_message("C1", &handle);

        let written = f
            .lifecycle
            .refresh(&c1(), epoch, &RosterContent::text("B?"))
            .await
            .unwrap();

        let Written::Posted(new_handle) = written else {
            panic!("expected a republish, got {written:?}");
        };
        assert_ne!(new_handle, handle);
        assert_eq!(texts(&f.platform.bot_messages("C1")), ["B?"]);
    }

    #[tokio::test]
    async fn failed_update_keeps_stale_handle() {
        let f = fixture();
        let epoch = f.registry.admit(&c1()).epoch;
        f.lifecycle
            .refresh(&c1(), epoch, &RosterContent::text("A?"))
            .await
            .unwrap();
        let before = f.registry.active_message(&c1(), epoch);

        f.platform.set_writes_failing("C1", true);
        assert!(
            f.lifecycle
                .refresh(&c1(), epoch, &RosterContent::text("B?"))
                .await
                .is_err()
        );
        assert_eq!(f.registry.active_message(&c1(), epoch), before);
    }

    #[tokio::test]
    async fn ended_session_writes_nothing() {
        let f = fixture();
        let epoch = f.registry.admit(&c1()).epoch;
        f.registry.remove(&c1());

        let written = f
            .lifecycle
            .refresh(&c1(), epoch, &RosterContent::text("A?"))
            .await
            .unwrap();

        assert_eq!(written, Written::Skipped);
        assert_eq!(f.platform.calls().posts, 0);
    }

    #[tokio::test]
    async fn teardown_removes_live_message_and_strays() {
        let f = fixture();
        let epoch = f.registry.admit(&c1()).epoch;
        f.lifecycle
            .refresh(&c1(), epoch, &RosterContent::text("A?"))
            .await
            .unwrap();
        f.platform.seed_message("C1", "UBOT", "stray");
        let entry = f.registry.remove(&c1()).unwrap();

        f.lifecycle.teardown(&c1(), entry.active_message).await;

        assert!(f.platform.bot_messages("C1").is_empty());
    }

    #[tokio::test]
    async fn teardown_spares_message_of_restarted_session() {
        let f = fixture();
        let old = f.registry.admit(&c1()).epoch;
        f.lifecycle
            .refresh(&c1(), old, &RosterContent::text("old"))
            .await
            .unwrap();
        let entry = f.registry.remove(&c1()).unwrap();

        let new = f.registry.admit(&c1()).epoch;
        f.lifecycle
            .publish(&c1(), new, &RosterContent::text("new"))
            .await
            .unwrap();
        f.lifecycle.teardown(&c1(), entry.active_message).await;

        assert_eq!(texts(&f.platform.bot_messages("C1")), ["new"]);
    }
}
