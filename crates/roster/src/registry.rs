//! Process-wide set of monitored channels.
//!
//! The map is private; callers go through a narrow API. Every entry carries
//! an epoch assigned when it was created, and mutations issued on behalf of
//! in-flight work name the epoch they started under. Once a channel is
//! stopped (or stopped and started again) those mutations are refused.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Mutex,
};

use rollcall_common::{ChannelId, MessageHandle};

use crate::expiry::{ExpiryState, ExpiryToken};

/// Generation of a monitoring session for one channel.
pub type Epoch = u64;

/// Lifecycle metadata of one monitored channel.
#[derive(Debug)]
pub struct MonitorEntry {
    pub channel_id: ChannelId,
    pub epoch: Epoch,
    /// The one live roster message, if it exists.
    pub active_message: Option<MessageHandle>,
    pub expiry: ExpiryState,
    /// Consecutive failed refreshes.
    pub failures: u32,
    /// Whether the current failure streak has been reported.
    pub alerted: bool,
}

/// Result of [`Registry::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub epoch: Epoch,
    /// `false` when the channel was already monitored.
    pub created: bool,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<ChannelId, MonitorEntry>,
    next_epoch: Epoch,
}

#[derive(Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut inner)
    }

    /// Create an entry for `channel_id`, or return the existing one's epoch.
    pub fn admit(&self, channel_id: &ChannelId) -> Admission {
        self.with_inner(|inner| {
            if let Some(entry) = inner.entries.get(channel_id) {
                return Admission {
                    epoch: entry.epoch,
                    created: false,
                };
            }
            inner.next_epoch += 1;
            let epoch = inner.next_epoch;
            inner.entries.insert(channel_id.clone(), MonitorEntry {
                channel_id: channel_id.clone(),
                epoch,
                active_message: None,
                expiry: ExpiryState::Unarmed,
                failures: 0,
                alerted: false,
            });
            Admission {
                epoch,
                created: true,
            }
        })
    }

    /// Remove and return the entry. The caller owns its teardown.
    pub fn remove(&self, channel_id: &ChannelId) -> Option<MonitorEntry> {
        self.with_inner(|inner| inner.entries.remove(channel_id))
    }

    /// Remove the entry only if its expiry timer is still the one identified
    /// by `token`. The returned entry is disarmed, not cancelled.
    pub fn remove_expired(
        &self,
        channel_id: &ChannelId,
        token: ExpiryToken,
    ) -> Option<MonitorEntry> {
        self.with_inner(|inner| {
            if !inner
                .entries
                .get(channel_id)
                .is_some_and(|entry| entry.expiry.matches(token))
            {
                return None;
            }
            let mut entry = inner.entries.remove(channel_id)?;
            entry.expiry.disarm();
            Some(entry)
        })
    }

    /// Remove every entry.
    pub fn drain(&self) -> Vec<MonitorEntry> {
        self.with_inner(|inner| inner.entries.drain().map(|(_, entry)| entry).collect())
    }

    pub fn is_monitored(&self, channel_id: &ChannelId) -> bool {
        self.with_inner(|inner| inner.entries.contains_key(channel_id))
    }

    pub fn all_monitored(&self) -> BTreeSet<ChannelId> {
        self.with_inner(|inner| inner.entries.keys().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.with_inner(|inner| inner.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn epoch_of(&self, channel_id: &ChannelId) -> Option<Epoch> {
        self.with_inner(|inner| inner.entries.get(channel_id).map(|entry| entry.epoch))
    }

    /// Whether `epoch` is still the live monitoring session of `channel_id`.
    pub fn is_current(&self, channel_id: &ChannelId, epoch: Epoch) -> bool {
        self.epoch_of(channel_id) == Some(epoch)
    }

    /// Run `f` against the entry if it still belongs to `epoch`.
    pub fn with_current<R>(
        &self,
        channel_id: &ChannelId,
        epoch: Epoch,
        f: impl FnOnce(&mut MonitorEntry) -> R,
    ) -> Option<R> {
        self.with_inner(|inner| {
            inner
                .entries
                .get_mut(channel_id)
                .filter(|entry| entry.epoch == epoch)
                .map(f)
        })
    }

    /// Active message of the current session. `None` when the session is
    /// gone, `Some(None)` when it has no message yet.
    pub fn active_message(
        &self,
        channel_id: &ChannelId,
        epoch: Epoch,
    ) -> Option<Option<MessageHandle>> {
        self.with_current(channel_id, epoch, |entry| entry.active_message.clone())
    }

    /// Record a freshly posted message. Returns `false` (and records nothing)
    /// when the session ended while the post was in flight.
    pub fn record_message(
        &self,
        channel_id: &ChannelId,
        epoch: Epoch,
        handle: MessageHandle,
    ) -> bool {
        self.with_current(channel_id, epoch, |entry| {
            entry.active_message = Some(handle);
        })
        .is_some()
    }

    /// Forget `handle` if it is still the recorded one.
    pub fn clear_message(&self, channel_id: &ChannelId, epoch: Epoch, handle: &MessageHandle) {
        self.with_current(channel_id, epoch, |entry| {
            if entry.active_message.as_ref() == Some(handle) {
                entry.active_message = None;
            }
        });
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn c(id: &str) -> ChannelId {
        ChannelId::new(id)
    }

    #[test]
    fn admit_is_idempotent() {
        let registry = Registry::new();
        let first = registry.admit(&c("C1"));
        let second = registry.admit(&c("C1"));

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.epoch, second.epoch);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn entry_exists_iff_monitored() {
        let registry = Registry::new();
        assert!(!registry.is_monitored(&c("C1")));

        registry.admit(&c("C1"));
        registry.admit(&c("C2"));
        assert!(registry.is_monitored(&c("C1")));
        assert_eq!(
            registry.all_monitored().into_iter().collect::<Vec<_>>(),
            [c("C1"), c("C2")]
        );

        assert!(registry.remove(&c("C1")).is_some());
        assert!(registry.remove(&c("C1")).is_none());
        assert!(!registry.is_monitored(&c("C1")));
    }

    #[test]
    fn restart_gets_a_new_epoch() {
        let registry = Registry::new();
        let old = registry.admit(&c("C1")).epoch;
        registry.remove(&c("C1"));
        let new = registry.admit(&c("C1")).epoch;

        assert_ne!(old, new);
        assert!(!registry.is_current(&c("C1"), old));
        assert!(registry.is_current(&c("C1"), new));
    }

    #[test]
    fn stale_epoch_cannot_record_a_message() {
        let registry = Registry::new();
        let old = registry.admit(&c("C1")).epoch;
        registry.remove(&c("C1"));
        let new = registry.admit(&c("C1")).epoch;

        assert!(!registry.record_message(&c("C1"), old, MessageHandle::new("1.0")));
        assert_eq!(registry.active_message(&c("C1"), new), Some(None));
        assert_eq!(registry.active_message(&c("C1"), old), None);
    }

    #[test]
    fn clear_message_only_clears_matching_handle() {
        let registry = Registry::new();
        let epoch = registry.admit(&c("C1")).epoch;
        registry.record_message(&c("C1"), epoch, MessageHandle::new("2.0"));

        registry.clear_message(&c("C1"), epoch, &MessageHandle::new("1.0"));
        assert_eq!(
            registry.active_message(&c("C1"), epoch),
            Some(Some(MessageHandle::new("2.0")))
        );

        registry.clear_message(&c("C1"), epoch, &MessageHandle::new("2.0"));
        assert_eq!(registry.active_message(&c("C1"), epoch), Some(None));
    }

    #[tokio::test]
    async fn remove_expired_checks_the_token() {
        let registry = Registry::new();
        let epoch = registry.admit(&c("C1")).epoch;
        let timer = tokio::spawn(std::future::pending::<()>());
        registry.with_current(&c("C1"), epoch, |entry| {
            entry
                .expiry
                .arm(tokio::time::Instant::now(), 5, timer.abort_handle());
        });

        assert!(registry.remove_expired(&c("C1"), 4).is_none());
        assert!(registry.is_monitored(&c("C1")));

        let entry = registry.remove_expired(&c("C1"), 5).unwrap();
        assert!(!entry.expiry.is_armed());
        assert!(!registry.is_monitored(&c("C1")));
        // Disarmed, not aborted.
        assert!(!timer.is_finished());
        timer.abort();
    }
}
