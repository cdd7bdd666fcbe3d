//! Membership and presence gathering for one channel.

use std::sync::Arc;

use {
    futures::future::join_all,
    rollcall_channels::{ChatPlatform, MemberInfo, PresenceState},
    rollcall_common::{ChannelId, MemberId},
    serde::Serialize,
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use rollcall_metrics::{counter, roster as roster_metrics};

use crate::Result;

/// Attributes of one member at the time of a refresh. Never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSnapshot {
    pub member_id: MemberId,
    pub display_name: String,
    pub is_bot: bool,
    pub presence: PresenceState,
}

impl MemberSnapshot {
    /// Snapshot for a member whose attributes could not be resolved.
    #[must_use]
    pub fn unresolved(member_id: MemberId) -> Self {
        Self {
            display_name: member_id.to_string(),
            member_id,
            is_bot: false,
            presence: PresenceState::Unknown,
        }
    }
}

impl From<MemberInfo> for MemberSnapshot {
    fn from(info: MemberInfo) -> Self {
        Self {
            display_name: info.resolved_name().to_string(),
            member_id: info.id,
            is_bot: info.is_bot,
            presence: info.presence,
        }
    }
}

pub struct Fetcher {
    platform: Arc<dyn ChatPlatform>,
}

impl Fetcher {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self { platform }
    }

    /// List the channel's members and resolve each one concurrently.
    ///
    /// Fails only when the member listing fails. A failed lookup yields a
    /// snapshot with [`PresenceState::Unknown`] and the rest of the batch
    /// continues.
    pub async fn fetch_members(&self, channel_id: &ChannelId) -> Result<Vec<MemberSnapshot>> {
        let member_ids = self.platform.list_members(channel_id).await?;
        debug!(channel_id = %channel_id, count = member_ids.len(), "listed channel members");

        let lookups = member_ids.into_iter().map(|member_id| async move {
            match self.platform.member_info(&member_id).await {
                Ok(info) => MemberSnapshot::from(info),
                Err(e) => {
                    warn!(
                        channel_id = %channel_id,
                        member_id = %member_id,
                        error = %e,
                        "member lookup failed, excluding member"
                    );
                    #[cfg(feature = "metrics")]
                    counter!(roster_metrics::MEMBER_LOOKUP_FAILURES_TOTAL).increment(1);
                    MemberSnapshot::unresolved(member_id)
                },
            }
        });

        Ok(join_all(lookups).await)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        rollcall_channels::{
            Error as PlatformError,
            memory::{InMemoryPlatform, bot, person},
        },
    };

    fn fetcher(platform: &Arc<InMemoryPlatform>) -> Fetcher {
        Fetcher::new(Arc::clone(platform) as Arc<dyn ChatPlatform>)
    }

    #[tokio::test]
    async fn resolves_every_member_in_listing_order() {
        let platform = Arc::new(InMemoryPlatform::default());
        platform.add_channel("C1", [
            person("UA", "Alice", PresenceState::Available),
            person("UB", "Bob", PresenceState::InHuddle),
            bot("UBOT1", "Bot1"),
        ]);

        let snapshots = fetcher(&platform)
            .fetch_members(&ChannelId::new("C1"))
            .await
            .unwrap();

        let ids: Vec<_> = snapshots.iter().map(|s| s.member_id.as_str()).collect();
        assert_eq!(ids, ["UA", "UB", "UBOT1"]);
        assert_eq!(snapshots[1].presence, PresenceState::InHuddle);
        assert!(snapshots[2].is_bot);
    }

    #[tokio::test]
    async fn failed_lookup_is_isolated() {
        let platform = Arc::new(InMemoryPlatform::default());
        platform.add_channel("C1", [
            person("UA", "Alice", PresenceState::Available),
            person("UB", "Bob", PresenceState::Available),
        ]);
        platform.set_lookup_failing("UA", true);

        let snapshots = fetcher(&platform)
            .fetch_members(&ChannelId::new("C1"))
            .await
            .unwrap();

        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].presence, PresenceState::Unknown);
        assert_eq!(snapshots[1].display_name, "Bob");
        assert_eq!(snapshots[1].presence, PresenceState::Available);
    }

    #[tokio::test]
    async fn listing_failure_fails_the_fetch() {
        let platform = Arc::new(InMemoryPlatform::default());
        platform.add_channel("C1", [person("UA", "Alice", PresenceState::Available)]);
        platform.set_channel_unavailable("C1", true);

        let err = fetcher(&platform)
            .fetch_members(&ChannelId::new("C1"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            crate::Error::Platform(PlatformError::ChannelUnavailable { .. })
        ));
    }
}
