//! Roster engine: monitored channels, throttled refreshes, expiry.

use std::{
    collections::BTreeSet,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use {
    async_trait::async_trait,
    futures::future::join_all,
    rollcall_channels::{ChatPlatform, EventSink, InboundEvent},
    rollcall_common::{ChannelId, MessageHandle},
    tokio::{
        task::JoinHandle,
        time::{Instant, MissedTickBehavior},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use rollcall_metrics::{counter, gauge, histogram, labels, roster as roster_metrics};

use crate::{
    Error, Result,
    command::RosterCommand,
    expiry::ExpiryToken,
    fetcher::Fetcher,
    lifecycle::{Lifecycle, Written},
    registry::{Epoch, MonitorEntry, Registry},
    render::Renderer,
    scheduler::{FinishOutcome, RunNowOutcome, Scheduler, Ticket, TriggerOutcome},
    types::{RosterNotification, RosterSettings, StartOutcome, StopReason},
};

/// Callback for roster notifications (alerts, start/stop).
pub type NotifyFn = Arc<dyn Fn(RosterNotification) + Send + Sync>;

/// The roster synchronization engine.
pub struct RosterService {
    platform: Arc<dyn ChatPlatform>,
    settings: RosterSettings,
    registry: Arc<Registry>,
    scheduler: Scheduler,
    fetcher: Fetcher,
    renderer: Renderer,
    lifecycle: Lifecycle,
    on_notify: Option<NotifyFn>,
    next_expiry_token: AtomicU64,
    shutdown: CancellationToken,
}

impl RosterService {
    pub fn new(platform: Arc<dyn ChatPlatform>, settings: RosterSettings) -> Arc<Self> {
        Self::with_config(platform, settings, None)
    }

    /// Create a roster service with a notification callback.
    pub fn with_notify(
        platform: Arc<dyn ChatPlatform>,
        settings: RosterSettings,
        on_notify: NotifyFn,
    ) -> Arc<Self> {
        Self::with_config(platform, settings, Some(on_notify))
    }

    pub fn with_config(
        platform: Arc<dyn ChatPlatform>,
        settings: RosterSettings,
        on_notify: Option<NotifyFn>,
    ) -> Arc<Self> {
        let registry = Arc::new(Registry::new());
        Arc::new(Self {
            fetcher: Fetcher::new(Arc::clone(&platform)),
            renderer: Renderer::new(settings.render.clone()),
            lifecycle: Lifecycle::new(
                Arc::clone(&platform),
                Arc::clone(&registry),
                settings.history_limit,
            ),
            platform,
            settings,
            registry,
            scheduler: Scheduler::new(),
            on_notify,
            next_expiry_token: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        })
    }

    fn notify(&self, notification: RosterNotification) {
        if let Some(ref notify_fn) = self.on_notify {
            notify_fn(notification);
        }
    }

    fn record_monitored(&self) {
        #[cfg(feature = "metrics")]
        gauge!(roster_metrics::MONITORED_CHANNELS).set(self.registry.len() as f64);
    }

    pub fn settings(&self) -> &RosterSettings {
        &self.settings
    }

    pub fn is_monitored(&self, channel_id: &ChannelId) -> bool {
        self.registry.is_monitored(channel_id)
    }

    pub fn all_monitored(&self) -> BTreeSet<ChannelId> {
        self.registry.all_monitored()
    }

    /// Handle of the live roster message of a monitored channel.
    pub fn active_message(&self, channel_id: &ChannelId) -> Option<MessageHandle> {
        let epoch = self.registry.epoch_of(channel_id)?;
        self.registry.active_message(channel_id, epoch).flatten()
    }

    /// When the channel's inactivity timer fires, if it is armed.
    pub fn expiry_deadline(&self, channel_id: &ChannelId) -> Option<Instant> {
        let epoch = self.registry.epoch_of(channel_id)?;
        self.registry
            .with_current(channel_id, epoch, |entry| entry.expiry.deadline())
            .flatten()
    }

    // ── Subscription ────────────────────────────────────────────────────

    /// Start monitoring `channel_id`, or renew it if already monitored.
    ///
    /// Re-arms the expiry timer and requests an immediate refresh. The
    /// refresh bypasses the throttle window, so every start or renewal
    /// re-reads the channel even if a refresh just ran. Returns without
    /// waiting for the refresh.
    pub fn start(self: &Arc<Self>, channel_id: &ChannelId) -> Result<StartOutcome> {
        if self.shutdown.is_cancelled() {
            return Err(Error::ShuttingDown);
        }

        let admission = self.registry.admit(channel_id);
        self.arm_expiry(channel_id, admission.epoch);
        self.refresh_now(channel_id);

        if admission.created {
            info!(channel_id = %channel_id, epoch = admission.epoch, "roster monitoring started");
            self.record_monitored();
            self.notify(RosterNotification::Started {
                channel_id: channel_id.clone(),
            });
            Ok(StartOutcome::Started)
        } else {
            debug!(channel_id = %channel_id, "roster monitoring renewed");
            Ok(StartOutcome::Renewed)
        }
    }

    /// Stop monitoring and delete the live message. Returns `false` if the
    /// channel was not monitored.
    pub async fn stop(&self, channel_id: &ChannelId, reason: StopReason) -> bool {
        match self.detach(channel_id) {
            Some(entry) => {
                self.teardown_entry(entry, reason).await;
                true
            },
            None => {
                debug!(channel_id = %channel_id, "stop ignored, channel not monitored");
                false
            },
        }
    }

    /// Remove all in-memory state of a channel. Platform cleanup is left to
    /// [`Self::teardown_entry`].
    fn detach(&self, channel_id: &ChannelId) -> Option<MonitorEntry> {
        let mut entry = self.registry.remove(channel_id)?;
        entry.expiry.cancel();
        self.scheduler.forget(channel_id);
        self.record_monitored();
        Some(entry)
    }

    async fn teardown_entry(&self, mut entry: MonitorEntry, reason: StopReason) {
        entry.expiry.cancel();
        self.lifecycle
            .teardown(&entry.channel_id, entry.active_message.take())
            .await;
        info!(channel_id = %entry.channel_id, reason = ?reason, "roster monitoring stopped");
        self.notify(RosterNotification::Stopped {
            channel_id: entry.channel_id,
            reason,
        });
    }

    // ── Expiry ──────────────────────────────────────────────────────────

    fn arm_expiry(self: &Arc<Self>, channel_id: &ChannelId, epoch: Epoch) {
        let Some(window) = self.settings.expiry.window() else {
            return;
        };
        let token = self.next_expiry_token.fetch_add(1, Ordering::Relaxed) + 1;
        let deadline = Instant::now() + window;

        let svc = Arc::clone(self);
        let channel = channel_id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            svc.expire(&channel, token).await;
        });

        let armed = self
            .registry
            .with_current(channel_id, epoch, |entry| {
                entry.expiry.arm(deadline, token, timer.abort_handle());
            })
            .is_some();
        if armed {
            debug!(channel_id = %channel_id, window_secs = window.as_secs(), "expiry armed");
        } else {
            timer.abort();
        }
    }

    async fn expire(&self, channel_id: &ChannelId, token: ExpiryToken) {
        let Some(entry) = self.registry.remove_expired(channel_id, token) else {
            debug!(channel_id = %channel_id, "stale expiry timer ignored");
            return;
        };
        self.scheduler.forget(channel_id);
        self.record_monitored();
        info!(channel_id = %channel_id, "roster expired after inactivity");

        #[cfg(feature = "metrics")]
        counter!(roster_metrics::EXPIRATIONS_TOTAL).increment(1);

        self.teardown_entry(entry, StopReason::Expired).await;
    }

    // ── Scheduling ──────────────────────────────────────────────────────

    /// Request a throttled refresh. Returns `false` if the channel is not
    /// monitored.
    pub fn trigger_refresh(self: &Arc<Self>, channel_id: &ChannelId) -> bool {
        if !self.registry.is_monitored(channel_id) {
            return false;
        }
        match self.scheduler.trigger(channel_id) {
            TriggerOutcome::Schedule(ticket) => self.spawn_window(channel_id, ticket),
            TriggerOutcome::Coalesced => {
                #[cfg(feature = "metrics")]
                counter!(roster_metrics::REFRESHES_COALESCED_TOTAL).increment(1);
            },
        }
        true
    }

    /// Request a throttled refresh of every monitored channel. Returns the
    /// number of channels triggered.
    pub fn trigger_refresh_all(self: &Arc<Self>) -> usize {
        self.registry
            .all_monitored()
            .iter()
            .filter(|channel_id| self.trigger_refresh(channel_id))
            .count()
    }

    /// Refresh right away unless a refresh is in flight, in which case a
    /// trailing one is queued.
    pub fn refresh_now(self: &Arc<Self>, channel_id: &ChannelId) -> bool {
        if !self.registry.is_monitored(channel_id) {
            return false;
        }
        match self.scheduler.run_now(channel_id) {
            RunNowOutcome::Run(ticket) => {
                let svc = Arc::clone(self);
                let channel = channel_id.clone();
                tokio::spawn(async move {
                    svc.execute(channel, ticket).await;
                });
            },
            RunNowOutcome::Coalesced => {
                #[cfg(feature = "metrics")]
                counter!(roster_metrics::REFRESHES_COALESCED_TOTAL).increment(1);
            },
        }
        true
    }

    fn spawn_window(self: &Arc<Self>, channel_id: &ChannelId, ticket: Ticket) {
        let svc = Arc::clone(self);
        let channel = channel_id.clone();
        let throttle = self.settings.throttle;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(throttle).await;
            if let Some(run) = svc.scheduler.timer_fired(&channel, ticket) {
                svc.execute(channel, run).await;
            }
        });
        self.scheduler
            .attach_timer(channel_id, ticket, timer.abort_handle());
    }

    async fn execute(self: &Arc<Self>, channel_id: ChannelId, ticket: Ticket) {
        if let Some(epoch) = self.registry.epoch_of(&channel_id) {
            self.refresh_once(&channel_id, epoch).await;
        }
        if let FinishOutcome::Schedule(next) = self.scheduler.finish(&channel_id, ticket) {
            self.spawn_window(&channel_id, next);
        }
    }

    // ── Refresh ─────────────────────────────────────────────────────────

    async fn refresh_once(&self, channel_id: &ChannelId, epoch: Epoch) {
        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();
        #[cfg(feature = "metrics")]
        counter!(roster_metrics::REFRESHES_TOTAL).increment(1);

        let result = self.render_and_write(channel_id, epoch).await;

        #[cfg(feature = "metrics")]
        histogram!(roster_metrics::REFRESH_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(Written::Skipped) => {
                debug!(channel_id = %channel_id, "refresh skipped, monitoring ended");
            },
            Ok(_) => self.record_success(channel_id, epoch),
            Err(e) => {
                warn!(channel_id = %channel_id, error = %e, "roster refresh failed");
                #[cfg(feature = "metrics")]
                counter!(roster_metrics::REFRESH_ERRORS_TOTAL, labels::REASON => e.reason())
                    .increment(1);
                self.record_failure(channel_id, epoch, &e).await;
            },
        }
    }

    async fn render_and_write(&self, channel_id: &ChannelId, epoch: Epoch) -> Result<Written> {
        let snapshots = self.fetcher.fetch_members(channel_id).await?;
        if !self.registry.is_current(channel_id, epoch) {
            return Ok(Written::Skipped);
        }
        let content = self.renderer.render(&snapshots);
        self.lifecycle.refresh(channel_id, epoch, &content).await
    }

    fn record_success(&self, channel_id: &ChannelId, epoch: Epoch) {
        let recovered = self
            .registry
            .with_current(channel_id, epoch, |entry| {
                let was_alerted = entry.alerted;
                entry.failures = 0;
                entry.alerted = false;
                was_alerted
            })
            .unwrap_or(false);

        if recovered {
            info!(channel_id = %channel_id, "roster refresh recovered");
            self.notify(RosterNotification::Recovered {
                channel_id: channel_id.clone(),
            });
        }
    }

    async fn record_failure(&self, channel_id: &ChannelId, epoch: Epoch, err: &Error) {
        let threshold = self.settings.failure_alert_threshold;
        let alert = self
            .registry
            .with_current(channel_id, epoch, |entry| {
                entry.failures = entry.failures.saturating_add(1);
                if entry.failures >= threshold && !entry.alerted {
                    entry.alerted = true;
                    Some((entry.failures, entry.active_message.clone()))
                } else {
                    None
                }
            })
            .flatten();

        let Some((failures, active)) = alert else {
            return;
        };

        error!(
            channel_id = %channel_id,
            failures,
            error = %err,
            "roster refresh keeps failing"
        );
        #[cfg(feature = "metrics")]
        counter!(roster_metrics::FAILURE_ALERTS_TOTAL).increment(1);

        self.notify(RosterNotification::RefreshFailing {
            channel_id: channel_id.clone(),
            failures,
            error: err.to_string(),
        });

        if let Some(handle) = active {
            let notice = self.renderer.render_failure(err);
            if let Err(e) = self
                .platform
                .update_message(channel_id, &handle, &notice)
                .await
            {
                debug!(channel_id = %channel_id, error = %e, "could not show failure notice");
            }
        }
    }

    // ── Operator input ──────────────────────────────────────────────────

    /// Handle the argument text of a roster slash command. Returns the
    /// acknowledgement shown to the invoking user.
    ///
    /// Platform cleanup on `off` runs in the background so the command can
    /// be acknowledged promptly.
    pub fn handle_command(self: &Arc<Self>, channel_id: &ChannelId, text: &str) -> String {
        match RosterCommand::parse(text) {
            RosterCommand::Stop => match self.detach(channel_id) {
                Some(entry) => {
                    let svc = Arc::clone(self);
                    tokio::spawn(async move {
                        svc.teardown_entry(entry, StopReason::Command).await;
                    });
                    "Roll call stopped.".into()
                },
                None => "No roll call is running in this channel.".into(),
            },
            RosterCommand::Start => match self.start(channel_id) {
                Ok(StartOutcome::Started) => match self.settings.expiry.window() {
                    Some(window) => format!(
                        "Taking roll call. It ends after {}s without another request.",
                        window.as_secs()
                    ),
                    None => "Taking roll call.".into(),
                },
                Ok(StartOutcome::Renewed) => "Roll call refreshed.".into(),
                Err(e) => format!("Cannot take roll call right now: {e}"),
            },
        }
    }

    /// The close button of a roster message was pressed.
    ///
    /// Stops the channel. When the channel is not monitored the message is a
    /// leftover from an earlier run and is deleted directly.
    pub async fn handle_close(&self, channel_id: &ChannelId, message: Option<&MessageHandle>) {
        if self.stop(channel_id, StopReason::Closed).await {
            return;
        }
        if let Some(handle) = message {
            info!(channel_id = %channel_id, handle = %handle, "close on orphaned roster message");
            self.lifecycle.retract(channel_id, handle).await;
        }
    }

    /// Adapter that lets a transport deliver [`InboundEvent`]s.
    pub fn event_sink(self: &Arc<Self>) -> Arc<dyn EventSink> {
        Arc::new(RosterEventSink {
            service: Arc::clone(self),
        })
    }

    // ── Background tasks ────────────────────────────────────────────────

    /// Spawn the periodic refresh of every monitored channel, if configured.
    /// The task ends on [`Self::shutdown`].
    pub fn spawn_ticker(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let period = self.settings.tick_interval?;
        let svc = Arc::clone(self);
        let cancel = self.shutdown.clone();

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let triggered = svc.trigger_refresh_all();
                        debug!(channels = triggered, "periodic roster tick");
                    }
                    () = cancel.cancelled() => break,
                }
            }
        }))
    }

    /// Stop accepting work, cancel every timer and, if configured, delete
    /// every live roster message. Returns the number of channels that were
    /// monitored.
    pub async fn shutdown(&self) -> usize {
        self.shutdown.cancel();
        self.scheduler.clear();
        let entries = self.registry.drain();
        self.record_monitored();
        let count = entries.len();

        if self.settings.teardown_on_shutdown {
            join_all(
                entries
                    .into_iter()
                    .map(|entry| self.teardown_entry(entry, StopReason::Shutdown)),
            )
            .await;
        } else {
            for mut entry in entries {
                entry.expiry.cancel();
            }
        }

        info!(channels = count, "roster service stopped");
        count
    }
}

/// [`EventSink`] backed by a [`RosterService`].
pub struct RosterEventSink {
    service: Arc<RosterService>,
}

#[async_trait]
impl EventSink for RosterEventSink {
    async fn dispatch(&self, event: InboundEvent) -> Option<String> {
        match event {
            InboundEvent::Command {
                command,
                channel_id,
                user_id,
                text,
            } => {
                info!(
                    command = %command,
                    channel_id = %channel_id,
                    user_id = ?user_id,
                    text = %text,
                    "roster command"
                );
                Some(self.service.handle_command(&channel_id, &text))
            },
            InboundEvent::Close {
                channel_id,
                message,
                user_id,
            } => {
                info!(channel_id = %channel_id, user_id = ?user_id, "roster close requested");
                self.service.handle_close(&channel_id, message.as_ref()).await;
                None
            },
            InboundEvent::PresenceChanged { user_id } => {
                let triggered = self.service.trigger_refresh_all();
                debug!(user_id = ?user_id, channels = triggered, "presence changed");
                None
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
            PresenceState,
            memory::{InMemoryPlatform, person},
        },
        std::{sync::Mutex, time::Duration},
    };

    fn c1() -> ChannelId {
        ChannelId::new("C1")
    }

    fn make_svc(platform: &Arc<InMemoryPlatform>) -> Arc<RosterService> {
        RosterService::new(
            Arc::clone(platform) as Arc<dyn ChatPlatform>,
            RosterSettings::default(),
        )
    }

    fn platform() -> Arc<InMemoryPlatform> {
        let platform = Arc::new(InMemoryPlatform::default());
        platform.add_channel("C1", [person("UA", "Alice", PresenceState::Available)]);
        platform
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_posts_and_records_handle() {
        let platform = platform();
        let svc = make_svc(&platform);

        assert_eq!(svc.start(&c1()).unwrap(), StartOutcome::Started);
        settle().await;

        let handle = svc.active_message(&c1()).unwrap();
        let messages = platform.bot_messages("C1");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].handle, handle);
        assert_eq!(messages[0].content.text, "Alice?");
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_renews() {
        let platform = platform();
        let svc = make_svc(&platform);
        svc.start(&c1()).unwrap();
        settle().await;

        assert_eq!(svc.start(&c1()).unwrap(), StartOutcome::Renewed);
        settle().await;

        assert_eq!(platform.calls().posts, 1);
        assert_eq!(platform.calls().updates, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_on_unmonitored_channel_is_noop() {
        let platform = platform();
        let svc = make_svc(&platform);

        assert!(!svc.stop(&c1(), StopReason::Command).await);
        assert_eq!(platform.calls().deletes, 0);
        assert_eq!(platform.calls().history, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_on_unmonitored_channel_is_ignored() {
        let platform = platform();
        let svc = make_svc(&platform);

        assert!(!svc.trigger_refresh(&c1()));
        assert!(!svc.refresh_now(&c1()));
        assert_eq!(svc.trigger_refresh_all(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn command_text_drives_start_and_stop() {
        let platform = platform();
        let svc = make_svc(&platform);

        assert_eq!(svc.handle_command(&c1(), ""), "Taking roll call.");
        settle().await;
        assert!(svc.is_monitored(&c1()));

        assert_eq!(svc.handle_command(&c1(), "off"), "Roll call stopped.");
        settle().await;
        assert!(!svc.is_monitored(&c1()));
        assert!(platform.bot_messages("C1").is_empty());

        assert_eq!(
            svc.handle_command(&c1(), "off"),
            "No roll call is running in this channel."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn close_on_orphaned_message_deletes_it() {
        let platform = platform();
        let svc = make_svc(&platform);
        let orphan = platform.seed_message("C1", "UBOT", "Alice?");

        svc.handle_close(&c1(), Some(&orphan)).await;

        assert!(platform.bot_messages("C1").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn event_sink_routes_events() {
        let platform = platform();
        let svc = make_svc(&platform);
        let sink = svc.event_sink();

        let reply = sink
            .dispatch(InboundEvent::Command {
                command: "/tally".into(),
                channel_id: c1(),
                user_id: None,
                text: String::new(),
            })
            .await;
        assert_eq!(reply.as_deref(), Some("Taking roll call."));
        settle().await;

        platform.upsert_member(person("UB", "Bob", PresenceState::Available));
        assert!(
            sink.dispatch(InboundEvent::PresenceChanged { user_id: None })
                .await
                .is_none()
        );
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(platform.calls().updates, 1);

        sink.dispatch(InboundEvent::Close {
            channel_id: c1(),
            message: svc.active_message(&c1()),
            user_id: None,
        })
        .await;
        assert!(!svc.is_monitored(&c1()));
        assert!(platform.bot_messages("C1").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_refreshes_until_shutdown() {
        let platform = platform();
        let svc = RosterService::new(
            Arc::clone(&platform) as Arc<dyn ChatPlatform>,
            RosterSettings {
                tick_interval: Some(Duration::from_secs(10)),
                ..RosterSettings::default()
            },
        );
        svc.start(&c1()).unwrap();
        let ticker = svc.spawn_ticker().unwrap();
        settle().await;

        // Ticks at 10s and 20s, each followed by a 3s window.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(platform.calls().updates, 2);

        assert_eq!(svc.shutdown().await, 1);
        ticker.await.unwrap();
        assert!(platform.bot_messages("C1").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn start_after_shutdown_is_rejected() {
        let platform = platform();
        let svc = make_svc(&platform);
        svc.shutdown().await;

        assert!(matches!(svc.start(&c1()), Err(Error::ShuttingDown)));
        assert!(!svc.is_monitored(&c1()));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_without_teardown_keeps_messages() {
        let platform = platform();
        let svc = RosterService::new(
            Arc::clone(&platform) as Arc<dyn ChatPlatform>,
            RosterSettings {
                teardown_on_shutdown: false,
                ..RosterSettings::default()
            },
        );
        svc.start(&c1()).unwrap();
        settle().await;

        svc.shutdown().await;
        assert!(svc.all_monitored().is_empty());
        assert_eq!(platform.bot_messages("C1").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn notifications_follow_start_and_stop() {
        let platform = platform();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let svc = RosterService::with_notify(
            Arc::clone(&platform) as Arc<dyn ChatPlatform>,
            RosterSettings::default(),
            Arc::new(move |n: RosterNotification| sink.lock().unwrap().push(n)),
        );

        svc.start(&c1()).unwrap();
        settle().await;
        svc.stop(&c1(), StopReason::Command).await;

        assert_eq!(*seen.lock().unwrap(), vec![
            RosterNotification::Started { channel_id: c1() },
            RosterNotification::Stopped {
                channel_id: c1(),
                reason: StopReason::Command,
            },
        ]);
    }
}
