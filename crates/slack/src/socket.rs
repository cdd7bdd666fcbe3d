//! Socket Mode connection handler for Slack.
//!
//! Uses slack-morphism's socket mode listener to receive slash commands,
//! button presses and presence events via WebSocket without requiring a
//! public HTTP endpoint. The listener reconnects on its own; slash command
//! acknowledgements carry the reply produced by the [`EventSink`].

use std::sync::Arc;

use {
    rollcall_channels::{EventSink, InboundEvent},
    serde_json::Value,
    slack_morphism::prelude::*,
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

#[cfg(feature = "metrics")]
use rollcall_metrics::{counter, labels, slack as slack_metrics};

use crate::{
    Error, Result,
    api::SlackApi,
    events::{ButtonPress, SlashCommand, presence_event},
};

type CallbackResult<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Shared state for socket mode callbacks.
#[derive(Clone)]
struct ListenerState {
    sink: Arc<dyn EventSink>,
    commands: Vec<String>,
}

impl ListenerState {
    /// Slash commands are answered inline since their reply rides on the
    /// acknowledgement.
    async fn on_command(&self, command: SlashCommand<'_>) -> String {
        record_envelope("slash_commands");
        match command.to_event(&self.commands) {
            Some(event) => self.sink.dispatch(event).await.unwrap_or_default(),
            None => {
                debug!(command = command.command, "ignoring foreign slash command");
                format!("{} is not handled by this app.", command.command)
            },
        }
    }

    fn on_button(&self, press: &ButtonPress<'_>) -> bool {
        record_envelope("interactive");
        self.dispatch_later(press.to_event())
    }

    fn on_event(&self, event: &Value) -> bool {
        record_envelope("events_api");
        self.dispatch_later(presence_event(event))
    }

    /// Hand the event to the sink in the background, so slow platform calls
    /// never delay the acknowledgement.
    fn dispatch_later(&self, event: Option<InboundEvent>) -> bool {
        let Some(event) = event else {
            return false;
        };
        debug!(kind = event.kind(), "dispatching socket mode event");
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            sink.dispatch(event).await;
        });
        true
    }
}

/// Socket Mode listener for one Slack app.
pub struct SocketModeListener {
    api: Arc<SlackApi>,
    state: ListenerState,
}

impl SocketModeListener {
    pub fn new(api: Arc<SlackApi>, sink: Arc<dyn EventSink>, commands: Vec<String>) -> Self {
        Self {
            api,
            state: ListenerState { sink, commands },
        }
    }

    /// Run the listener in the background until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run(cancel).await {
                error!(error = %e, "socket mode listener failed");
            }
        })
    }

    /// Connect and serve events until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        let listener_env = Arc::new(
            SlackClientEventsListenerEnvironment::new(Arc::clone(self.api.client()))
                .with_error_handler(handle_listener_error)
                .with_user_state(self.state),
        );

        let listener = SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_env,
            callbacks,
        );

        listener
            .listen_for(self.api.app_token())
            .await
            .map_err(|e| Error::client("apps.connections.open", e))?;
        info!("socket mode connected");

        tokio::select! {
            exit_code = listener.serve() => {
                info!(exit_code, "socket mode listener stopped");
            },
            () = cancel.cancelled() => {
                info!("socket mode shutting down");
                listener.shutdown().await;
            },
        }
        Ok(())
    }
}

async fn listener_state(states: &SlackClientEventsUserState) -> CallbackResult<ListenerState> {
    let guard = states.read().await;
    guard
        .get_user_state::<ListenerState>()
        .cloned()
        .ok_or_else(|| "missing socket mode state".into())
}

async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> CallbackResult<SlackCommandEventResponse> {
    let state = listener_state(&states).await?;
    let reply = state
        .on_command(SlashCommand {
            command: &event.command.0,
            channel_id: &event.channel_id.0,
            user_id: &event.user_id.0,
            text: event.text.as_deref().unwrap_or_default(),
        })
        .await;

    Ok(SlackCommandEventResponse::new(
        SlackMessageContent::new().with_text(reply),
    ))
}

async fn handle_interaction_event(
    event: SlackInteractionEvent,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> CallbackResult<()> {
    let state = listener_state(&states).await?;

    let SlackInteractionEvent::BlockActions(ev) = event else {
        debug!("ignoring interaction event");
        return Ok(());
    };
    let press = ButtonPress {
        channel_id: ev.channel.as_ref().map(|c| c.id.0.as_str()),
        message_ts: ev.message.as_ref().map(|m| m.origin.ts.0.as_str()),
        user_id: ev.user.as_ref().map(|u| u.id.0.as_str()),
        action_ids: ev
            .actions
            .iter()
            .flatten()
            .map(|action| action.action_id.0.as_str())
            .collect(),
    };
    if !state.on_button(&press) {
        debug!(actions = ?press.action_ids, "ignoring block actions");
    }
    Ok(())
}

async fn handle_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> CallbackResult<()> {
    let state = listener_state(&states).await?;

    // Huddle changes have no typed event body; match on the wire type.
    let body = serde_json::to_value(&event.event)?;
    if !state.on_event(&body) {
        debug!(
            kind = body.get("type").and_then(serde_json::Value::as_str).unwrap_or_default(),
            "ignoring event callback type"
        );
    }
    Ok(())
}

fn handle_listener_error(
    err: Box<dyn std::error::Error + Send + Sync>,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> HttpStatusCode {
    warn!(error = %err, "slack socket mode error");
    HttpStatusCode::OK
}

fn record_envelope(kind: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(slack_metrics::ENVELOPES_TOTAL, labels::ENVELOPE_TYPE => kind).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}
