//! Translation of Socket Mode callbacks into [`InboundEvent`]s.

use {
    rollcall_channels::InboundEvent,
    rollcall_common::{ChannelId, MemberId, MessageHandle},
    serde_json::Value,
};

use crate::blocks::CLOSE_ACTION_ID;

/// Event types that may change who is present.
pub const PRESENCE_EVENTS: &[&str] = &["user_huddle_changed", "user_change"];

fn non_empty(s: &str) -> Option<&str> {
    Some(s).filter(|s| !s.is_empty())
}

/// Fields of a slash command invocation.
#[derive(Debug, Clone, Copy)]
pub struct SlashCommand<'a> {
    pub command: &'a str,
    pub channel_id: &'a str,
    pub user_id: &'a str,
    pub text: &'a str,
}

impl SlashCommand<'_> {
    /// `commands` lists the slash commands this app answers to.
    pub fn to_event(&self, commands: &[String]) -> Option<InboundEvent> {
        if !commands.iter().any(|c| c.eq_ignore_ascii_case(self.command)) {
            return None;
        }
        Some(InboundEvent::Command {
            command: self.command.to_string(),
            channel_id: ChannelId::new(non_empty(self.channel_id)?),
            user_id: non_empty(self.user_id).map(MemberId::new),
            text: self.text.to_string(),
        })
    }
}

/// Fields of a `block_actions` interaction.
#[derive(Debug, Clone, Default)]
pub struct ButtonPress<'a> {
    pub channel_id: Option<&'a str>,
    pub message_ts: Option<&'a str>,
    pub user_id: Option<&'a str>,
    pub action_ids: Vec<&'a str>,
}

impl ButtonPress<'_> {
    /// A close event if the roster's close button was among the actions.
    pub fn to_event(&self) -> Option<InboundEvent> {
        if !self.action_ids.contains(&CLOSE_ACTION_ID) {
            return None;
        }
        Some(InboundEvent::Close {
            channel_id: ChannelId::new(self.channel_id.and_then(non_empty)?),
            message: self.message_ts.and_then(non_empty).map(MessageHandle::new),
            user_id: self.user_id.and_then(non_empty).map(MemberId::new),
        })
    }
}

/// A presence event for an Events API body whose `type` is one of
/// [`PRESENCE_EVENTS`].
pub fn presence_event(event: &Value) -> Option<InboundEvent> {
    let kind = event.get("type").and_then(Value::as_str)?;
    if !PRESENCE_EVENTS.contains(&kind) {
        return None;
    }
    // `user` is an object for user events and a bare id elsewhere.
    let user_id = event
        .pointer("/user/id")
        .or_else(|| event.get("user"))
        .and_then(Value::as_str)
        .and_then(non_empty)
        .map(MemberId::new);
    Some(InboundEvent::PresenceChanged { user_id })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn commands() -> Vec<String> {
        vec!["/tally".into(), "/bueller".into()]
    }

    fn slash(command: &'static str, text: &'static str) -> SlashCommand<'static> {
        SlashCommand {
            command,
            channel_id: "C1",
            user_id: "U1",
            text,
        }
    }

    #[test]
    fn slash_command_becomes_command_event() {
        assert_eq!(
            slash("/bueller", "off").to_event(&commands()),
            Some(InboundEvent::Command {
                command: "/bueller".into(),
                channel_id: ChannelId::new("C1"),
                user_id: Some(MemberId::new("U1")),
                text: "off".into(),
            })
        );
    }

    #[test]
    fn command_names_match_case_insensitively() {
        assert!(slash("/TALLY", "").to_event(&commands()).is_some());
    }

    #[test]
    fn foreign_slash_command_is_ignored() {
        assert_eq!(slash("/weather", "").to_event(&commands()), None);
    }

    #[test]
    fn command_without_channel_is_ignored() {
        let command = SlashCommand {
            channel_id: "",
            ..slash("/tally", "")
        };
        assert_eq!(command.to_event(&commands()), None);
    }

    #[test]
    fn close_button_becomes_close_event() {
        let press = ButtonPress {
            channel_id: Some("C1"),
            message_ts: Some("1.0"),
            user_id: Some("U1"),
            action_ids: vec!["other", CLOSE_ACTION_ID],
        };
        assert_eq!(
            press.to_event(),
            Some(InboundEvent::Close {
                channel_id: ChannelId::new("C1"),
                message: Some(MessageHandle::new("1.0")),
                user_id: Some(MemberId::new("U1")),
            })
        );
    }

    #[test]
    fn other_buttons_are_ignored() {
        let press = ButtonPress {
            channel_id: Some("C1"),
            action_ids: vec!["something_else"],
            ..ButtonPress::default()
        };
        assert_eq!(press.to_event(), None);
    }

    #[test]
    fn close_without_channel_is_ignored() {
        let press = ButtonPress {
            action_ids: vec![CLOSE_ACTION_ID],
            ..ButtonPress::default()
        };
        assert_eq!(press.to_event(), None);
    }

    #[test]
    fn huddle_and_user_changes_are_presence_events() {
        for kind in PRESENCE_EVENTS {
            let event = json!({ "type": kind, "user": { "id": "U7" } });
            assert_eq!(
                presence_event(&event),
                Some(InboundEvent::PresenceChanged {
                    user_id: Some(MemberId::new("U7"))
                })
            );
        }

        let bare = json!({ "type": "user_huddle_changed", "user": "U8" });
        assert_eq!(
            presence_event(&bare),
            Some(InboundEvent::PresenceChanged {
                user_id: Some(MemberId::new("U8"))
            })
        );

        let message = json!({ "type": "message", "user": "U7" });
        assert_eq!(presence_event(&message), None);
    }
}
