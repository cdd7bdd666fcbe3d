//! Block Kit conversion of [`RosterBlock`]s.

use {
    rollcall_channels::RosterBlock,
    serde_json::{Value, json},
    slack_morphism::prelude::SlackBlock,
    tracing::warn,
};

/// `action_id` of the close button, matched by the Socket Mode listener.
pub const CLOSE_ACTION_ID: &str = "rollcall_close";

/// Slack rejects messages with more blocks than this.
const MAX_BLOCKS: usize = 50;

/// Slack truncates section text beyond this many characters.
const MAX_SECTION_CHARS: usize = 3000;

/// Escape the three characters Slack treats as control sequences in mrkdwn.
pub fn escape_mrkdwn(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn section(text: String) -> Value {
    json!({ "type": "section", "text": { "type": "mrkdwn", "text": text } })
}

fn context(text: String) -> Value {
    json!({ "type": "context", "elements": [{ "type": "mrkdwn", "text": text }] })
}

/// Convert roster blocks to Block Kit JSON.
///
/// One section per member while the message fits the block limit. Larger
/// rosters are packed into as few sections as the per-section text limit
/// allows.
pub fn to_block_kit(blocks: &[RosterBlock]) -> Vec<Value> {
    let members: Vec<&str> = blocks
        .iter()
        .filter_map(|block| match block {
            RosterBlock::Member { name } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    let pack_members = blocks.len() > MAX_BLOCKS;

    let mut out = Vec::with_capacity(blocks.len().min(MAX_BLOCKS));
    let mut members_emitted = false;
    for block in blocks {
        match block {
            RosterBlock::Header { text } => out.push(json!({
                "type": "header",
                "text": { "type": "plain_text", "text": text, "emoji": true },
            })),
            RosterBlock::Member { name } if !pack_members => {
                out.push(section(format!("{}?", escape_mrkdwn(name))));
            },
            RosterBlock::Member { .. } => {
                if !members_emitted {
                    out.extend(packed_sections(&members));
                    members_emitted = true;
                }
            },
            RosterBlock::Placeholder { text } => out.push(context(escape_mrkdwn(text))),
            RosterBlock::Notice { text } => {
                out.push(context(format!(":warning: {}", escape_mrkdwn(text))));
            },
            RosterBlock::CloseButton { label } => out.push(json!({
                "type": "actions",
                "elements": [{
                    "type": "button",
                    "action_id": CLOSE_ACTION_ID,
                    "text": { "type": "plain_text", "text": label },
                    "value": "close",
                }],
            })),
        }
    }
    out
}

/// Roster blocks as Slack client blocks. `None` when the generated JSON does
/// not fit the block model; the message then goes out as text only.
pub fn to_slack_blocks(blocks: &[RosterBlock]) -> Option<Vec<SlackBlock>> {
    serde_json::from_value(Value::Array(to_block_kit(blocks)))
        .map_err(|e| warn!(error = %e, "failed to convert roster blocks, falling back to text"))
        .ok()
}

fn packed_sections(names: &[&str]) -> Vec<Value> {
    let mut sections = Vec::new();
    let mut current = String::new();
    for name in names {
        let entry = format!("{}?", escape_mrkdwn(name));
        if !current.is_empty() && current.len() + 1 + entry.len() > MAX_SECTION_CHARS {
            sections.push(section(std::mem::take(&mut current)));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&entry);
    }
    if !current.is_empty() {
        sections.push(section(current));
    }
    sections
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str) -> RosterBlock {
        RosterBlock::Member { name: name.into() }
    }

    #[test]
    fn generated_blocks_fit_the_client_model() {
        let blocks = to_slack_blocks(&[
            RosterBlock::Header {
                text: "Who's here".into(),
            },
            member("Alice"),
            RosterBlock::Placeholder {
                text: "Nobody yet".into(),
            },
            RosterBlock::CloseButton {
                label: "Close".into(),
            },
        ])
        .unwrap();
        assert_eq!(blocks.len(), 4);
    }

    #[test]
    fn roster_maps_to_header_sections_and_button() {
        let blocks = to_block_kit(&[
            RosterBlock::Header {
                text: "Who's here".into(),
            },
            member("Alice"),
            member("Bob"),
            RosterBlock::CloseButton {
                label: "Close".into(),
            },
        ]);

        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0]["type"], "header");
        assert_eq!(blocks[1]["text"]["text"], "Alice?");
        assert_eq!(blocks[2]["text"]["text"], "Bob?");
        assert_eq!(blocks[3]["elements"][0]["action_id"], CLOSE_ACTION_ID);
    }

    #[test]
    fn placeholder_and_notice_become_context() {
        let blocks = to_block_kit(&[
            RosterBlock::Placeholder {
                text: "Nobody here".into(),
            },
            RosterBlock::Notice {
                text: "stuck".into(),
            },
        ]);
        assert_eq!(blocks[0]["type"], "context");
        assert_eq!(blocks[0]["elements"][0]["text"], "Nobody here");
        assert_eq!(blocks[1]["elements"][0]["text"], ":warning: stuck");
    }

    #[test]
    fn member_names_are_escaped() {
        let blocks = to_block_kit(&[member("<b>Tom & Jerry</b>")]);
        assert_eq!(
            blocks[0]["text"]["text"],
            "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;?"
        );
    }

    #[test]
    fn large_rosters_stay_within_block_limit() {
        let mut input = vec![RosterBlock::Header {
            text: "Who's here".into(),
        }];
        input.extend((0..120).map(|i| member(&format!("member-{i:03}"))));
        input.push(RosterBlock::CloseButton {
            label: "Close".into(),
        });

        let blocks = to_block_kit(&input);
        assert!(blocks.len() <= MAX_BLOCKS);
        assert_eq!(blocks[0]["type"], "header");
        assert_eq!(blocks.last().unwrap()["type"], "actions");

        let packed: Vec<&str> = blocks
            .iter()
            .filter(|b| b["type"] == "section")
            .map(|b| b["text"]["text"].as_str().unwrap())
            .collect();
        assert!(packed.iter().all(|text| text.len() <= MAX_SECTION_CHARS));
        let names: usize = packed.iter().map(|text| text.split(' ').count()).sum();
        assert_eq!(names, 120);
    }
}
