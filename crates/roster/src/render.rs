//! Snapshot to message rendering.
//!
//! Output depends only on the set of snapshots, never on their order:
//! members are sorted by display name, ties broken by member id.

use {
    rollcall_channels::{PresenceState, RosterBlock, RosterContent},
    rollcall_config::{RenderMode, RosterConfig},
};

use crate::{Error, fetcher::MemberSnapshot};

/// Label of the close button in blocks mode.
pub const CLOSE_LABEL: &str = "Close";

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub mode: RenderMode,
    pub title: String,
    pub placeholder: String,
    pub close_button: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&RosterConfig::default())
    }
}

impl From<&RosterConfig> for RenderOptions {
    fn from(config: &RosterConfig) -> Self {
        Self {
            mode: config.render_mode,
            title: config.title.clone(),
            placeholder: config.placeholder.clone(),
            close_button: config.close_button,
        }
    }
}

/// Members that appear in the roster: humans that are available, sorted.
pub fn roster_view(snapshots: &[MemberSnapshot]) -> Vec<&MemberSnapshot> {
    let mut view: Vec<&MemberSnapshot> = snapshots
        .iter()
        .filter(|s| !s.is_bot && s.presence == PresenceState::Available)
        .collect();
    view.sort_by(|a, b| {
        a.display_name
            .cmp(&b.display_name)
            .then_with(|| a.member_id.cmp(&b.member_id))
    });
    view
}

pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn render(&self, snapshots: &[MemberSnapshot]) -> RosterContent {
        let view = roster_view(snapshots);

        let text = if view.is_empty() {
            self.options.placeholder.clone()
        } else {
            view.iter()
                .map(|s| format!("{}?", s.display_name))
                .collect::<Vec<_>>()
                .join(" ")
        };

        match self.options.mode {
            RenderMode::Text => RosterContent::text(text),
            RenderMode::Blocks => {
                let mut blocks = Vec::with_capacity(view.len() + 2);
                blocks.push(RosterBlock::Header {
                    text: self.options.title.clone(),
                });
                if view.is_empty() {
                    blocks.push(RosterBlock::Placeholder {
                        text: self.options.placeholder.clone(),
                    });
                } else {
                    blocks.extend(view.iter().map(|s| RosterBlock::Member {
                        name: s.display_name.clone(),
                    }));
                }
                self.push_close(&mut blocks);
                RosterContent::text(text).with_blocks(blocks)
            },
        }
    }

    /// Notice shown in place of the roster while refreshes keep failing.
    pub fn render_failure(&self, error: &Error) -> RosterContent {
        let text = format!("Roster is not updating: {error}");
        match self.options.mode {
            RenderMode::Text => RosterContent::text(text),
            RenderMode::Blocks => {
                let mut blocks = vec![
                    RosterBlock::Header {
                        text: self.options.title.clone(),
                    },
                    RosterBlock::Notice { text: text.clone() },
                ];
                self.push_close(&mut blocks);
                RosterContent::text(text).with_blocks(blocks)
            },
        }
    }

    fn push_close(&self, blocks: &mut Vec<RosterBlock>) {
        if self.options.close_button {
            blocks.push(RosterBlock::CloseButton {
                label: CLOSE_LABEL.into(),
            });
        }
    }
}
