use serde::{Deserialize, Serialize};

/// Platform-neutral building block of a structured roster message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RosterBlock {
    /// Title line.
    Header { text: String },
    /// One present member.
    Member { name: String },
    /// Shown instead of members when nobody is present.
    Placeholder { text: String },
    /// Status or failure notice.
    Notice { text: String },
    /// Interactive button that stops monitoring the channel.
    CloseButton { label: String },
}

/// Rendered roster, ready to be posted or edited in place.
///
/// `text` is always set and doubles as notification fallback when `blocks`
/// is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RosterContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<RosterBlock>,
}

impl RosterContent {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            blocks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_blocks(mut self, blocks: Vec<RosterBlock>) -> Self {
        self.blocks = blocks;
        self
    }

    #[must_use]
    pub fn is_structured(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// Names of the members listed in `blocks`.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|block| match block {
            RosterBlock::Member { name } => Some(name.as_str()),
            _ => None,
        })
    }
}
