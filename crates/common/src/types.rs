//! Opaque identifiers handed out by the chat platform.
//!
//! The engine never interprets these values; it only compares, hashes and
//! echoes them back to the platform.

use {
    serde::{Deserialize, Serialize},
    std::fmt,
};

use crate::{Error, Result};

macro_rules! platform_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw platform identifier without validation.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Validate and wrap a user-supplied identifier.
            pub fn parse(raw: &str) -> Result<Self> {
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
                    return Err(Error::invalid_id($kind, raw));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

platform_id!(
    /// A chat channel (Slack conversation id such as `C0123ABCD`).
    ChannelId,
    "channel"
);

platform_id!(
    /// A channel member (Slack user id such as `U0123ABCD`).
    MemberId,
    "member"
);

platform_id!(
    /// Reference to a message previously created by the bot. On Slack this
    /// is the message `ts`.
    MessageHandle,
    "message"
);

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_accepts_plain_ids() {
        let id = ChannelId::parse("  C123 ").unwrap();
        assert_eq!(id.as_str(), "C123");
    }

    #[test]
    fn parse_rejects_empty_and_inner_whitespace() {
        assert!(ChannelId::parse("").is_err());
        assert!(MemberId::parse("U1 U2").is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let handle = MessageHandle::new("1700000000.000100");
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, "\"1700000000.000100\"");
    }
}
