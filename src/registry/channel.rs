//! Channel identifiers
//!
//! A channel is the caller-chosen topic string that groups ingested events
//! and their live subscribers. Channels are never provisioned: they exist as
//! soon as something is ingested into or subscribed to them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::ChannelError;

/// Maximum channel length in bytes
pub const MAX_CHANNEL_LEN: usize = 256;

/// Validated channel identifier
///
/// Cheap to clone (reference counted). Construct with [`ChannelId::parse`];
/// the registry and store only ever see validated identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId(Arc<str>);

impl ChannelId {
    /// Validate and wrap a channel name
    ///
    /// Rejects empty names, names longer than [`MAX_CHANNEL_LEN`], and names
    /// containing `/` or control characters.
    pub fn parse(name: impl AsRef<str>) -> Result<Self, ChannelError> {
        let name = name.as_ref();

        if name.is_empty() {
            return Err(ChannelError::Empty);
        }
        if name.len() > MAX_CHANNEL_LEN {
            return Err(ChannelError::TooLong {
                len: name.len(),
                max: MAX_CHANNEL_LEN,
            });
        }
        if let Some(c) = name.chars().find(|c| *c == '/' || c.is_control()) {
            return Err(ChannelError::InvalidChar(c));
        }

        Ok(Self(Arc::from(name)))
    }

    /// Channel name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChannelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ChannelId {
    type Error = ChannelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ChannelId> for String {
    fn from(value: ChannelId) -> Self {
        value.0.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let channel = ChannelId::parse("demo").unwrap();
        assert_eq!(channel.as_str(), "demo");
        assert_eq!(channel.to_string(), "demo");

        // Anything printable goes, including spaces and unicode
        assert!(ChannelId::parse("orders eu-west").is_ok());
        assert!(ChannelId::parse("café").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(ChannelId::parse(""), Err(ChannelError::Empty)));
    }

    #[test]
    fn test_parse_too_long() {
        let name = "a".repeat(MAX_CHANNEL_LEN + 1);
        assert!(matches!(
            ChannelId::parse(&name),
            Err(ChannelError::TooLong { .. })
        ));

        let name = "a".repeat(MAX_CHANNEL_LEN);
        assert!(ChannelId::parse(&name).is_ok());
    }

    #[test]
    fn test_parse_invalid_chars() {
        assert!(matches!(
            ChannelId::parse("a/b"),
            Err(ChannelError::InvalidChar('/'))
        ));
        assert!(matches!(
            ChannelId::parse("a\nb"),
            Err(ChannelError::InvalidChar('\n'))
        ));
    }

    #[test]
    fn test_serde_validates() {
        let channel: ChannelId = serde_json::from_str("\"demo\"").unwrap();
        assert_eq!(channel.as_str(), "demo");
        assert_eq!(serde_json::to_string(&channel).unwrap(), "\"demo\"");

        assert!(serde_json::from_str::<ChannelId>("\"\"").is_err());
    }
}
