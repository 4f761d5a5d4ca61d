//! Identifier newtypes for channels, messages and local sends

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::util::normalize_text_option;

/// Identifier of the channel that owns a timeline
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChannelId(String);

impl ChannelId {
    /// Create a channel ID, rejecting empty or whitespace-only values
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        normalize_text_option(Some(raw.into()))
            .map(Self)
            .ok_or_else(|| Error::InvalidInput("channel id must not be empty".to_string()))
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChannelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ChannelId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ChannelId> for String {
    fn from(value: ChannelId) -> Self {
        value.0
    }
}

/// Server-assigned message identifier, stable once a message is confirmed
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Client-generated correlation id for a locally originated message
///
/// Issued at send time and echoed back by the backend, so the pending copy and
/// the confirmed copy of the same message can be matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientToken(String);

impl ClientToken {
    /// Generate a new token using UUID v7 (time-sortable)
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ClientToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_id_rejects_blank() {
        assert!(ChannelId::new("   ").is_err());
        assert!("".parse::<ChannelId>().is_err());
    }

    #[test]
    fn test_channel_id_trims() {
        let id = ChannelId::new("  general ").unwrap();
        assert_eq!(id.as_str(), "general");
    }

    #[test]
    fn test_channel_id_deserialize_validates() {
        let err = serde_json::from_str::<ChannelId>("\" \"");
        assert!(err.is_err());
        let ok: ChannelId = serde_json::from_str("\"general\"").unwrap();
        assert_eq!(ok.to_string(), "general");
    }

    #[test]
    fn test_client_token_unique() {
        let a = ClientToken::generate();
        let b = ClientToken::generate();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }
}
