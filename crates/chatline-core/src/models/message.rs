//! Message record model

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::ids::{ChannelId, ClientToken, MessageId};

/// Lifecycle state of a timeline entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Sent locally, not yet acknowledged by the backend
    Pending,
    /// Acknowledged by the backend
    #[default]
    Succeeded,
    /// Send attempt failed; can be retried or deleted
    Failed,
}

/// Rendering category of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    File,
    Admin,
    Unknown,
}

/// Kind-specific message content. Opaque to the timeline engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MessagePayload {
    Text {
        body: String,
    },
    File {
        name: String,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        mime_type: Option<String>,
        #[serde(default)]
        size: Option<u64>,
    },
    Admin {
        body: String,
    },
    #[serde(other)]
    Unknown,
}

impl MessagePayload {
    /// Convenience constructor for a plain text payload
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Text { .. } => MessageKind::Text,
            Self::File { .. } => MessageKind::File,
            Self::Admin { .. } => MessageKind::Admin,
            Self::Unknown => MessageKind::Unknown,
        }
    }

    /// Single-line preview, truncated to `max_len` characters
    #[must_use]
    pub fn preview(&self, max_len: usize) -> String {
        let text = match self {
            Self::Text { body } | Self::Admin { body } => body.lines().next().unwrap_or(""),
            Self::File { name, .. } => name.as_str(),
            Self::Unknown => "(unsupported message)",
        };
        text.chars().take(max_len).collect()
    }
}

/// Identity of a rendered row
///
/// Rows created by a local send are keyed by their client token for their whole
/// life, so a row keeps its identity when its pending record is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum RowKey {
    Message(MessageId),
    Local(ClientToken),
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(id) => write!(f, "message:{id}"),
            Self::Local(token) => write!(f, "local:{token}"),
        }
    }
}

/// One timeline entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Server identifier, absent until confirmed
    #[serde(default)]
    pub id: Option<MessageId>,
    /// Owning channel
    pub channel_id: ChannelId,
    /// Creation timestamp (Unix ms), the primary sort key
    pub created_at: i64,
    /// Last edit timestamp (Unix ms)
    #[serde(default)]
    pub updated_at: Option<i64>,
    /// Correlation id for locally originated messages
    #[serde(default)]
    pub client_token: Option<ClientToken>,
    #[serde(default)]
    pub status: MessageStatus,
    /// Author, compared against the configured current user
    #[serde(default)]
    pub sender_id: Option<String>,
    pub payload: MessagePayload,
    /// Thread parent; replies never enter the main timeline
    #[serde(default)]
    pub parent_id: Option<MessageId>,
}

impl MessageRecord {
    /// Create a record acknowledged by the backend
    #[must_use]
    pub fn confirmed(
        id: impl Into<MessageId>,
        channel_id: ChannelId,
        created_at: i64,
        payload: MessagePayload,
    ) -> Self {
        Self {
            id: Some(id.into()),
            channel_id,
            created_at,
            updated_at: None,
            client_token: None,
            status: MessageStatus::Succeeded,
            sender_id: None,
            payload,
            parent_id: None,
        }
    }

    /// Create a locally originated record awaiting confirmation
    #[must_use]
    pub fn pending(
        channel_id: ChannelId,
        client_token: ClientToken,
        payload: MessagePayload,
        created_at: i64,
    ) -> Self {
        Self {
            id: None,
            channel_id,
            created_at,
            updated_at: None,
            client_token: Some(client_token),
            status: MessageStatus::Pending,
            sender_id: None,
            payload,
            parent_id: None,
        }
    }

    #[must_use]
    pub fn with_client_token(mut self, token: impl Into<ClientToken>) -> Self {
        self.client_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<MessageId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    /// Whether the record carries a server identity
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.id.is_some()
    }

    #[must_use]
    pub const fn is_thread_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Row identity, or `None` for a record with neither id nor client token
    #[must_use]
    pub fn row_key(&self) -> Option<RowKey> {
        if let Some(token) = &self.client_token {
            return Some(RowKey::Local(token.clone()));
        }
        self.id.clone().map(RowKey::Message)
    }

    /// Whether this record is the row identified by `key`
    #[must_use]
    pub fn matches(&self, key: &RowKey) -> bool {
        match key {
            RowKey::Message(id) => self.id.as_ref() == Some(id),
            RowKey::Local(token) => self.client_token.as_ref() == Some(token),
        }
    }

    /// Total order of confirmed records: `(created_at, id)` ascending
    #[must_use]
    pub fn timeline_cmp(&self, other: &Self) -> Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> ChannelId {
        ChannelId::new("general").unwrap()
    }

    #[test]
    fn test_pending_record_defaults() {
        let record = MessageRecord::pending(
            channel(),
            ClientToken::from("abc"),
            MessagePayload::text("hi"),
            10,
        );
        assert_eq!(record.status, MessageStatus::Pending);
        assert!(!record.is_confirmed());
        assert_eq!(record.row_key(), Some(RowKey::Local("abc".into())));
    }

    #[test]
    fn test_row_key_prefers_client_token() {
        let record =
            MessageRecord::confirmed("m1", channel(), 10, MessagePayload::text("hi"))
                .with_client_token("abc");
        assert_eq!(record.row_key(), Some(RowKey::Local("abc".into())));
        assert!(record.matches(&RowKey::Message("m1".into())));
        assert!(record.matches(&RowKey::Local("abc".into())));
    }

    #[test]
    fn test_timeline_cmp_breaks_ties_by_id() {
        let a = MessageRecord::confirmed("a", channel(), 10, MessagePayload::Unknown);
        let b = MessageRecord::confirmed("b", channel(), 10, MessagePayload::Unknown);
        let c = MessageRecord::confirmed("0", channel(), 11, MessagePayload::Unknown);
        assert_eq!(a.timeline_cmp(&b), Ordering::Less);
        assert_eq!(c.timeline_cmp(&b), Ordering::Greater);
    }

    #[test]
    fn test_payload_deserialize_unknown_kind() {
        let payload: MessagePayload = serde_json::from_str(r#"{"kind":"poll"}"#).unwrap();
        assert_eq!(payload.kind(), MessageKind::Unknown);
    }

    #[test]
    fn test_record_deserialize_minimal() {
        let record: MessageRecord = serde_json::from_str(
            r#"{"id":"m1","channel_id":"general","created_at":100,
                "payload":{"kind":"text","body":"hello\nworld"}}"#,
        )
        .unwrap();
        assert_eq!(record.status, MessageStatus::Succeeded);
        assert_eq!(record.payload.preview(50), "hello");
        assert!(!record.is_thread_reply());
    }
}
