//! Overlay of locally originated messages awaiting confirmation.

use crate::models::{ClientToken, MessageRecord, MessageStatus};

/// Pending and failed local sends, keyed by client token, in send order.
///
/// Overlays hold a handful of entries at most, so lookups are linear.
#[derive(Debug, Clone, Default)]
pub struct PendingOverlay {
    entries: Vec<MessageRecord>,
}

impl PendingOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageRecord> {
        self.entries.iter()
    }

    #[must_use]
    pub fn position(&self, token: &ClientToken) -> Option<usize> {
        self.entries
            .iter()
            .position(|record| record.client_token.as_ref() == Some(token))
    }

    #[must_use]
    pub fn get(&self, token: &ClientToken) -> Option<&MessageRecord> {
        self.position(token).map(|index| &self.entries[index])
    }

    #[must_use]
    pub fn contains(&self, token: &ClientToken) -> bool {
        self.position(token).is_some()
    }

    /// Append a record. Returns its overlay index, or `None` when the record
    /// has no client token or the token is already present.
    pub fn push(&mut self, record: MessageRecord) -> Option<usize> {
        let token = record.client_token.as_ref()?;
        if self.contains(token) {
            return None;
        }
        self.entries.push(record);
        Some(self.entries.len() - 1)
    }

    /// Remove the record for `token`, returning its former index.
    pub fn remove(&mut self, token: &ClientToken) -> Option<(usize, MessageRecord)> {
        let index = self.position(token)?;
        Some((index, self.entries.remove(index)))
    }

    /// `pending -> failed`. Any other starting state is a no-op.
    pub fn mark_failed(&mut self, token: &ClientToken) -> Option<usize> {
        self.transition(token, MessageStatus::Pending, MessageStatus::Failed)
    }

    /// `failed -> pending` for a retry. Any other starting state is a no-op.
    pub fn mark_retrying(&mut self, token: &ClientToken) -> Option<usize> {
        self.transition(token, MessageStatus::Failed, MessageStatus::Pending)
    }

    /// Drop everything, e.g. when the channel changes.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn transition(
        &mut self,
        token: &ClientToken,
        from: MessageStatus,
        to: MessageStatus,
    ) -> Option<usize> {
        let index = self.position(token)?;
        let record = &mut self.entries[index];
        if record.status != from {
            return None;
        }
        record.status = to;
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelId, MessagePayload};

    fn pending(token: &str) -> MessageRecord {
        MessageRecord::pending(
            ChannelId::new("general").unwrap(),
            ClientToken::from(token),
            MessagePayload::text(token),
            0,
        )
    }

    #[test]
    fn push_preserves_order_and_rejects_duplicates() {
        let mut overlay = PendingOverlay::new();
        assert_eq!(overlay.push(pending("a")), Some(0));
        assert_eq!(overlay.push(pending("b")), Some(1));
        assert_eq!(overlay.push(pending("a")), None);
        let tokens: Vec<_> = overlay
            .iter()
            .filter_map(|record| record.client_token.as_ref().map(ClientToken::as_str))
            .collect();
        assert_eq!(tokens, vec!["a", "b"]);
    }

    #[test]
    fn push_rejects_records_without_token() {
        let mut overlay = PendingOverlay::new();
        let mut record = pending("a");
        record.client_token = None;
        assert_eq!(overlay.push(record), None);
        assert!(overlay.is_empty());
    }

    #[test]
    fn status_transitions_follow_state_machine() {
        let mut overlay = PendingOverlay::new();
        overlay.push(pending("a"));
        let token = ClientToken::from("a");

        assert_eq!(overlay.mark_retrying(&token), None);
        assert_eq!(overlay.mark_failed(&token), Some(0));
        assert_eq!(overlay.mark_failed(&token), None);
        assert_eq!(overlay.get(&token).unwrap().status, MessageStatus::Failed);
        assert_eq!(overlay.mark_retrying(&token), Some(0));
        assert_eq!(overlay.get(&token).unwrap().status, MessageStatus::Pending);
    }

    #[test]
    fn remove_returns_former_index() {
        let mut overlay = PendingOverlay::new();
        overlay.push(pending("a"));
        overlay.push(pending("b"));
        let (index, record) = overlay.remove(&ClientToken::from("b")).unwrap();
        assert_eq!(index, 1);
        assert_eq!(record.client_token, Some(ClientToken::from("b")));
        assert!(overlay.remove(&ClientToken::from("b")).is_none());
    }
}
