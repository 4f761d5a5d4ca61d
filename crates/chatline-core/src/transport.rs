//! Backend collaborators: page fetches, live events and message delivery.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::{ChannelId, ClientToken, MessageId, MessageRecord};
use crate::util::unix_millis_now;

/// A change pushed by the backend for a subscribed channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum LiveEvent {
    Created(MessageRecord),
    Updated(MessageRecord),
    Deleted(MessageId),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("channel not found: {0}")]
    ChannelNotFound(ChannelId),
}

/// Source of message history and live events.
pub trait MessageTransport: Send + Sync + 'static {
    /// Up to `limit` messages created strictly before `before`, oldest first.
    fn fetch_older(
        &self,
        channel_id: &ChannelId,
        before: i64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<MessageRecord>, TransportError>> + Send;

    /// Up to `limit` messages created strictly after `after`, oldest first.
    fn fetch_newer(
        &self,
        channel_id: &ChannelId,
        after: i64,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<MessageRecord>, TransportError>> + Send;

    /// Live events for `channel_id` until the receiver is dropped.
    fn subscribe(&self, channel_id: &ChannelId) -> mpsc::UnboundedReceiver<LiveEvent>;
}

/// Delivers locally originated messages.
pub trait MessageSender: Send + Sync + 'static {
    fn issue_token(&self) -> ClientToken {
        ClientToken::generate()
    }

    /// Resolves to the confirmed record, which must echo the client token.
    fn deliver(
        &self,
        record: MessageRecord,
    ) -> impl Future<Output = Result<MessageRecord, TransportError>> + Send;
}

/// In-process backend holding channel history in memory.
///
/// Delivered messages are confirmed immediately and echoed to subscribers,
/// the way a real backend echoes a send over its live connection.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    channels: Mutex<HashMap<ChannelId, Vec<MessageRecord>>>,
    subscribers: Mutex<HashMap<ChannelId, Vec<mpsc::UnboundedSender<LiveEvent>>>>,
    failures: Mutex<Vec<TransportError>>,
    next_id: AtomicU64,
}

impl InMemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a channel's history.
    pub fn insert_history(&self, channel_id: &ChannelId, records: Vec<MessageRecord>) {
        let mut channels = lock(&self.channels);
        let history = channels.entry(channel_id.clone()).or_default();
        history.extend(records);
        history.sort_by(MessageRecord::timeline_cmp);
    }

    /// Make the next fetch or delivery fail with `error`.
    pub fn fail_next(&self, error: TransportError) {
        lock(&self.failures).push(error);
    }

    /// Apply an event to the stored history and push it to subscribers.
    pub fn publish(&self, channel_id: &ChannelId, event: LiveEvent) {
        {
            let mut channels = lock(&self.channels);
            let history = channels.entry(channel_id.clone()).or_default();
            match &event {
                LiveEvent::Created(record) | LiveEvent::Updated(record) => {
                    history.retain(|existing| existing.id != record.id);
                    history.push(record.clone());
                    history.sort_by(MessageRecord::timeline_cmp);
                }
                LiveEvent::Deleted(id) => history.retain(|existing| existing.id.as_ref() != Some(id)),
            }
        }

        let mut subscribers = lock(&self.subscribers);
        if let Some(senders) = subscribers.get_mut(channel_id) {
            senders.retain(|sender| sender.send(event.clone()).is_ok());
        }
    }

    fn take_failure(&self) -> Option<TransportError> {
        let mut failures = lock(&self.failures);
        if failures.is_empty() {
            None
        } else {
            Some(failures.remove(0))
        }
    }

    fn history(&self, channel_id: &ChannelId) -> Result<Vec<MessageRecord>, TransportError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        lock(&self.channels)
            .get(channel_id)
            .cloned()
            .ok_or_else(|| TransportError::ChannelNotFound(channel_id.clone()))
    }
}

impl MessageTransport for InMemoryTransport {
    async fn fetch_older(
        &self,
        channel_id: &ChannelId,
        before: i64,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, TransportError> {
        let older: Vec<_> = self
            .history(channel_id)?
            .into_iter()
            .filter(|record| record.created_at < before)
            .collect();
        let skip = older.len().saturating_sub(limit);
        Ok(older.into_iter().skip(skip).collect())
    }

    async fn fetch_newer(
        &self,
        channel_id: &ChannelId,
        after: i64,
        limit: usize,
    ) -> Result<Vec<MessageRecord>, TransportError> {
        Ok(self
            .history(channel_id)?
            .into_iter()
            .filter(|record| record.created_at > after)
            .take(limit)
            .collect())
    }

    fn subscribe(&self, channel_id: &ChannelId) -> mpsc::UnboundedReceiver<LiveEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        lock(&self.subscribers)
            .entry(channel_id.clone())
            .or_default()
            .push(sender);
        receiver
    }
}

impl MessageSender for InMemoryTransport {
    async fn deliver(&self, record: MessageRecord) -> Result<MessageRecord, TransportError> {
        if let Some(error) = self.take_failure() {
            return Err(error);
        }
        if record.client_token.is_none() {
            return Err(TransportError::Rejected("missing client token".to_string()));
        }

        let newest = lock(&self.channels)
            .get(&record.channel_id)
            .and_then(|history| history.last().map(|last| last.created_at))
            .unwrap_or(0);
        let serial = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        let mut confirmed = record;
        confirmed.id = Some(MessageId::new(format!("srv-{serial}")));
        confirmed.created_at = unix_millis_now().max(newest + 1);
        confirmed.status = crate::models::MessageStatus::Succeeded;

        let channel_id = confirmed.channel_id.clone();
        self.publish(&channel_id, LiveEvent::Created(confirmed.clone()));
        Ok(confirmed)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
