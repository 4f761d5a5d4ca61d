//! Ordered, deduplicated store of confirmed and pending messages.

use std::cell::OnceCell;
use std::collections::{HashMap, HashSet};

use crate::models::{ChannelId, ClientToken, MessageId, MessageRecord, MessageStatus};

use super::change::{ChangeOrigin, MessageSource, RemovedRow, TimelineChange};
use super::pagination::{FetchDirection, FetchRequest, PaginationCursor};
use super::pending::PendingOverlay;

/// Timeline state for one open channel.
///
/// Every mutation runs to completion and returns a [`TimelineChange`], or
/// `None` when it turned out to be a no-op (duplicate delivery, overlapping
/// page, late echo). Callers must serialize access.
#[derive(Debug, Clone)]
pub struct TimelineStore {
    channel_id: ChannelId,
    confirmed: Vec<MessageRecord>,
    ids: HashSet<MessageId>,
    pending: PendingOverlay,
    cursor: PaginationCursor,
    /// Newest timestamp of the contiguous range loaded from pages. Live
    /// arrivals past an unloaded gap never move it.
    newer_bound: Option<i64>,
    full_view: OnceCell<Vec<MessageRecord>>,
}

impl TimelineStore {
    #[must_use]
    pub fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            confirmed: Vec::new(),
            ids: HashSet::new(),
            pending: PendingOverlay::new(),
            cursor: PaginationCursor::default(),
            newer_bound: None,
            full_view: OnceCell::new(),
        }
    }

    #[must_use]
    pub const fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    #[must_use]
    pub fn confirmed(&self) -> &[MessageRecord] {
        &self.confirmed
    }

    #[must_use]
    pub const fn pending(&self) -> &PendingOverlay {
        &self.pending
    }

    #[must_use]
    pub const fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }

    /// Number of rows in the full view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.confirmed.len() + self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Confirmed records followed by the pending overlay in send order.
    pub fn full_view(&self) -> &[MessageRecord] {
        self.full_view.get_or_init(|| {
            self.confirmed
                .iter()
                .chain(self.pending.iter())
                .cloned()
                .collect()
        })
    }

    /// Owned copy of the full view, for initial render or full reload.
    #[must_use]
    pub fn snapshot(&self) -> Vec<MessageRecord> {
        self.full_view().to_vec()
    }

    #[must_use]
    pub fn oldest_loaded_timestamp(&self) -> Option<i64> {
        self.confirmed.first().map(|record| record.created_at)
    }

    #[must_use]
    pub fn newest_loaded_timestamp(&self) -> Option<i64> {
        self.confirmed.last().map(|record| record.created_at)
    }

    /// Where the next newer page continues from. Trails
    /// [`newest_loaded_timestamp`](Self::newest_loaded_timestamp) while live
    /// messages sit past unloaded pages.
    #[must_use]
    pub const fn newer_page_bound(&self) -> Option<i64> {
        self.newer_bound
    }

    /// Start a page fetch if the cursor allows one.
    ///
    /// An empty timeline fetches older pages from the live end; newer pages
    /// continue from the end of the page-loaded range.
    pub fn begin_fetch(&mut self, direction: FetchDirection, limit: usize) -> Option<FetchRequest> {
        let timestamp = match direction {
            FetchDirection::Older => self.oldest_loaded_timestamp().unwrap_or(i64::MAX),
            FetchDirection::Newer => self.newer_bound?,
        };
        if !self.cursor.try_begin(direction) {
            return None;
        }
        Some(FetchRequest {
            direction,
            timestamp,
            limit,
        })
    }

    /// Clear the in-flight flag after a transport failure.
    pub fn fail_fetch(&mut self, direction: FetchDirection) {
        self.cursor.fail(direction);
    }

    /// Replace the confirmed content wholesale, e.g. after the initial load or
    /// a jump to the live end. Pending records echoed by `records` are
    /// reconciled; the rest of the overlay is kept.
    pub fn reset(
        &mut self,
        records: Vec<MessageRecord>,
        has_older: bool,
        has_newer: bool,
    ) -> TimelineChange {
        let mut change = TimelineChange::new(ChangeOrigin::Reload, self.len());

        self.confirmed.clear();
        self.ids.clear();
        for record in records {
            let Some(record) = self.admit_confirmed(record) else {
                continue;
            };
            let Some(id) = record.id.clone() else {
                continue;
            };
            if !self.ids.insert(id) {
                continue;
            }
            if let Some(token) = &record.client_token {
                self.pending.remove(token);
            }
            self.confirmed.push(record);
        }
        self.confirmed.sort_by(MessageRecord::timeline_cmp);
        self.cursor = PaginationCursor::new(has_older, has_newer);
        self.newer_bound = self.newest_loaded_timestamp();
        change.arrivals = self.confirmed.len();

        tracing::debug!(
            channel = %self.channel_id,
            loaded = self.confirmed.len(),
            has_older,
            has_newer,
            "timeline reset"
        );
        self.finish(change)
    }

    /// Merge a page of messages older than the loaded range.
    pub fn merge_older_page(
        &mut self,
        records: Vec<MessageRecord>,
        requested: usize,
    ) -> Option<TimelineChange> {
        self.merge_page(FetchDirection::Older, records, requested)
    }

    /// Merge a page of messages newer than the loaded range.
    pub fn merge_newer_page(
        &mut self,
        records: Vec<MessageRecord>,
        requested: usize,
    ) -> Option<TimelineChange> {
        self.merge_page(FetchDirection::Newer, records, requested)
    }

    /// Insert or replace a confirmed message delivered live.
    ///
    /// A pending record sharing the client token is swapped for the confirmed
    /// one in the same step.
    pub fn apply_live_message(
        &mut self,
        record: MessageRecord,
        source: MessageSource,
    ) -> Option<TimelineChange> {
        let record = self.admit_confirmed(record)?;
        let id = record.id.clone()?;
        let origin = ChangeOrigin::Live(source);

        if let Some(index) = self.index_of(&id) {
            return self.replace_confirmed(index, record, origin);
        }

        let len_before = self.len();
        let confirmed_before = self.confirmed.len();
        let reconciled = record
            .client_token
            .as_ref()
            .and_then(|token| self.pending.remove(token));

        let at = self.insertion_index(&record);
        self.confirmed.insert(at, record);
        self.ids.insert(id);

        let mut change = TimelineChange::new(origin, len_before);
        match reconciled {
            Some((pending_index, previous)) => {
                let old_index = confirmed_before + pending_index;
                if old_index == at {
                    change.updated.push(at);
                } else {
                    change.removed.push(RemovedRow {
                        index: old_index,
                        record: previous,
                    });
                    change.inserted.push(at);
                }
            }
            None => {
                change.inserted.push(at);
                change.arrivals = 1;
            }
        }
        Some(self.finish(change))
    }

    /// Replace a confirmed message in place. Ordering never changes, and an
    /// edit older than the loaded copy's `updated_at` is ignored.
    pub fn apply_edit(&mut self, record: MessageRecord) -> Option<TimelineChange> {
        let record = self.admit_confirmed(record)?;
        let id = record.id.clone()?;
        let Some(index) = self.index_of(&id) else {
            tracing::debug!(message_id = %id, "edit for a message outside the loaded range");
            return None;
        };
        self.replace_confirmed(index, record, ChangeOrigin::Edit)
    }

    /// Remove a confirmed message.
    pub fn apply_delete(&mut self, id: &MessageId) -> Option<TimelineChange> {
        let index = self.index_of(id)?;
        let len_before = self.len();
        let record = self.confirmed.remove(index);
        self.ids.remove(id);

        let mut change = TimelineChange::new(ChangeOrigin::Delete, len_before);
        change.removed.push(RemovedRow { index, record });
        Some(self.finish(change))
    }

    /// Remove an unconfirmed local send, e.g. a cancelled upload or a failed
    /// message the user discarded.
    pub fn delete_pending(&mut self, token: &ClientToken) -> Option<TimelineChange> {
        let len_before = self.len();
        let (pending_index, record) = self.pending.remove(token)?;

        let mut change = TimelineChange::new(ChangeOrigin::Delete, len_before);
        change.removed.push(RemovedRow {
            index: self.confirmed.len() + pending_index,
            record,
        });
        Some(self.finish(change))
    }

    /// Append a local send to the overlay before the backend confirms it.
    pub fn add_pending(&mut self, mut record: MessageRecord) -> Option<TimelineChange> {
        if !self.admits(&record) {
            return None;
        }
        if record.id.is_some() || record.client_token.is_none() {
            tracing::warn!(
                channel = %self.channel_id,
                "pending record needs a client token and no server id; ignoring"
            );
            return None;
        }
        if self
            .confirmed
            .iter()
            .any(|existing| existing.client_token.is_some() && existing.client_token == record.client_token)
        {
            tracing::debug!(channel = %self.channel_id, "local send already confirmed");
            return None;
        }
        record.status = MessageStatus::Pending;

        let len_before = self.len();
        let Some(pending_index) = self.pending.push(record) else {
            tracing::debug!(channel = %self.channel_id, "duplicate pending send ignored");
            return None;
        };

        let mut change = TimelineChange::new(ChangeOrigin::PendingAdded, len_before);
        change.inserted.push(self.confirmed.len() + pending_index);
        Some(self.finish(change))
    }

    /// `pending -> failed`.
    pub fn mark_pending_failed(&mut self, token: &ClientToken) -> Option<TimelineChange> {
        let pending_index = self.pending.mark_failed(token)?;
        Some(self.status_changed(pending_index))
    }

    /// `failed -> pending`. Returns the record to hand back to the sender.
    pub fn retry_pending(
        &mut self,
        token: &ClientToken,
    ) -> Option<(TimelineChange, MessageRecord)> {
        let pending_index = self.pending.mark_retrying(token)?;
        let record = self.pending.get(token)?.clone();
        Some((self.status_changed(pending_index), record))
    }

    /// `pending -> succeeded`. A token that is no longer in the overlay is a
    /// late echo: ignored when the message is already loaded, otherwise
    /// inserted like any live message.
    pub fn mark_pending_succeeded(
        &mut self,
        token: &ClientToken,
        mut confirmed: MessageRecord,
    ) -> Option<TimelineChange> {
        if !self.pending.contains(token)
            && confirmed.id.as_ref().is_some_and(|id| self.ids.contains(id))
        {
            tracing::debug!(client_token = %token, "late confirmation ignored");
            return None;
        }
        confirmed.client_token = Some(token.clone());
        self.apply_live_message(confirmed, MessageSource::LocalSend)
    }

    fn merge_page(
        &mut self,
        direction: FetchDirection,
        records: Vec<MessageRecord>,
        requested: usize,
    ) -> Option<TimelineChange> {
        self.cursor.complete(direction, records.len(), requested);
        let page_newest = records.iter().map(|record| record.created_at).max();
        if direction == FetchDirection::Newer || self.newer_bound.is_none() {
            self.newer_bound = self.newer_bound.max(page_newest);
        }

        let origin = match direction {
            FetchDirection::Older => ChangeOrigin::OlderPage,
            FetchDirection::Newer => ChangeOrigin::NewerPage,
        };
        let mut change = TimelineChange::new(origin, self.len());
        let confirmed_before = self.confirmed.len();
        let pending_positions: HashMap<ClientToken, usize> = self
            .pending
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record
                    .client_token
                    .clone()
                    .map(|token| (token, confirmed_before + index))
            })
            .collect();

        let mut inserted_ids = HashSet::new();
        for record in records {
            let Some(record) = self.admit_confirmed(record) else {
                continue;
            };
            let Some(id) = record.id.clone() else {
                continue;
            };
            if self.ids.contains(&id) {
                continue;
            }

            let reconciled = record
                .client_token
                .as_ref()
                .and_then(|token| Some((pending_positions.get(token)?, self.pending.remove(token)?)));
            match reconciled {
                Some((&index, (_, previous))) => change.removed.push(RemovedRow {
                    index,
                    record: previous,
                }),
                None => change.arrivals += 1,
            }

            let at = self.insertion_index(&record);
            self.confirmed.insert(at, record);
            self.ids.insert(id.clone());
            inserted_ids.insert(id);
        }

        if inserted_ids.is_empty() {
            tracing::debug!(
                channel = %self.channel_id,
                %direction,
                "page added no new messages"
            );
            return None;
        }

        change.removed.sort_by_key(|row| row.index);
        change.inserted = self
            .confirmed
            .iter()
            .enumerate()
            .filter(|(_, record)| record.id.as_ref().is_some_and(|id| inserted_ids.contains(id)))
            .map(|(index, _)| index)
            .collect();
        Some(self.finish(change))
    }

    fn replace_confirmed(
        &mut self,
        index: usize,
        mut record: MessageRecord,
        origin: ChangeOrigin,
    ) -> Option<TimelineChange> {
        let existing = &self.confirmed[index];
        // An unedited record (`None`) is older than any edit.
        if record.updated_at < existing.updated_at {
            tracing::debug!(message_id = ?record.id, "stale edit ignored");
            return None;
        }
        if record.created_at != existing.created_at {
            tracing::warn!(
                message_id = ?record.id,
                "replacement changed created_at; keeping the original position"
            );
            record.created_at = existing.created_at;
        }
        if record.client_token.is_none() {
            record.client_token.clone_from(&existing.client_token);
        }
        if *existing == record {
            tracing::debug!(message_id = ?record.id, "duplicate delivery ignored");
            return None;
        }

        let mut change = TimelineChange::new(origin, self.len());
        self.confirmed[index] = record;
        change.updated.push(index);
        Some(self.finish(change))
    }

    fn status_changed(&mut self, pending_index: usize) -> TimelineChange {
        let mut change = TimelineChange::new(ChangeOrigin::StatusChanged, self.len());
        change.updated.push(self.confirmed.len() + pending_index);
        self.finish(change)
    }

    fn finish(&mut self, mut change: TimelineChange) -> TimelineChange {
        self.full_view = OnceCell::new();
        change.len_after = self.len();
        change.has_newer = self.cursor.has_newer;
        change
    }

    /// Whether a record belongs in this channel's main timeline.
    fn admits(&self, record: &MessageRecord) -> bool {
        if record.channel_id != self.channel_id {
            tracing::debug!(
                channel = %self.channel_id,
                other = %record.channel_id,
                "record for another channel dropped"
            );
            return false;
        }
        if record.is_thread_reply() {
            tracing::debug!(channel = %self.channel_id, "thread reply kept out of main timeline");
            return false;
        }
        true
    }

    fn admit_confirmed(&self, mut record: MessageRecord) -> Option<MessageRecord> {
        if !self.admits(&record) {
            return None;
        }
        if record.id.is_none() {
            tracing::warn!(channel = %self.channel_id, "confirmed record without id ignored");
            return None;
        }
        record.status = MessageStatus::Succeeded;
        Some(record)
    }

    fn index_of(&self, id: &MessageId) -> Option<usize> {
        if !self.ids.contains(id) {
            return None;
        }
        self.confirmed
            .iter()
            .position(|record| record.id.as_ref() == Some(id))
    }

    fn insertion_index(&self, record: &MessageRecord) -> usize {
        self.confirmed
            .partition_point(|existing| existing.timeline_cmp(record).is_lt())
    }
}
