//! Synchronous timeline engine.
//!
//! Ties the store, pagination policy and scroll-anchor reconciler together.
//! Every operation runs to completion; observers collect the resulting
//! [`EngineEvent`]s with [`TimelineEngine::take_events`].

use serde::Serialize;

use crate::config::TimelineConfig;
use crate::error::Result;
use crate::models::{ChannelId, ClientToken, MessageId, MessagePayload, MessageRecord};
use crate::state::EmptyViewState;
use crate::transport::LiveEvent;
use crate::util::{compact_text, unix_millis_now};

use super::anchor::{
    NewMessageIndicator, PresentationInstruction, RowMeasure, ScrollAnchorReconciler,
    ViewportState,
};
use super::change::{MessageSource, TimelineChange};
use super::pagination::{FetchDirection, FetchRequest, PaginationPolicy};
use super::store::TimelineStore;

/// Something observers of a timeline should know about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum EngineEvent {
    Changed(TimelineChange),
    Present(PresentationInstruction),
    IndicatorChanged(NewMessageIndicator),
    EmptyViewChanged(EmptyViewState),
    FetchFailed {
        direction: FetchDirection,
        reason: String,
    },
    SendFailed {
        client_token: ClientToken,
        reason: String,
    },
    /// Newer pages are unloaded; the latest page must be fetched and passed
    /// to [`TimelineEngine::reset`].
    ReloadRequested,
}

/// One input to [`TimelineEngine::apply_batch`].
#[derive(Debug, Clone)]
pub enum TimelineOp {
    OlderPage {
        records: Vec<MessageRecord>,
        requested: usize,
    },
    NewerPage {
        records: Vec<MessageRecord>,
        requested: usize,
    },
    Live(LiveEvent),
    SendSucceeded {
        client_token: ClientToken,
        record: MessageRecord,
    },
    SendFailed {
        client_token: ClientToken,
        reason: String,
    },
}

impl TimelineOp {
    /// Older pages reconcile first so the live decision sees the adjusted
    /// viewport.
    const fn batch_rank(&self) -> u8 {
        match self {
            Self::OlderPage { .. } => 0,
            _ => 1,
        }
    }
}

pub struct TimelineEngine<M> {
    config: TimelineConfig,
    store: TimelineStore,
    policy: PaginationPolicy,
    reconciler: ScrollAnchorReconciler,
    viewport: ViewportState,
    measure: M,
    loaded: bool,
    empty_view: EmptyViewState,
    events: Vec<EngineEvent>,
}

impl<M: RowMeasure> TimelineEngine<M> {
    pub fn new(channel_id: ChannelId, config: TimelineConfig, measure: M) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store: TimelineStore::new(channel_id),
            policy: PaginationPolicy::from_config(&config),
            reconciler: ScrollAnchorReconciler::from_config(&config),
            config,
            viewport: ViewportState::default(),
            measure,
            loaded: false,
            empty_view: EmptyViewState::Loading,
            events: Vec::new(),
        })
    }

    pub const fn channel_id(&self) -> &ChannelId {
        self.store.channel_id()
    }

    pub const fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub const fn store(&self) -> &TimelineStore {
        &self.store
    }

    pub const fn viewport_state(&self) -> &ViewportState {
        &self.viewport
    }

    pub const fn indicator(&self) -> NewMessageIndicator {
        self.reconciler.indicator()
    }

    pub const fn empty_view(&self) -> EmptyViewState {
        self.empty_view
    }

    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn snapshot(&self) -> Vec<MessageRecord> {
        self.store.snapshot()
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Request the initial page: older messages before `starting_point`
    /// (inclusive), or the latest page when there is none.
    pub fn initial_request(&self, starting_point: Option<i64>) -> FetchRequest {
        FetchRequest {
            direction: FetchDirection::Older,
            timestamp: starting_point.map_or(i64::MAX, |ts| ts.saturating_add(1)),
            limit: self.config.page_size,
        }
    }

    /// Replace the loaded content, after the initial load or a reload.
    pub fn reset(&mut self, records: Vec<MessageRecord>, has_older: bool, has_newer: bool) {
        self.loaded = true;
        let change = self.store.reset(records, has_older, has_newer);
        self.process(Some(change));
    }

    /// The initial load or a reload failed. Page fetches issued before the
    /// load are abandoned with it, so both in-flight flags are released.
    pub fn initial_load_failed(&mut self, reason: impl Into<String>) {
        let reason = compact_text(&reason.into());
        tracing::warn!(channel = %self.channel_id(), %reason, "initial load failed");
        self.store.fail_fetch(FetchDirection::Older);
        self.store.fail_fetch(FetchDirection::Newer);
        self.events.push(EngineEvent::FetchFailed {
            direction: FetchDirection::Older,
            reason,
        });
        if !self.loaded {
            self.set_empty_view(EmptyViewState::Error);
        }
    }

    /// A row is about to be displayed. Returns the page to fetch, if any;
    /// the caller must report its outcome through
    /// [`older_page_loaded`](Self::older_page_loaded),
    /// [`newer_page_loaded`](Self::newer_page_loaded) or
    /// [`fetch_failed`](Self::fetch_failed).
    pub fn row_will_display(&mut self, row: usize) -> Option<FetchRequest> {
        if !self.loaded {
            return None;
        }
        let direction = self
            .policy
            .evaluate(row, self.store.len(), self.store.cursor())?;
        let request = self.store.begin_fetch(direction, self.config.page_size)?;
        tracing::debug!(
            channel = %self.channel_id(),
            %direction,
            before_or_after = request.timestamp,
            "fetching page"
        );
        Some(request)
    }

    /// The user scrolled or the viewport was resized.
    pub fn viewport_did_change(&mut self, content_offset: f64, viewport_extent: f64) {
        self.viewport = ViewportState::capture(
            self.store.full_view(),
            &self.measure,
            content_offset,
            viewport_extent,
        );
        let has_newer = self.store.cursor().has_newer;
        if let Some(indicator) = self.reconciler.viewport_did_scroll(&self.viewport, has_newer) {
            self.events.push(EngineEvent::IndicatorChanged(indicator));
        }
    }

    pub fn older_page_loaded(&mut self, records: Vec<MessageRecord>, requested: usize) {
        let change = self.store.merge_older_page(records, requested);
        self.process(change);
    }

    pub fn newer_page_loaded(&mut self, records: Vec<MessageRecord>, requested: usize) {
        let change = self.store.merge_newer_page(records, requested);
        self.process(change);
    }

    pub fn fetch_failed(&mut self, direction: FetchDirection, reason: impl Into<String>) {
        let reason = compact_text(&reason.into());
        tracing::warn!(channel = %self.channel_id(), %direction, %reason, "page fetch failed");
        self.store.fail_fetch(direction);
        self.events.push(EngineEvent::FetchFailed { direction, reason });
    }

    pub fn live_event(&mut self, event: LiveEvent) {
        let change = match event {
            LiveEvent::Created(record) => {
                let source = self.classify(&record);
                self.store.apply_live_message(record, source)
            }
            LiveEvent::Updated(record) => self.store.apply_edit(record),
            LiveEvent::Deleted(id) => self.store.apply_delete(&id),
        };
        self.process(change);
    }

    /// Edit applied locally or by another client.
    pub fn apply_edit(&mut self, record: MessageRecord) {
        let change = self.store.apply_edit(record);
        self.process(change);
    }

    pub fn apply_delete(&mut self, id: &MessageId) {
        let change = self.store.apply_delete(id);
        self.process(change);
    }

    /// Build the pending record for a local send.
    pub fn pending_record(&self, client_token: ClientToken, payload: MessagePayload) -> MessageRecord {
        let mut record = MessageRecord::pending(
            self.channel_id().clone(),
            client_token,
            payload,
            unix_millis_now(),
        );
        record.sender_id.clone_from(&self.config.current_user_id);
        record
    }

    /// Show a local send immediately. Returns `false` when the record was
    /// rejected, e.g. a reused client token.
    pub fn send_started(&mut self, record: MessageRecord) -> bool {
        let change = self.store.add_pending(record);
        let accepted = change.is_some();
        self.process(change);
        accepted
    }

    pub fn send_succeeded(&mut self, client_token: &ClientToken, record: MessageRecord) {
        let change = self.store.mark_pending_succeeded(client_token, record);
        self.process(change);
    }

    pub fn send_failed(&mut self, client_token: &ClientToken, reason: impl Into<String>) {
        let reason = compact_text(&reason.into());
        tracing::warn!(%client_token, %reason, "send failed");
        let change = self.store.mark_pending_failed(client_token);
        if change.is_some() {
            self.events.push(EngineEvent::SendFailed {
                client_token: client_token.clone(),
                reason,
            });
        }
        self.process(change);
    }

    /// Move a failed send back to pending. Returns the record to resend.
    pub fn retry_send(&mut self, client_token: &ClientToken) -> Option<MessageRecord> {
        let (change, record) = self.store.retry_pending(client_token)?;
        self.process(Some(change));
        Some(record)
    }

    /// Discard an unconfirmed local send.
    pub fn delete_pending(&mut self, client_token: &ClientToken) -> bool {
        let change = self.store.delete_pending(client_token);
        let removed = change.is_some();
        self.process(change);
        removed
    }

    /// Return to the live end. Returns `true` when newer pages are unloaded
    /// and the caller must fetch the latest page and [`reset`](Self::reset).
    pub fn jump_to_bottom(&mut self) -> bool {
        let before = self.reconciler.indicator();
        if self.store.cursor().has_newer {
            self.reconciler.reset_indicator(false);
            self.events.push(EngineEvent::ReloadRequested);
            self.push_indicator_change(before);
            return true;
        }

        let instruction = self.reconciler.scroll_to_bottom(
            self.store.full_view(),
            &mut self.viewport,
            &self.measure,
            false,
        );
        self.events.push(EngineEvent::Present(instruction));
        self.push_indicator_change(before);
        false
    }

    /// Drop the loaded timeline, pending sends included, and start over on
    /// `channel_id`. The caller issues the new initial load.
    pub fn switch_channel(&mut self, channel_id: ChannelId) {
        let before = self.reconciler.indicator();
        self.store = TimelineStore::new(channel_id);
        self.loaded = false;
        self.reconciler.reset_indicator(false);
        self.viewport = ViewportState {
            viewport_extent: self.viewport.viewport_extent,
            ..ViewportState::default()
        };
        self.push_indicator_change(before);
        self.set_empty_view(EmptyViewState::Loading);
    }

    /// Apply inputs that became available together. Older pages go first;
    /// everything else keeps arrival order.
    pub fn apply_batch(&mut self, mut ops: Vec<TimelineOp>) {
        ops.sort_by_key(TimelineOp::batch_rank);
        for op in ops {
            match op {
                TimelineOp::OlderPage { records, requested } => {
                    self.older_page_loaded(records, requested);
                }
                TimelineOp::NewerPage { records, requested } => {
                    self.newer_page_loaded(records, requested);
                }
                TimelineOp::Live(event) => self.live_event(event),
                TimelineOp::SendSucceeded {
                    client_token,
                    record,
                } => self.send_succeeded(&client_token, record),
                TimelineOp::SendFailed {
                    client_token,
                    reason,
                } => self.send_failed(&client_token, reason),
            }
        }
    }

    fn classify(&self, record: &MessageRecord) -> MessageSource {
        if self.config.is_current_user(record.sender_id.as_deref()) {
            return MessageSource::LocalSend;
        }
        if record
            .client_token
            .as_ref()
            .is_some_and(|token| self.store.pending().contains(token))
        {
            return MessageSource::LocalSend;
        }
        if record.sender_id.is_some() {
            MessageSource::Received
        } else {
            MessageSource::Unspecified
        }
    }

    fn process(&mut self, change: Option<TimelineChange>) {
        let Some(change) = change else {
            return;
        };
        let before = self.reconciler.indicator();
        let instruction = self.reconciler.reconcile(
            &change,
            self.store.full_view(),
            &mut self.viewport,
            &self.measure,
        );
        tracing::debug!(
            channel = %self.channel_id(),
            origin = ?change.origin,
            instruction = instruction.name(),
            rows = change.len_after,
            "timeline changed"
        );
        self.events.push(EngineEvent::Changed(change));
        self.events.push(EngineEvent::Present(instruction));
        self.push_indicator_change(before);
        self.refresh_empty_view();
    }

    fn push_indicator_change(&mut self, before: NewMessageIndicator) {
        let after = self.reconciler.indicator();
        if after != before {
            self.events.push(EngineEvent::IndicatorChanged(after));
        }
    }

    fn refresh_empty_view(&mut self) {
        if !self.loaded {
            return;
        }
        let state = if self.store.is_empty() {
            EmptyViewState::NoMessages
        } else {
            EmptyViewState::None
        };
        self.set_empty_view(state);
    }

    fn set_empty_view(&mut self, state: EmptyViewState) {
        if state != self.empty_view {
            self.empty_view = state;
            self.events.push(EngineEvent::EmptyViewChanged(state));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::change::ChangeOrigin;
    use pretty_assertions::assert_eq;

    fn channel() -> ChannelId {
        ChannelId::new("general").unwrap()
    }

    fn msg(id: &str, created_at: i64) -> MessageRecord {
        MessageRecord::confirmed(id, channel(), created_at, MessagePayload::text(id))
            .with_sender("bob")
    }

    fn engine() -> TimelineEngine<fn(&MessageRecord) -> f64> {
        let config = TimelineConfig {
            page_size: 4,
            current_user_id: Some("me".to_string()),
            ..TimelineConfig::default()
        };
        let measure: fn(&MessageRecord) -> f64 = |_| 50.0;
        TimelineEngine::new(channel(), config, measure).unwrap()
    }

    fn presented(events: &[EngineEvent]) -> Vec<&'static str> {
        events
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Present(instruction) => Some(instruction.name()),
                _ => None,
            })
            .collect()
    }

    fn timestamps(engine: &TimelineEngine<fn(&MessageRecord) -> f64>) -> Vec<i64> {
        engine.snapshot().iter().map(|r| r.created_at).collect()
    }

    #[test]
    fn empty_view_follows_initial_load() {
        let mut engine = engine();
        assert_eq!(engine.empty_view(), EmptyViewState::Loading);

        engine.initial_load_failed("offline");
        assert_eq!(engine.empty_view(), EmptyViewState::Error);

        engine.reset(Vec::new(), false, false);
        assert_eq!(engine.empty_view(), EmptyViewState::NoMessages);

        engine.live_event(LiveEvent::Created(msg("m1", 100)));
        assert_eq!(engine.empty_view(), EmptyViewState::None);
        assert!(engine
            .take_events()
            .contains(&EngineEvent::EmptyViewChanged(EmptyViewState::None)));
    }

    #[test]
    fn initial_request_starts_after_starting_point() {
        let engine = engine();
        assert_eq!(engine.initial_request(None).timestamp, i64::MAX);
        assert_eq!(engine.initial_request(Some(500)).timestamp, 501);
        assert_eq!(engine.initial_request(Some(500)).limit, 4);
    }

    #[test]
    fn older_page_scenario_through_engine() {
        let mut engine = engine();
        engine.reset(vec![msg("c", 100), msg("d", 200), msg("e", 300)], true, false);
        engine.viewport_did_change(0.0, 100.0);

        assert_eq!(engine.row_will_display(0).map(|r| r.timestamp), Some(100));
        assert_eq!(engine.row_will_display(0), None);

        engine.take_events();
        engine.older_page_loaded(vec![msg("a", 50), msg("b", 80)], 4);
        assert_eq!(timestamps(&engine), vec![50, 80, 100, 200, 300]);
        assert!(!engine.store().cursor().has_older);
        assert_eq!(engine.viewport_state().content_offset, 100.0);
        assert_eq!(
            presented(&engine.take_events()),
            vec!["insert_rows_preserving_offset"]
        );
    }

    #[test]
    fn fetch_failure_clears_flag_and_reports() {
        let mut engine = engine();
        engine.reset(vec![msg("a", 100)], true, false);
        assert!(engine.row_will_display(0).is_some());
        engine.take_events();

        engine.fetch_failed(FetchDirection::Older, "timeout");
        assert!(engine.store().cursor().has_older);
        assert_eq!(
            engine.take_events(),
            vec![EngineEvent::FetchFailed {
                direction: FetchDirection::Older,
                reason: "timeout".to_string(),
            }]
        );
        assert!(engine.row_will_display(0).is_some());
    }

    #[test]
    fn pending_send_reconciles_with_live_echo() {
        let mut engine = engine();
        engine.reset(vec![msg("a", 100), msg("b", 200), msg("c", 300)], false, false);
        let pending = engine.pending_record(ClientToken::from("abc"), MessagePayload::text("hi"));
        assert_eq!(pending.sender_id.as_deref(), Some("me"));
        assert!(engine.send_started(pending.clone()));
        assert!(!engine.send_started(pending));

        let echo = MessageRecord::confirmed("m9", channel(), 310, MessagePayload::text("hi"))
            .with_client_token("abc")
            .with_sender("me");
        engine.take_events();
        engine.live_event(LiveEvent::Created(echo));

        assert!(engine.store().pending().is_empty());
        assert_eq!(timestamps(&engine), vec![100, 200, 300, 310]);
        assert_eq!(presented(&engine.take_events()), vec!["replace_row_in_place"]);
    }

    #[test]
    fn failed_send_can_be_retried_or_deleted() {
        let mut engine = engine();
        engine.reset(vec![msg("a", 100)], false, false);
        let token = ClientToken::from("t1");
        engine.send_started(engine.pending_record(token.clone(), MessagePayload::text("x")));
        engine.take_events();

        engine.send_failed(&token, "network down");
        let events = engine.take_events();
        assert!(events.contains(&EngineEvent::SendFailed {
            client_token: token.clone(),
            reason: "network down".to_string(),
        }));

        let resend = engine.retry_send(&token).unwrap();
        assert_eq!(resend.client_token, Some(token.clone()));
        assert!(engine.retry_send(&token).is_none());

        engine.send_failed(&token, "again");
        assert!(engine.delete_pending(&token));
        assert_eq!(engine.snapshot().len(), 1);
    }

    #[test]
    fn indicator_counts_and_jump_resets() {
        let mut engine = engine();
        engine.reset((1..=10).map(|i| msg(&format!("m{i}"), i * 100)).collect(), false, false);
        engine.viewport_did_change(0.0, 100.0);
        engine.take_events();

        engine.live_event(LiveEvent::Created(msg("n1", 2_000)));
        engine.live_event(LiveEvent::Created(msg("n2", 2_001)));
        assert_eq!(engine.indicator(), NewMessageIndicator { visible: true, count: 2 });
        assert_eq!(engine.viewport_state().content_offset, 0.0);

        assert!(!engine.jump_to_bottom());
        assert_eq!(engine.indicator(), NewMessageIndicator::default());
        let events = engine.take_events();
        assert!(events.contains(&EngineEvent::IndicatorChanged(NewMessageIndicator::default())));
        assert_eq!(engine.viewport_state().distance_from_bottom(), 0.0);
    }

    #[test]
    fn jump_with_unloaded_newer_pages_requests_reload() {
        let mut engine = engine();
        engine.reset(vec![msg("a", 100), msg("b", 200)], true, true);
        engine.take_events();

        assert!(engine.jump_to_bottom());
        assert!(engine.take_events().contains(&EngineEvent::ReloadRequested));

        engine.reset(vec![msg("y", 900), msg("z", 1_000)], true, false);
        assert_eq!(timestamps(&engine), vec![900, 1_000]);
        assert!(!engine.indicator().visible);
    }

    #[test]
    fn failed_reload_releases_page_fetches() {
        let mut engine = engine();
        engine.reset((2..=5).map(|i| msg(&format!("m{i}"), i * 100)).collect(), true, true);
        assert!(engine.row_will_display(0).is_some());
        assert!(engine.jump_to_bottom());

        engine.initial_load_failed("offline");
        assert_eq!(engine.empty_view(), EmptyViewState::None);
        let request = engine.row_will_display(0).unwrap();
        assert_eq!(request.direction, FetchDirection::Older);
        assert_eq!(request.timestamp, 200);
    }

    #[test]
    fn live_arrival_with_unloaded_newer_pages_keeps_gap_fetchable() {
        let mut engine = engine();
        engine.reset((2..=5).map(|i| msg(&format!("m{i}"), i * 100)).collect(), true, true);
        engine.live_event(LiveEvent::Created(msg("m11", 1_100)));
        assert_eq!(timestamps(&engine), vec![200, 300, 400, 500, 1_100]);

        let request = engine.row_will_display(4).unwrap();
        assert_eq!(request.direction, FetchDirection::Newer);
        assert_eq!(request.timestamp, 500);

        engine.newer_page_loaded((6..=9).map(|i| msg(&format!("m{i}"), i * 100)).collect(), 4);
        assert_eq!(
            timestamps(&engine),
            vec![200, 300, 400, 500, 600, 700, 800, 900, 1_100]
        );
        assert_eq!(engine.row_will_display(8).map(|r| r.timestamp), Some(900));
    }

    #[test]
    fn send_confirmed_with_unloaded_newer_pages_keeps_gap_fetchable() {
        let mut engine = engine();
        engine.reset(vec![msg("a", 100), msg("b", 200)], false, true);
        let token = ClientToken::from("t1");
        engine.send_started(engine.pending_record(token.clone(), MessagePayload::text("hi")));

        let confirmed = MessageRecord::confirmed("m9", channel(), 9_000, MessagePayload::text("hi"))
            .with_sender("me");
        engine.send_succeeded(&token, confirmed);
        assert!(engine.store().pending().is_empty());
        assert_eq!(timestamps(&engine), vec![100, 200, 9_000]);

        let request = engine.row_will_display(2).unwrap();
        assert_eq!(request.direction, FetchDirection::Newer);
        assert_eq!(request.timestamp, 200);
    }

    #[test]
    fn batch_applies_older_page_before_live_arrival() {
        let mut engine = engine();
        engine.reset((1..=4).map(|i| msg(&format!("m{i}"), i * 100)).collect(), true, false);
        // 200 of content in a 100 viewport, scrolled to the bottom.
        engine.viewport_did_change(100.0, 100.0);
        assert!(engine.row_will_display(0).is_some());
        engine.take_events();

        engine.apply_batch(vec![
            TimelineOp::Live(LiveEvent::Created(msg("m5", 500))),
            TimelineOp::OlderPage {
                records: vec![msg("a", 10), msg("b", 20)],
                requested: 4,
            },
        ]);

        let events = engine.take_events();
        let origins: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Changed(change) => Some(change.origin),
                _ => None,
            })
            .collect();
        assert_eq!(
            origins,
            vec![ChangeOrigin::OlderPage, ChangeOrigin::Live(MessageSource::Received)]
        );
        assert_eq!(
            presented(&events),
            vec!["insert_rows_preserving_offset", "insert_rows_and_scroll_to_anchor"]
        );
        assert_eq!(engine.viewport_state().distance_from_bottom(), 0.0);
    }

    #[test]
    fn live_arrival_from_current_user_follows_bottom() {
        let mut engine = engine();
        engine.reset((1..=10).map(|i| msg(&format!("m{i}"), i * 100)).collect(), false, false);
        engine.viewport_did_change(0.0, 100.0);
        engine.take_events();

        let mine = MessageRecord::confirmed("x", channel(), 5_000, MessagePayload::text("x"))
            .with_sender("me");
        engine.live_event(LiveEvent::Created(mine));
        assert_eq!(
            presented(&engine.take_events()),
            vec!["insert_rows_and_scroll_to_anchor"]
        );
    }

    #[test]
    fn switch_channel_clears_timeline() {
        let mut engine = engine();
        engine.reset(vec![msg("a", 100)], true, true);
        engine.viewport_did_change(0.0, 80.0);
        engine.take_events();

        let other = ChannelId::new("random").unwrap();
        engine.switch_channel(other.clone());
        assert_eq!(engine.channel_id(), &other);
        assert!(engine.snapshot().is_empty());
        assert!(!engine.is_loaded());
        assert_eq!(engine.viewport_state().viewport_extent, 80.0);
        assert_eq!(
            engine.take_events(),
            vec![
                EngineEvent::IndicatorChanged(NewMessageIndicator::default()),
                EngineEvent::EmptyViewChanged(EmptyViewState::Loading),
            ]
        );
    }

    #[test]
    fn row_will_display_waits_for_initial_load() {
        let mut engine = engine();
        assert_eq!(engine.row_will_display(0), None);
    }
}
