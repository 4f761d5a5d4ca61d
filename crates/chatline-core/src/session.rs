//! Channel session actor.
//!
//! Owns a [`TimelineEngine`] on a single tokio task so every mutation runs
//! to completion in order. UI code talks to it through a cloneable
//! [`SessionHandle`] and receives [`EngineEvent`]s on an unbounded channel.
//! Fetches and sends run on spawned tasks and re-enter through a completion
//! channel; inputs that are ready together are applied as one batch.
//! Live events and send results that arrive while a load is outstanding are
//! held back and replayed after the reset, which would otherwise drop them.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::config::TimelineConfig;
use crate::models::{ChannelId, ClientToken, MessagePayload, MessageRecord};
use crate::state::EmptyViewState;
use crate::timeline::{
    EngineEvent, FetchDirection, FetchRequest, NewMessageIndicator, RowMeasure, TimelineEngine,
    TimelineOp,
};
use crate::transport::{LiveEvent, MessageSender, MessageTransport, TransportError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session has shut down")]
    Shutdown,

    #[error("message could not be queued for sending")]
    SendRejected,

    #[error(transparent)]
    Core(#[from] crate::error::Error),
}

/// Point-in-time view of a session, for initial render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub channel_id: ChannelId,
    pub messages: Vec<MessageRecord>,
    pub indicator: NewMessageIndicator,
    pub empty_view: EmptyViewState,
    pub has_older: bool,
    pub has_newer: bool,
}

enum Command {
    RowWillDisplay(usize),
    ViewportDidChange {
        content_offset: f64,
        viewport_extent: f64,
    },
    Send {
        payload: MessagePayload,
        reply: oneshot::Sender<Option<ClientToken>>,
    },
    Retry {
        client_token: ClientToken,
        reply: oneshot::Sender<bool>,
    },
    DeletePending {
        client_token: ClientToken,
        reply: oneshot::Sender<bool>,
    },
    JumpToBottom,
    SwitchChannel {
        channel_id: ChannelId,
        starting_point: Option<i64>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Close,
}

enum Completion {
    Reset {
        generation: u64,
        requested: usize,
        has_newer: bool,
        result: Result<Vec<MessageRecord>, TransportError>,
    },
    Page {
        generation: u64,
        request: FetchRequest,
        result: Result<Vec<MessageRecord>, TransportError>,
    },
    Send {
        generation: u64,
        client_token: ClientToken,
        result: Result<MessageRecord, TransportError>,
    },
}

impl Completion {
    const fn generation(&self) -> u64 {
        match self {
            Self::Reset { generation, .. }
            | Self::Page { generation, .. }
            | Self::Send { generation, .. } => *generation,
        }
    }
}

/// Staleness counters. Loads are invalidated by reloads and channel
/// switches; deliveries only by channel switches.
#[derive(Debug, Clone, Copy, Default)]
struct Generations {
    channel: u64,
    load: u64,
}

impl Generations {
    const fn is_current(self, completion: &Completion) -> bool {
        let current = match completion {
            Completion::Send { .. } => self.channel,
            Completion::Reset { .. } | Completion::Page { .. } => self.load,
        };
        completion.generation() == current
    }
}

/// Cloneable handle to a running session.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    pub fn row_will_display(&self, row: usize) -> Result<(), SessionError> {
        self.command(Command::RowWillDisplay(row))
    }

    pub fn viewport_did_change(
        &self,
        content_offset: f64,
        viewport_extent: f64,
    ) -> Result<(), SessionError> {
        self.command(Command::ViewportDidChange {
            content_offset,
            viewport_extent,
        })
    }

    /// Queue a message. Returns the client token of its pending row.
    pub async fn send(&self, payload: MessagePayload) -> Result<ClientToken, SessionError> {
        self.request(|reply| Command::Send { payload, reply })
            .await?
            .ok_or(SessionError::SendRejected)
    }

    /// Resend a failed message. Returns `false` when it is not in the failed
    /// state.
    pub async fn retry(&self, client_token: ClientToken) -> Result<bool, SessionError> {
        self.request(|reply| Command::Retry {
            client_token,
            reply,
        })
        .await
    }

    pub async fn delete_pending(&self, client_token: ClientToken) -> Result<bool, SessionError> {
        self.request(|reply| Command::DeletePending {
            client_token,
            reply,
        })
        .await
    }

    pub fn jump_to_bottom(&self) -> Result<(), SessionError> {
        self.command(Command::JumpToBottom)
    }

    /// Drop the current timeline and load `channel_id`. Completions still in
    /// flight for the previous channel are ignored.
    pub fn switch_channel(
        &self,
        channel_id: ChannelId,
        starting_point: Option<i64>,
    ) -> Result<(), SessionError> {
        self.command(Command::SwitchChannel {
            channel_id,
            starting_point,
        })
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub fn close(&self) -> Result<(), SessionError> {
        self.command(Command::Close)
    }

    fn command(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::Shutdown)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.command(build(reply))?;
        response.await.map_err(|_| SessionError::Shutdown)
    }
}

/// The actor behind a [`SessionHandle`].
pub struct ChannelSession<T, S, M> {
    engine: TimelineEngine<M>,
    transport: Arc<T>,
    sender: Arc<S>,
    generations: Generations,
    /// A reset is outstanding; inputs it could overwrite wait in `deferred`.
    loading: bool,
    deferred: Vec<TimelineOp>,
    live: mpsc::UnboundedReceiver<LiveEvent>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    events: mpsc::UnboundedSender<EngineEvent>,
}

impl<T, S, M> ChannelSession<T, S, M>
where
    T: MessageTransport,
    S: MessageSender,
    M: RowMeasure + Send + 'static,
{
    /// Spawn a session for `channel_id` on the current tokio runtime and
    /// start the initial load.
    ///
    /// With a `starting_point` the initial page ends at that timestamp and
    /// newer pages are assumed to exist; without one the latest page loads.
    pub fn open(
        channel_id: ChannelId,
        config: TimelineConfig,
        transport: Arc<T>,
        sender: Arc<S>,
        measure: M,
        starting_point: Option<i64>,
    ) -> Result<(SessionHandle, mpsc::UnboundedReceiver<EngineEvent>), SessionError> {
        let engine = TimelineEngine::new(channel_id, config, measure)?;
        let live = transport.subscribe(engine.channel_id());
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut session = Self {
            engine,
            transport,
            sender,
            generations: Generations::default(),
            loading: false,
            deferred: Vec::new(),
            live,
            completions_tx,
            completions_rx,
            events: events_tx,
        };
        session.load_latest(starting_point);

        tokio::spawn(session.run(commands_rx));
        Ok((
            SessionHandle {
                commands: commands_tx,
            },
            events_rx,
        ))
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        tracing::info!(channel = %self.engine.channel_id(), "session started");
        self.flush_events();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Close) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(completion) = self.completions_rx.recv() => {
                    self.drain_ready(Some(completion), None);
                }
                Some(event) = self.live.recv() => {
                    self.drain_ready(None, Some(event));
                }
            }
            self.flush_events();
        }

        tracing::info!(channel = %self.engine.channel_id(), "session closed");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::RowWillDisplay(row) => {
                if self.loading {
                    tracing::debug!(row, "page fetch skipped while loading");
                } else if let Some(request) = self.engine.row_will_display(row) {
                    self.spawn_fetch(request);
                }
            }
            Command::ViewportDidChange {
                content_offset,
                viewport_extent,
            } => self.engine.viewport_did_change(content_offset, viewport_extent),
            Command::Send { payload, reply } => {
                let client_token = self.sender.issue_token();
                let record = self.engine.pending_record(client_token.clone(), payload);
                let accepted = self.engine.send_started(record.clone());
                if accepted {
                    self.spawn_delivery(record);
                }
                reply.send(accepted.then_some(client_token)).ok();
            }
            Command::Retry {
                client_token,
                reply,
            } => {
                let record = self.engine.retry_send(&client_token);
                let retried = record.is_some();
                if let Some(record) = record {
                    self.spawn_delivery(record);
                }
                reply.send(retried).ok();
            }
            Command::DeletePending {
                client_token,
                reply,
            } => {
                reply.send(self.engine.delete_pending(&client_token)).ok();
            }
            Command::JumpToBottom => {
                if self.engine.jump_to_bottom() {
                    self.load_latest(None);
                }
            }
            Command::SwitchChannel {
                channel_id,
                starting_point,
            } => {
                tracing::info!(from = %self.engine.channel_id(), to = %channel_id, "switching channel");
                self.generations.channel += 1;
                self.deferred.clear();
                self.engine.switch_channel(channel_id);
                self.live = self.transport.subscribe(self.engine.channel_id());
                self.load_latest(starting_point);
            }
            Command::Snapshot { reply } => {
                let cursor = self.engine.store().cursor();
                let snapshot = SessionSnapshot {
                    channel_id: self.engine.channel_id().clone(),
                    messages: self.engine.snapshot(),
                    indicator: self.engine.indicator(),
                    empty_view: self.engine.empty_view(),
                    has_older: cursor.has_older,
                    has_newer: cursor.has_newer,
                };
                reply.send(snapshot).ok();
            }
            Command::Close => {}
        }
    }

    /// Apply one input plus everything else already queued, as one batch.
    fn drain_ready(&mut self, completion: Option<Completion>, event: Option<LiveEvent>) {
        let mut ops = Vec::new();
        let mut completions: Vec<Completion> = completion.into_iter().collect();
        while let Ok(completion) = self.completions_rx.try_recv() {
            completions.push(completion);
        }
        let mut live: Vec<TimelineOp> = event.map(TimelineOp::Live).into_iter().collect();
        while let Ok(event) = self.live.try_recv() {
            live.push(TimelineOp::Live(event));
        }
        // The reset page may predate these events; replay them after it.
        if self.loading {
            self.deferred.extend(live);
        } else {
            ops.extend(live);
        }

        for completion in completions {
            if !self.generations.is_current(&completion) {
                tracing::debug!(
                    generation = completion.generation(),
                    "stale completion ignored"
                );
                continue;
            }
            match completion {
                Completion::Reset {
                    requested,
                    has_newer,
                    result,
                    ..
                } => {
                    self.engine.apply_batch(std::mem::take(&mut ops));
                    self.loading = false;
                    match result {
                        Ok(records) => {
                            let has_older = records.len() >= requested;
                            self.engine.reset(records, has_older, has_newer);
                        }
                        Err(error) => self.engine.initial_load_failed(error.to_string()),
                    }
                    ops.extend(self.take_deferred());
                }
                Completion::Page {
                    request, result, ..
                } => match result {
                    Ok(records) => ops.push(match request.direction {
                        FetchDirection::Older => TimelineOp::OlderPage {
                            records,
                            requested: request.limit,
                        },
                        FetchDirection::Newer => TimelineOp::NewerPage {
                            records,
                            requested: request.limit,
                        },
                    }),
                    Err(error) => self.engine.fetch_failed(request.direction, error.to_string()),
                },
                Completion::Send {
                    client_token,
                    result,
                    ..
                } => {
                    let op = match result {
                        Ok(record) => TimelineOp::SendSucceeded {
                            client_token,
                            record,
                        },
                        Err(error) => TimelineOp::SendFailed {
                            client_token,
                            reason: error.to_string(),
                        },
                    };
                    if self.loading {
                        self.deferred.push(op);
                    } else {
                        ops.push(op);
                    }
                }
            }
        }

        if !ops.is_empty() {
            self.engine.apply_batch(ops);
        }
    }

    /// Inputs held back during a load. Live events are dropped when nothing
    /// loaded, since the next successful load includes them.
    fn take_deferred(&mut self) -> Vec<TimelineOp> {
        let mut deferred = std::mem::take(&mut self.deferred);
        if !self.engine.is_loaded() {
            deferred.retain(|op| !matches!(op, TimelineOp::Live(_)));
        }
        if !deferred.is_empty() {
            tracing::debug!(count = deferred.len(), "replaying inputs held during load");
        }
        deferred
    }

    fn flush_events(&mut self) {
        for event in self.engine.take_events() {
            if self.events.send(event).is_err() {
                tracing::debug!("event receiver dropped");
                break;
            }
        }
    }

    /// Fetch the latest page (or the page ending at `starting_point`) and
    /// reset the timeline with it.
    fn load_latest(&mut self, starting_point: Option<i64>) {
        self.generations.load += 1;
        self.loading = true;
        let request = self.engine.initial_request(starting_point);
        let transport = Arc::clone(&self.transport);
        let channel_id = self.engine.channel_id().clone();
        let completions = self.completions_tx.clone();
        let generation = self.generations.load;

        tokio::spawn(async move {
            let result = transport
                .fetch_older(&channel_id, request.timestamp, request.limit)
                .await;
            completions
                .send(Completion::Reset {
                    generation,
                    requested: request.limit,
                    has_newer: starting_point.is_some(),
                    result,
                })
                .ok();
        });
    }

    fn spawn_fetch(&self, request: FetchRequest) {
        let transport = Arc::clone(&self.transport);
        let channel_id = self.engine.channel_id().clone();
        let completions = self.completions_tx.clone();
        let generation = self.generations.load;

        tokio::spawn(async move {
            let result = match request.direction {
                FetchDirection::Older => {
                    transport
                        .fetch_older(&channel_id, request.timestamp, request.limit)
                        .await
                }
                FetchDirection::Newer => {
                    transport
                        .fetch_newer(&channel_id, request.timestamp, request.limit)
                        .await
                }
            };
            completions
                .send(Completion::Page {
                    generation,
                    request,
                    result,
                })
                .ok();
        });
    }

    fn spawn_delivery(&self, record: MessageRecord) {
        let Some(client_token) = record.client_token.clone() else {
            return;
        };
        let sender = Arc::clone(&self.sender);
        let completions = self.completions_tx.clone();
        let generation = self.generations.channel;

        tokio::spawn(async move {
            let result = sender.deliver(record).await;
            completions
                .send(Completion::Send {
                    generation,
                    client_token,
                    result,
                })
                .ok();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageId, MessageStatus};
    use crate::timeline::{ChangeOrigin, MessageSource, PresentationInstruction};
    use crate::transport::InMemoryTransport;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::sync::{Notify, Semaphore};

    type Events = mpsc::UnboundedReceiver<EngineEvent>;

    /// Takes each older-page snapshot right away but holds the result until
    /// a permit is added to `gate`.
    struct GatedTransport {
        inner: InMemoryTransport,
        snapshot_taken: Notify,
        gate: Semaphore,
    }

    impl MessageTransport for GatedTransport {
        async fn fetch_older(
            &self,
            channel_id: &ChannelId,
            before: i64,
            limit: usize,
        ) -> Result<Vec<MessageRecord>, TransportError> {
            let page = self.inner.fetch_older(channel_id, before, limit).await;
            self.snapshot_taken.notify_one();
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            page
        }

        async fn fetch_newer(
            &self,
            channel_id: &ChannelId,
            after: i64,
            limit: usize,
        ) -> Result<Vec<MessageRecord>, TransportError> {
            self.inner.fetch_newer(channel_id, after, limit).await
        }

        fn subscribe(&self, channel_id: &ChannelId) -> mpsc::UnboundedReceiver<LiveEvent> {
            self.inner.subscribe(channel_id)
        }
    }

    fn gated() -> Arc<GatedTransport> {
        let inner = InMemoryTransport::new();
        inner.insert_history(
            &channel("general"),
            (1..=10).map(|i| msg("general", &format!("m{i}"), i * 100)).collect(),
        );
        Arc::new(GatedTransport {
            inner,
            snapshot_taken: Notify::new(),
            gate: Semaphore::new(0),
        })
    }

    fn open_gated(
        transport: &Arc<GatedTransport>,
        starting_point: Option<i64>,
    ) -> (SessionHandle, Events) {
        ChannelSession::open(
            channel("general"),
            config(),
            Arc::clone(transport),
            Arc::new(InMemoryTransport::new()),
            |_: &MessageRecord| 40.0,
            starting_point,
        )
        .unwrap()
    }

    fn channel(name: &str) -> ChannelId {
        ChannelId::new(name).unwrap()
    }

    fn msg(channel_name: &str, id: &str, created_at: i64) -> MessageRecord {
        MessageRecord::confirmed(id, channel(channel_name), created_at, MessagePayload::text(id))
            .with_sender("bob")
    }

    fn transport() -> Arc<InMemoryTransport> {
        let transport = Arc::new(InMemoryTransport::new());
        transport.insert_history(
            &channel("general"),
            (1..=10).map(|i| msg("general", &format!("m{i}"), i * 100)).collect(),
        );
        transport.insert_history(&channel("random"), vec![msg("random", "r1", 50)]);
        transport
    }

    fn config() -> TimelineConfig {
        TimelineConfig {
            page_size: 4,
            current_user_id: Some("me".to_string()),
            ..TimelineConfig::default()
        }
    }

    fn open(
        transport: &Arc<InMemoryTransport>,
        starting_point: Option<i64>,
    ) -> (SessionHandle, Events) {
        ChannelSession::open(
            channel("general"),
            config(),
            Arc::clone(transport),
            Arc::clone(transport),
            |_: &MessageRecord| 40.0,
            starting_point,
        )
        .unwrap()
    }

    async fn wait_for(events: &mut Events, matches: impl Fn(&EngineEvent) -> bool) -> EngineEvent {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = events.recv().await.expect("session dropped event channel");
                if matches(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    fn is_change(origin: ChangeOrigin) -> impl Fn(&EngineEvent) -> bool {
        move |event: &EngineEvent| {
            matches!(event, EngineEvent::Changed(change) if change.origin == origin)
        }
    }

    fn timestamps(snapshot: &SessionSnapshot) -> Vec<i64> {
        snapshot.messages.iter().map(|r| r.created_at).collect()
    }

    #[tokio::test]
    async fn initial_load_fetches_latest_page() {
        let transport = transport();
        let (handle, mut events) = open(&transport, None);
        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(timestamps(&snapshot), vec![700, 800, 900, 1_000]);
        assert!(snapshot.has_older);
        assert!(!snapshot.has_newer);
        assert_eq!(snapshot.empty_view, EmptyViewState::None);
    }

    #[tokio::test]
    async fn starting_point_loads_page_ending_there() {
        let transport = transport();
        let (handle, mut events) = open(&transport, Some(500));
        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(timestamps(&snapshot), vec![200, 300, 400, 500]);
        assert!(snapshot.has_newer);
        assert!(snapshot.indicator.visible);
    }

    #[tokio::test]
    async fn displaying_oldest_row_loads_older_page() {
        let transport = transport();
        let (handle, mut events) = open(&transport, None);
        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;

        handle.row_will_display(0).unwrap();
        wait_for(&mut events, is_change(ChangeOrigin::OlderPage)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(timestamps(&snapshot), vec![300, 400, 500, 600, 700, 800, 900, 1_000]);
    }

    #[tokio::test]
    async fn failed_fetch_is_reported() {
        let transport = transport();
        let (handle, mut events) = open(&transport, None);
        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;

        transport.fail_next(TransportError::Network("offline".to_string()));
        handle.row_will_display(0).unwrap();
        let event = wait_for(&mut events, |e| matches!(e, EngineEvent::FetchFailed { .. })).await;
        assert_eq!(
            event,
            EngineEvent::FetchFailed {
                direction: FetchDirection::Older,
                reason: "network error: offline".to_string(),
            }
        );
        assert!(handle.snapshot().await.unwrap().has_older);
    }

    #[tokio::test]
    async fn send_confirms_once_despite_echo() {
        let transport = transport();
        let (handle, mut events) = open(&transport, None);
        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;

        let token = handle.send(MessagePayload::text("hello")).await.unwrap();
        wait_for(&mut events, is_change(ChangeOrigin::PendingAdded)).await;
        wait_for(&mut events, |e| {
            matches!(e, EngineEvent::Changed(change) if matches!(change.origin, ChangeOrigin::Live(_)))
        })
        .await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.messages.len(), 5);
        let last = snapshot.messages.last().unwrap();
        assert!(last.is_confirmed());
        assert_eq!(last.client_token, Some(token));
        assert_eq!(last.sender_id.as_deref(), Some("me"));
    }

    #[tokio::test]
    async fn failed_send_stays_visible_until_retried() {
        let transport = transport();
        let (handle, mut events) = open(&transport, None);
        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;

        transport.fail_next(TransportError::Network("offline".to_string()));
        let token = handle.send(MessagePayload::text("hello")).await.unwrap();
        wait_for(&mut events, |e| matches!(e, EngineEvent::SendFailed { .. })).await;

        let snapshot = handle.snapshot().await.unwrap();
        let last = snapshot.messages.last().unwrap();
        assert_eq!(last.status, MessageStatus::Failed);

        assert!(handle.retry(token.clone()).await.unwrap());
        wait_for(&mut events, |e| {
            matches!(e, EngineEvent::Changed(change) if matches!(change.origin, ChangeOrigin::Live(_)))
        })
        .await;
        let snapshot = handle.snapshot().await.unwrap();
        assert!(snapshot.messages.iter().all(MessageRecord::is_confirmed));
        assert!(!handle.delete_pending(token).await.unwrap());
    }

    #[tokio::test]
    async fn jump_with_unloaded_newer_pages_reloads_latest() {
        let transport = transport();
        let (handle, mut events) = open(&transport, Some(300));
        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;

        handle.jump_to_bottom().unwrap();
        wait_for(&mut events, |e| matches!(e, EngineEvent::ReloadRequested)).await;
        let event = wait_for(&mut events, |e| matches!(e, EngineEvent::Present(_))).await;
        assert!(matches!(
            event,
            EngineEvent::Present(PresentationInstruction::Reload { .. })
        ));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(timestamps(&snapshot), vec![700, 800, 900, 1_000]);
        assert!(!snapshot.has_newer);
    }

    #[tokio::test]
    async fn live_events_from_backend_are_applied() {
        let transport = transport();
        let (handle, mut events) = open(&transport, None);
        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;

        transport.publish(
            &channel("general"),
            LiveEvent::Created(msg("general", "m11", 1_100)),
        );
        wait_for(&mut events, is_change(ChangeOrigin::Live(MessageSource::Received))).await;
        transport.publish(
            &channel("general"),
            LiveEvent::Deleted(MessageId::from("m7")),
        );
        wait_for(&mut events, is_change(ChangeOrigin::Delete)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(timestamps(&snapshot), vec![800, 900, 1_000, 1_100]);
    }

    #[tokio::test]
    async fn live_event_during_initial_load_survives_reset() {
        let transport = gated();
        let (handle, mut events) = open_gated(&transport, None);
        transport.snapshot_taken.notified().await;

        transport.inner.publish(
            &channel("general"),
            LiveEvent::Created(msg("general", "m11", 1_100)),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        transport.gate.add_permits(1);

        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;
        wait_for(&mut events, is_change(ChangeOrigin::Live(MessageSource::Received))).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(timestamps(&snapshot), vec![700, 800, 900, 1_000, 1_100]);
        assert!(!snapshot.has_newer);
    }

    #[tokio::test]
    async fn live_event_during_reload_survives_reset() {
        let transport = gated();
        transport.gate.add_permits(1);
        let (handle, mut events) = open_gated(&transport, Some(300));
        transport.snapshot_taken.notified().await;
        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;

        handle.jump_to_bottom().unwrap();
        transport.snapshot_taken.notified().await;
        transport.inner.publish(
            &channel("general"),
            LiveEvent::Created(msg("general", "m11", 1_100)),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        transport.gate.add_permits(1);

        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;
        wait_for(&mut events, is_change(ChangeOrigin::Live(MessageSource::Received))).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(timestamps(&snapshot), vec![700, 800, 900, 1_000, 1_100]);
        assert!(!snapshot.has_newer);
    }

    #[tokio::test]
    async fn failed_reload_leaves_older_pages_fetchable() {
        let transport = transport();
        let (handle, mut events) = open(&transport, Some(500));
        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;

        transport.fail_next(TransportError::Network("offline".to_string()));
        handle.jump_to_bottom().unwrap();
        wait_for(&mut events, |e| matches!(e, EngineEvent::FetchFailed { .. })).await;

        handle.row_will_display(0).unwrap();
        wait_for(&mut events, is_change(ChangeOrigin::OlderPage)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(timestamps(&snapshot), vec![100, 200, 300, 400, 500]);
    }

    #[tokio::test]
    async fn switch_channel_loads_new_timeline() {
        let transport = transport();
        let (handle, mut events) = open(&transport, None);
        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;

        handle.switch_channel(channel("random"), None).unwrap();
        wait_for(&mut events, is_change(ChangeOrigin::Reload)).await;

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.channel_id, channel("random"));
        assert_eq!(timestamps(&snapshot), vec![50]);
        assert!(!snapshot.has_older);
    }

    #[tokio::test]
    async fn closed_session_rejects_commands() {
        let transport = transport();
        let (handle, _events) = open(&transport, None);
        handle.close().unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if handle.snapshot().await.is_err() {
                    return;
                }
                tokio::task::yield_now().await;
            }
        })
        .await;
        assert!(result.is_ok());
        assert!(matches!(handle.jump_to_bottom(), Err(SessionError::Shutdown)));
    }
}
