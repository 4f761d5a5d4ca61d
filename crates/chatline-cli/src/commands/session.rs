use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chatline_core::transport::InMemoryTransport;
use chatline_core::{
    ChannelSession, ClientToken, EngineEvent, LiveEvent, MessagePayload, SessionHandle,
    TimelineConfig, TransportError,
};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::commands::common::{describe_event, format_timeline_lines};
use crate::error::CliError;
use crate::script::{Scenario, ScriptMessage, Step};
use crate::viewport::KindMeasure;

const SETTLE_WINDOW: Duration = Duration::from_millis(50);

/// Drive a scenario through a live session backed by the in-memory transport.
///
/// Page steps only seed history here; the session fetches them itself when
/// `row_visible` steps reach the edges.
pub async fn run_session(
    script: &Path,
    starting_point: Option<i64>,
    config: TimelineConfig,
) -> Result<(), CliError> {
    let scenario = Scenario::load(script)?;
    let config = scenario.effective_config(config);
    let transport = Arc::new(InMemoryTransport::new());
    transport.insert_history(&scenario.channel, seed_records(&scenario));

    let (handle, mut events) = ChannelSession::open(
        scenario.channel.clone(),
        config,
        Arc::clone(&transport),
        Arc::clone(&transport),
        KindMeasure,
        starting_point,
    )?;
    handle.viewport_did_change(0.0, scenario.viewport_extent)?;

    println!("[0] open {}", scenario.channel);
    settle(&mut events).await;

    let mut driver = SessionDriver {
        scenario: &scenario,
        transport: &transport,
        handle: &handle,
        tokens: HashMap::new(),
    };
    for (position, step) in scenario.steps.iter().enumerate() {
        println!("[{}] {}", position + 1, step.name());
        driver.run_step(step).await?;
        settle(&mut events).await;
    }

    let snapshot = handle.snapshot().await?;
    println!(
        "timeline ({} rows, has_older={}, has_newer={}):",
        snapshot.messages.len(),
        snapshot.has_older,
        snapshot.has_newer
    );
    for line in format_timeline_lines(&snapshot.messages) {
        println!("{line}");
    }
    handle.close()?;
    Ok(())
}

fn seed_records(scenario: &Scenario) -> Vec<chatline_core::MessageRecord> {
    let mut messages: Vec<&ScriptMessage> = scenario.initial.messages.iter().collect();
    collect_page_messages(&scenario.steps, &mut messages);
    messages
        .into_iter()
        .map(|message| message.to_record(&scenario.channel))
        .collect()
}

fn collect_page_messages<'a>(steps: &'a [Step], out: &mut Vec<&'a ScriptMessage>) {
    for step in steps {
        match step {
            Step::OlderPage { messages, .. } | Step::NewerPage { messages, .. } => {
                out.extend(messages.iter());
            }
            Step::JumpToBottom { latest } => out.extend(latest.iter()),
            Step::Batch { steps } => collect_page_messages(steps, out),
            _ => {}
        }
    }
}

async fn settle(events: &mut mpsc::UnboundedReceiver<EngineEvent>) {
    while let Ok(Some(event)) = timeout(SETTLE_WINDOW, events.recv()).await {
        println!("    {}", describe_event(&event));
    }
}

struct SessionDriver<'a> {
    scenario: &'a Scenario,
    transport: &'a InMemoryTransport,
    handle: &'a SessionHandle,
    /// Script tokens mapped to the tokens the session issued.
    tokens: HashMap<ClientToken, ClientToken>,
}

impl SessionDriver<'_> {
    async fn run_step(&mut self, step: &Step) -> Result<(), CliError> {
        let channel_id = &self.scenario.channel;
        match step {
            Step::OlderPage { .. } | Step::NewerPage { .. } => {
                tracing::debug!(step = step.name(), "page served from seeded history");
            }
            Step::FetchFailed { reason, .. } => {
                self.transport.fail_next(TransportError::Network(
                    reason.clone().unwrap_or_else(|| "fetch failed".to_string()),
                ));
            }
            Step::Live { message } => self
                .transport
                .publish(channel_id, LiveEvent::Created(message.to_record(channel_id))),
            Step::Update { message } => self
                .transport
                .publish(channel_id, LiveEvent::Updated(message.to_record(channel_id))),
            Step::Delete { id } => self
                .transport
                .publish(channel_id, LiveEvent::Deleted(id.clone())),
            Step::Send { token, body } => {
                let payload = MessagePayload::text(body.clone().unwrap_or_default());
                let issued = self.handle.send(payload).await?;
                self.tokens.insert(token.clone(), issued);
            }
            Step::Fail { reason, .. } => {
                // The next delivery fails instead.
                self.transport.fail_next(TransportError::Rejected(
                    reason.clone().unwrap_or_else(|| "send failed".to_string()),
                ));
            }
            Step::Retry { token } => {
                let issued = self.issued(token);
                if !self.handle.retry(issued).await? {
                    tracing::warn!(client_token = %token, "nothing to retry");
                }
            }
            Step::DeletePending { token } => {
                let issued = self.issued(token);
                if !self.handle.delete_pending(issued).await? {
                    tracing::warn!(client_token = %token, "no pending message to delete");
                }
            }
            Step::Scroll { offset } => self
                .handle
                .viewport_did_change(*offset, self.scenario.viewport_extent)?,
            Step::RowVisible { row } => self.handle.row_will_display(*row)?,
            Step::JumpToBottom { .. } => self.handle.jump_to_bottom()?,
            Step::Confirm { token, .. } => {
                tracing::warn!(client_token = %token, "confirm steps are replay-only; skipped");
            }
            Step::Batch { steps } => {
                for step in steps {
                    Box::pin(self.run_step(step)).await?;
                }
            }
        }
        Ok(())
    }

    fn issued(&self, token: &ClientToken) -> ClientToken {
        self.tokens.get(token).cloned().unwrap_or_else(|| token.clone())
    }
}
