use std::path::Path;

use chatline_core::state::EmptyViewState;
use chatline_core::timeline::{FetchRequest, NewMessageIndicator, PresentationAdapter, Viewport};
use chatline_core::{
    ChannelId, EngineEvent, MessagePayload, MessageRecord, TimelineConfig, TimelineEngine,
};
use serde::Serialize;

use crate::commands::common::{describe_event, format_timeline_lines};
use crate::error::CliError;
use crate::script::{Scenario, Step};
use crate::viewport::{KindMeasure, SimulatedViewport};

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub fetch: Option<FetchRequest>,
    pub events: Vec<EngineEvent>,
    pub viewport_ops: Vec<String>,
    pub offset: f64,
    pub indicator: NewMessageIndicator,
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub channel: ChannelId,
    pub steps: Vec<StepReport>,
    pub timeline: Vec<MessageRecord>,
    pub empty_view: EmptyViewState,
}

pub fn run_replay(script: &Path, config: TimelineConfig, as_json: bool) -> Result<(), CliError> {
    let scenario = Scenario::load(script)?;
    let report = replay(&scenario, scenario.effective_config(config))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_report_lines(&report) {
            println!("{line}");
        }
    }

    Ok(())
}

/// Run every step of `scenario` through a fresh engine and simulated viewport.
pub fn replay(scenario: &Scenario, config: TimelineConfig) -> Result<ReplayReport, CliError> {
    let mut replayer = Replayer::new(scenario, config)?;
    let mut steps = Vec::with_capacity(scenario.steps.len() + 1);

    replayer.engine.reset(
        scenario.initial_records(),
        scenario.initial.has_older,
        scenario.initial.has_newer,
    );
    steps.push(replayer.report(0, "initial", None));

    for (position, step) in scenario.steps.iter().enumerate() {
        let fetch = replayer.run_step(step)?;
        steps.push(replayer.report(position + 1, step.name(), fetch));
    }

    Ok(ReplayReport {
        channel: scenario.channel.clone(),
        steps,
        timeline: replayer.engine.snapshot(),
        empty_view: replayer.engine.empty_view(),
    })
}

pub fn format_report_lines(report: &ReplayReport) -> Vec<String> {
    let mut lines = vec![format!("channel {}", report.channel)];
    for step in &report.steps {
        lines.push(format!("[{}] {}", step.index, step.op));
        if let Some(fetch) = &step.fetch {
            lines.push(format!(
                "    fetch: {} from {} (limit {})",
                fetch.direction, fetch.timestamp, fetch.limit
            ));
        }
        for event in &step.events {
            lines.push(format!("    {}", describe_event(event)));
        }
        for op in &step.viewport_ops {
            lines.push(format!("    viewport: {op}"));
        }
    }
    lines.push(format!("timeline ({} rows):", report.timeline.len()));
    lines.extend(format_timeline_lines(&report.timeline));
    lines
}

struct Replayer {
    engine: TimelineEngine<KindMeasure>,
    adapter: PresentationAdapter<SimulatedViewport>,
    viewport_extent: f64,
}

impl Replayer {
    fn new(scenario: &Scenario, config: TimelineConfig) -> Result<Self, CliError> {
        let mut engine = TimelineEngine::new(scenario.channel.clone(), config, KindMeasure)?;
        engine.viewport_did_change(0.0, scenario.viewport_extent);
        Ok(Self {
            engine,
            adapter: PresentationAdapter::new(SimulatedViewport::new(scenario.viewport_extent)),
            viewport_extent: scenario.viewport_extent,
        })
    }

    fn run_step(&mut self, step: &Step) -> Result<Option<FetchRequest>, CliError> {
        let channel_id = self.engine.channel_id().clone();
        let page_size = self.engine.config().page_size;

        match step {
            Step::OlderPage { .. }
            | Step::NewerPage { .. }
            | Step::Live { .. }
            | Step::Update { .. }
            | Step::Delete { .. }
            | Step::Confirm { .. }
            | Step::Fail { .. } => {
                let op = step.to_op(&channel_id, page_size)?;
                self.engine.apply_batch(vec![op]);
            }
            Step::Batch { steps } => {
                let ops = steps
                    .iter()
                    .map(|step| step.to_op(&channel_id, page_size))
                    .collect::<Result<Vec<_>, _>>()?;
                self.engine.apply_batch(ops);
            }
            Step::FetchFailed { direction, reason } => {
                self.engine.fetch_failed(
                    *direction,
                    reason.clone().unwrap_or_else(|| "fetch failed".to_string()),
                );
            }
            Step::Send { token, body } => {
                let payload = MessagePayload::text(body.clone().unwrap_or_default());
                let record = self.engine.pending_record(token.clone(), payload);
                if !self.engine.send_started(record) {
                    tracing::warn!(client_token = %token, "send rejected");
                }
            }
            Step::Retry { token } => {
                if self.engine.retry_send(token).is_none() {
                    tracing::warn!(client_token = %token, "nothing to retry");
                }
            }
            Step::DeletePending { token } => {
                if !self.engine.delete_pending(token) {
                    tracing::warn!(client_token = %token, "no pending message to delete");
                }
            }
            Step::Scroll { offset } => {
                let offset = self.adapter.viewport_mut().scroll_to(*offset);
                self.engine.viewport_did_change(offset, self.viewport_extent);
                // Rows scrolled into view are displayed, and may need a page.
                return Ok(self
                    .adapter
                    .viewport()
                    .visible_rows()
                    .find_map(|row| self.engine.row_will_display(row)));
            }
            Step::RowVisible { row } => return Ok(self.engine.row_will_display(*row)),
            Step::JumpToBottom { latest } => {
                if self.engine.jump_to_bottom() {
                    let records: Vec<_> = latest
                        .iter()
                        .map(|message| message.to_record(&channel_id))
                        .collect();
                    let has_older = records.len() >= page_size;
                    self.engine.reset(records, has_older, false);
                }
            }
        }

        Ok(None)
    }

    /// Push pending engine events through the adapter and snapshot the result.
    fn report(&mut self, index: usize, op: &'static str, fetch: Option<FetchRequest>) -> StepReport {
        let events = self.engine.take_events();
        self.adapter
            .viewport_mut()
            .sync_rows(self.engine.store().full_view());
        for event in &events {
            match event {
                EngineEvent::Present(instruction) => self.adapter.apply(instruction),
                EngineEvent::IndicatorChanged(indicator) => self.adapter.set_indicator(*indicator),
                _ => {}
            }
        }

        let viewport = self.adapter.viewport_mut();
        let viewport_ops = viewport.take_log();
        StepReport {
            index,
            op,
            fetch,
            events,
            viewport_ops,
            offset: self.engine.viewport_state().content_offset,
            indicator: self.adapter.viewport().indicator(),
        }
    }
}
