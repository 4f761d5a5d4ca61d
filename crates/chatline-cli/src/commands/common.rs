use std::env;
use std::path::{Path, PathBuf};

use chatline_core::timeline::{ChangeOrigin, PresentationInstruction};
use chatline_core::util::compact_text;
use chatline_core::{EngineEvent, MessageRecord, MessageStatus, TimelineConfig};

use crate::error::CliError;

pub const CONFIG_ENV_VAR: &str = "CHATLINE_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "chatline.json";
const PREVIEW_CHARS: usize = 48;

/// Explicit path, then `$CHATLINE_CONFIG`, then `./chatline.json`.
pub fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path
        .or_else(|| {
            env::var(CONFIG_ENV_VAR)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

pub fn load_config(path: &Path) -> Result<TimelineConfig, CliError> {
    Ok(TimelineConfig::load_from_path(path)?)
}

pub fn describe_event(event: &EngineEvent) -> String {
    match event {
        EngineEvent::Changed(change) => format!(
            "changed: {} +{} -{} ~{} ({} -> {} rows)",
            describe_origin(change.origin),
            change.inserted.len(),
            change.removed.len(),
            change.updated.len(),
            change.len_before,
            change.len_after
        ),
        EngineEvent::Present(instruction) => describe_instruction(instruction),
        EngineEvent::IndicatorChanged(indicator) => {
            if indicator.visible {
                format!("indicator: visible, {} new", indicator.count)
            } else {
                "indicator: hidden".to_string()
            }
        }
        EngineEvent::EmptyViewChanged(state) => format!("empty view: {state:?}"),
        EngineEvent::FetchFailed { direction, reason } => {
            format!("fetch failed: {direction} ({})", compact_text(reason))
        }
        EngineEvent::SendFailed {
            client_token,
            reason,
        } => format!("send failed: {client_token} ({})", compact_text(reason)),
        EngineEvent::ReloadRequested => "reload requested".to_string(),
    }
}

fn describe_origin(origin: ChangeOrigin) -> String {
    match origin {
        ChangeOrigin::Live(source) => format!("live/{source:?}"),
        other => format!("{other:?}"),
    }
}

fn describe_instruction(instruction: &PresentationInstruction) -> String {
    let mut line = format!("present: {}", instruction.name());
    if let PresentationInstruction::InsertRowsAndScrollToAnchor { anchor_row, .. } = instruction {
        line.push_str(&format!(" row={anchor_row}"));
    }
    if let Some(offset) = instruction.offset() {
        line.push_str(&format!(" offset={offset:.1}"));
    }
    line
}

pub fn format_timeline_lines(records: &[MessageRecord]) -> Vec<String> {
    records
        .iter()
        .enumerate()
        .map(|(row, record)| {
            let identity = record.id.as_ref().map_or_else(
                || {
                    record
                        .client_token
                        .as_ref()
                        .map_or_else(|| "-".to_string(), |token| format!("local:{token}"))
                },
                ToString::to_string,
            );
            let status = match record.status {
                MessageStatus::Pending => " [pending]",
                MessageStatus::Failed => " [failed]",
                MessageStatus::Succeeded => "",
            };
            format!(
                "{row:>4}  {:>14}  {identity}{status}  {}",
                record.created_at,
                record.payload.preview(PREVIEW_CHARS)
            )
        })
        .collect()
}
