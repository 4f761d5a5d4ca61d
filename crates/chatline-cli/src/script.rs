//! Scenario scripts: an initial page plus a list of timeline inputs.

use std::path::Path;

use chatline_core::timeline::{FetchDirection, TimelineOp};
use chatline_core::{
    ChannelId, ClientToken, LiveEvent, MessageId, MessagePayload, MessageRecord, TimelineConfig,
};
use serde::Deserialize;

use crate::error::CliError;

const DEFAULT_VIEWPORT_EXTENT: f64 = 600.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub channel: ChannelId,
    #[serde(default = "default_viewport_extent")]
    pub viewport_extent: f64,
    /// Overrides the config file for this scenario.
    #[serde(default)]
    pub config: Option<TimelineConfig>,
    #[serde(default)]
    pub initial: InitialPage,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitialPage {
    #[serde(default)]
    pub messages: Vec<ScriptMessage>,
    #[serde(default)]
    pub has_older: bool,
    #[serde(default)]
    pub has_newer: bool,
}

/// Compact message notation; the channel comes from the scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptMessage {
    pub id: MessageId,
    pub at: i64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub payload: Option<MessagePayload>,
    #[serde(default)]
    pub token: Option<ClientToken>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub parent: Option<MessageId>,
    /// Edit time; older edits than the loaded copy are ignored.
    #[serde(default)]
    pub edited_at: Option<i64>,
}

impl ScriptMessage {
    pub fn to_record(&self, channel_id: &ChannelId) -> MessageRecord {
        let payload = self.payload.clone().unwrap_or_else(|| {
            MessagePayload::text(self.body.clone().unwrap_or_else(|| self.id.to_string()))
        });
        let mut record =
            MessageRecord::confirmed(self.id.clone(), channel_id.clone(), self.at, payload);
        record.client_token.clone_from(&self.token);
        record.sender_id.clone_from(&self.sender);
        record.parent_id.clone_from(&self.parent);
        record.updated_at = self.edited_at;
        record
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    OlderPage {
        messages: Vec<ScriptMessage>,
        #[serde(default)]
        requested: Option<usize>,
    },
    NewerPage {
        messages: Vec<ScriptMessage>,
        #[serde(default)]
        requested: Option<usize>,
    },
    FetchFailed {
        direction: FetchDirection,
        #[serde(default)]
        reason: Option<String>,
    },
    Live {
        message: ScriptMessage,
    },
    Update {
        message: ScriptMessage,
    },
    Delete {
        id: MessageId,
    },
    Send {
        token: ClientToken,
        #[serde(default)]
        body: Option<String>,
    },
    Confirm {
        token: ClientToken,
        message: ScriptMessage,
    },
    Fail {
        token: ClientToken,
        #[serde(default)]
        reason: Option<String>,
    },
    Retry {
        token: ClientToken,
    },
    DeletePending {
        token: ClientToken,
    },
    Scroll {
        offset: f64,
    },
    RowVisible {
        row: usize,
    },
    JumpToBottom {
        /// Latest page served when newer pages are unloaded.
        #[serde(default)]
        latest: Vec<ScriptMessage>,
    },
    /// Inputs that arrive together and reconcile as one batch.
    Batch {
        steps: Vec<Step>,
    },
}

impl Step {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OlderPage { .. } => "older_page",
            Self::NewerPage { .. } => "newer_page",
            Self::FetchFailed { .. } => "fetch_failed",
            Self::Live { .. } => "live",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Send { .. } => "send",
            Self::Confirm { .. } => "confirm",
            Self::Fail { .. } => "fail",
            Self::Retry { .. } => "retry",
            Self::DeletePending { .. } => "delete_pending",
            Self::Scroll { .. } => "scroll",
            Self::RowVisible { .. } => "row_visible",
            Self::JumpToBottom { .. } => "jump_to_bottom",
            Self::Batch { .. } => "batch",
        }
    }

    /// Convert a batchable step into an engine input.
    pub fn to_op(&self, channel_id: &ChannelId, page_size: usize) -> Result<TimelineOp, CliError> {
        let records = |messages: &[ScriptMessage]| {
            messages
                .iter()
                .map(|message| message.to_record(channel_id))
                .collect::<Vec<_>>()
        };
        let op = match self {
            Self::OlderPage {
                messages,
                requested,
            } => TimelineOp::OlderPage {
                records: records(messages),
                requested: requested.unwrap_or(page_size),
            },
            Self::NewerPage {
                messages,
                requested,
            } => TimelineOp::NewerPage {
                records: records(messages),
                requested: requested.unwrap_or(page_size),
            },
            Self::Live { message } => TimelineOp::Live(LiveEvent::Created(message.to_record(channel_id))),
            Self::Update { message } => {
                TimelineOp::Live(LiveEvent::Updated(message.to_record(channel_id)))
            }
            Self::Delete { id } => TimelineOp::Live(LiveEvent::Deleted(id.clone())),
            Self::Confirm { token, message } => TimelineOp::SendSucceeded {
                client_token: token.clone(),
                record: message.to_record(channel_id),
            },
            Self::Fail { token, reason } => TimelineOp::SendFailed {
                client_token: token.clone(),
                reason: reason.clone().unwrap_or_else(|| "send failed".to_string()),
            },
            other => {
                return Err(CliError::Script(format!(
                    "`{}` steps cannot be part of a batch",
                    other.name()
                )))
            }
        };
        Ok(op)
    }
}

impl Scenario {
    pub fn parse(raw: &str) -> Result<Self, CliError> {
        let scenario: Self = serde_json::from_str(raw)?;
        if !scenario.viewport_extent.is_finite() || scenario.viewport_extent <= 0.0 {
            return Err(CliError::Script(
                "viewport_extent must be a positive number".to_string(),
            ));
        }
        if let Some(config) = &scenario.config {
            config.validate()?;
        }
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self, CliError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Scenario config when present, otherwise `fallback`.
    pub fn effective_config(&self, fallback: TimelineConfig) -> TimelineConfig {
        self.config.clone().unwrap_or(fallback)
    }

    pub fn initial_records(&self) -> Vec<MessageRecord> {
        self.initial
            .messages
            .iter()
            .map(|message| message.to_record(&self.channel))
            .collect()
    }
}

const fn default_viewport_extent() -> f64 {
    DEFAULT_VIEWPORT_EXTENT
}
