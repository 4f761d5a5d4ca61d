//! Shared cross-platform state types.

use serde::Serialize;

/// Placeholder shown in place of the message list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyViewState {
    /// List has rows; no placeholder.
    None,
    /// Initial load still running.
    Loading,
    /// Initial load finished and the channel has no messages.
    NoMessages,
    /// Initial load failed; the UI offers a retry.
    Error,
}
