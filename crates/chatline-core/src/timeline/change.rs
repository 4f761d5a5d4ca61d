//! Change descriptors emitted by the timeline store.

use serde::Serialize;

use crate::models::MessageRecord;

/// Where a live message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    /// Sent by the current user, from this device or another one.
    LocalSend,
    /// Sent by someone else.
    Received,
    /// Origin not known; handled conservatively.
    Unspecified,
}

/// The mutation that produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "origin", content = "source", rename_all = "snake_case")]
pub enum ChangeOrigin {
    OlderPage,
    NewerPage,
    Live(MessageSource),
    PendingAdded,
    Edit,
    StatusChanged,
    Delete,
    Reload,
}

/// A row removed from the previous full view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedRow {
    /// Index in the full view before the change.
    pub index: usize,
    pub record: MessageRecord,
}

/// Immutable description of one store mutation.
///
/// Batch semantics: `removed` indices refer to the full view before the
/// change and apply first; `inserted` and `updated` indices refer to the full
/// view after it. All index lists are ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineChange {
    pub origin: ChangeOrigin,
    pub removed: Vec<RemovedRow>,
    pub inserted: Vec<usize>,
    pub updated: Vec<usize>,
    /// Messages new to the timeline; confirmations of local sends do not count.
    pub arrivals: usize,
    /// Whether newer pages remain unloaded after the change.
    pub has_newer: bool,
    pub len_before: usize,
    pub len_after: usize,
}

impl TimelineChange {
    pub(crate) const fn new(origin: ChangeOrigin, len_before: usize) -> Self {
        Self {
            origin,
            removed: Vec::new(),
            inserted: Vec::new(),
            updated: Vec::new(),
            arrivals: 0,
            has_newer: false,
            len_before,
            len_after: len_before,
        }
    }

    #[must_use]
    pub fn removed_indices(&self) -> Vec<usize> {
        self.removed.iter().map(|row| row.index).collect()
    }

    /// Whether rows were added or removed, as opposed to replaced.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        !self.removed.is_empty() || !self.inserted.is_empty()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.is_structural() && self.updated.is_empty() && self.origin != ChangeOrigin::Reload
    }
}
