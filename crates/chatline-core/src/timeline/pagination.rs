//! Pagination cursor and the policy that turns row visibility into fetches.

use serde::{Deserialize, Serialize};

use crate::config::TimelineConfig;

/// Direction of a page fetch relative to the loaded range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchDirection {
    Older,
    Newer,
}

impl std::fmt::Display for FetchDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Older => f.write_str("older"),
            Self::Newer => f.write_str("newer"),
        }
    }
}

/// A page request handed to the transport.
///
/// `timestamp` is exclusive: older pages end before it, newer pages start
/// after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchRequest {
    pub direction: FetchDirection,
    pub timestamp: i64,
    pub limit: usize,
}

/// What is known about the unloaded parts of the channel, plus one in-flight
/// flag per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PaginationCursor {
    pub has_older: bool,
    pub has_newer: bool,
    older_in_flight: bool,
    newer_in_flight: bool,
}

impl PaginationCursor {
    #[must_use]
    pub const fn new(has_older: bool, has_newer: bool) -> Self {
        Self {
            has_older,
            has_newer,
            older_in_flight: false,
            newer_in_flight: false,
        }
    }

    #[must_use]
    pub const fn has_more(&self, direction: FetchDirection) -> bool {
        match direction {
            FetchDirection::Older => self.has_older,
            FetchDirection::Newer => self.has_newer,
        }
    }

    #[must_use]
    pub const fn in_flight(&self, direction: FetchDirection) -> bool {
        match direction {
            FetchDirection::Older => self.older_in_flight,
            FetchDirection::Newer => self.newer_in_flight,
        }
    }

    /// Whether a fetch in `direction` may start now.
    #[must_use]
    pub const fn can_fetch(&self, direction: FetchDirection) -> bool {
        self.has_more(direction) && !self.in_flight(direction)
    }

    /// Mark a fetch as started. Returns `false` when one is already running
    /// or nothing is left to load.
    pub fn try_begin(&mut self, direction: FetchDirection) -> bool {
        if !self.can_fetch(direction) {
            return false;
        }
        *self.flag_mut(direction) = true;
        true
    }

    /// Record a completed page: a short page means the end was reached.
    pub fn complete(&mut self, direction: FetchDirection, returned: usize, requested: usize) {
        *self.flag_mut(direction) = false;
        let has_more = returned >= requested;
        match direction {
            FetchDirection::Older => self.has_older = has_more,
            FetchDirection::Newer => self.has_newer = has_more,
        }
    }

    /// Record a failed fetch. Availability is left unchanged.
    pub fn fail(&mut self, direction: FetchDirection) {
        *self.flag_mut(direction) = false;
    }

    fn flag_mut(&mut self, direction: FetchDirection) -> &mut bool {
        match direction {
            FetchDirection::Older => &mut self.older_in_flight,
            FetchDirection::Newer => &mut self.newer_in_flight,
        }
    }
}

/// Decides which page, if any, a row about to be displayed should trigger.
///
/// Rows are indexed chronologically: row 0 is the oldest loaded row and
/// `total_rows - 1` the newest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationPolicy {
    older_lookahead_rows: usize,
    newer_trigger_rows: usize,
}

impl PaginationPolicy {
    #[must_use]
    pub const fn new(older_lookahead_rows: usize, newer_trigger_rows: usize) -> Self {
        Self {
            older_lookahead_rows,
            newer_trigger_rows,
        }
    }

    #[must_use]
    pub fn from_config(config: &TimelineConfig) -> Self {
        Self::new(config.older_lookahead_rows(), config.newer_trigger_rows)
    }

    /// Older pages win when both windows match, e.g. on a short timeline.
    #[must_use]
    pub fn evaluate(
        &self,
        row: usize,
        total_rows: usize,
        cursor: &PaginationCursor,
    ) -> Option<FetchDirection> {
        if row >= total_rows {
            return None;
        }

        if row < self.older_lookahead_rows && cursor.can_fetch(FetchDirection::Older) {
            return Some(FetchDirection::Older);
        }

        let rows_to_newest = total_rows - row;
        if rows_to_newest <= self.newer_trigger_rows && cursor.can_fetch(FetchDirection::Newer) {
            return Some(FetchDirection::Newer);
        }

        None
    }
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self::from_config(&TimelineConfig::default())
    }
}
