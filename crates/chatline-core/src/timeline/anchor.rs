//! Scroll anchoring: turns store changes into presentation instructions that
//! keep the user's visible content still, or follow the live end.
//!
//! Layout is chronological. Row 0 (the oldest loaded message) sits at the top
//! of the content and `content_offset` is measured from that top edge.

use serde::Serialize;

use crate::config::TimelineConfig;
use crate::models::{MessageRecord, RowKey};

use super::change::{ChangeOrigin, MessageSource, TimelineChange};

/// Layout extent of a rendered row.
pub trait RowMeasure {
    fn row_extent(&self, record: &MessageRecord) -> f64;
}

impl<F> RowMeasure for F
where
    F: Fn(&MessageRecord) -> f64,
{
    fn row_extent(&self, record: &MessageRecord) -> f64 {
        self(record)
    }
}

/// The row pinned at the top edge of the viewport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrollAnchor {
    pub key: RowKey,
    /// How far the viewport top sits below the row's top edge.
    pub offset_within_row: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewportState {
    pub content_offset: f64,
    pub viewport_extent: f64,
    pub content_extent: f64,
    pub anchor: Option<ScrollAnchor>,
}

impl ViewportState {
    /// Describe a viewport showing `view` at `content_offset`.
    pub fn capture(
        view: &[MessageRecord],
        measure: &impl RowMeasure,
        content_offset: f64,
        viewport_extent: f64,
    ) -> Self {
        let mut state = Self {
            content_offset,
            viewport_extent,
            content_extent: content_extent(view, measure),
            anchor: None,
        };
        state.settle(view, measure, content_offset);
        state
    }

    /// Distance between the viewport's bottom edge and the live end.
    #[must_use]
    pub fn distance_from_bottom(&self) -> f64 {
        (self.content_extent - (self.content_offset + self.viewport_extent)).max(0.0)
    }

    #[must_use]
    pub fn is_near_bottom(&self, threshold: f64) -> bool {
        self.distance_from_bottom() <= threshold
    }

    #[must_use]
    pub fn max_offset(&self) -> f64 {
        (self.content_extent - self.viewport_extent).max(0.0)
    }

    /// Move to `offset` (clamped) and recompute the anchor.
    fn settle(&mut self, view: &[MessageRecord], measure: &impl RowMeasure, offset: f64) {
        self.content_offset = offset.clamp(0.0, self.max_offset());
        self.anchor = None;

        let mut top = 0.0;
        for record in view {
            let bottom = top + measure.row_extent(record);
            if bottom > self.content_offset {
                self.anchor = record.row_key().map(|key| ScrollAnchor {
                    key,
                    offset_within_row: self.content_offset - top,
                });
                return;
            }
            top = bottom;
        }
    }
}

/// "N new messages" affordance plus the scroll-to-bottom button it drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NewMessageIndicator {
    pub visible: bool,
    pub count: usize,
}

/// What the presentation layer should do after a change.
///
/// Row indices follow [`TimelineChange`]: `removed` against the old view,
/// `inserted`/`updated` against the new one. `offset` is the content offset
/// to end up at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "instruction", rename_all = "snake_case")]
pub enum PresentationInstruction {
    InsertRowsPreservingOffset {
        removed: Vec<usize>,
        inserted: Vec<usize>,
        updated: Vec<usize>,
        offset: f64,
    },
    InsertRowsAndScrollToAnchor {
        removed: Vec<usize>,
        inserted: Vec<usize>,
        updated: Vec<usize>,
        anchor_row: usize,
        offset: f64,
        indicator: NewMessageIndicator,
    },
    InsertRowsAndShowNewMessageIndicator {
        removed: Vec<usize>,
        inserted: Vec<usize>,
        updated: Vec<usize>,
        offset: f64,
        indicator: NewMessageIndicator,
    },
    ReplaceRowInPlace {
        rows: Vec<usize>,
    },
    RemoveRow {
        rows: Vec<usize>,
        offset: f64,
    },
    /// Scroll without structural changes, e.g. a jump to the newest row.
    ScrollToRow {
        row: usize,
        offset: f64,
        indicator: NewMessageIndicator,
    },
    Reload {
        offset: f64,
        indicator: NewMessageIndicator,
    },
}

impl PresentationInstruction {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InsertRowsPreservingOffset { .. } => "insert_rows_preserving_offset",
            Self::InsertRowsAndScrollToAnchor { .. } => "insert_rows_and_scroll_to_anchor",
            Self::InsertRowsAndShowNewMessageIndicator { .. } => {
                "insert_rows_and_show_new_message_indicator"
            }
            Self::ReplaceRowInPlace { .. } => "replace_row_in_place",
            Self::RemoveRow { .. } => "remove_row",
            Self::ScrollToRow { .. } => "scroll_to_row",
            Self::Reload { .. } => "reload",
        }
    }

    /// Target content offset, for instructions that carry one.
    #[must_use]
    pub const fn offset(&self) -> Option<f64> {
        match self {
            Self::InsertRowsPreservingOffset { offset, .. }
            | Self::InsertRowsAndScrollToAnchor { offset, .. }
            | Self::InsertRowsAndShowNewMessageIndicator { offset, .. }
            | Self::RemoveRow { offset, .. }
            | Self::ScrollToRow { offset, .. }
            | Self::Reload { offset, .. } => Some(*offset),
            Self::ReplaceRowInPlace { .. } => None,
        }
    }

    #[must_use]
    pub const fn indicator(&self) -> Option<NewMessageIndicator> {
        match self {
            Self::InsertRowsAndScrollToAnchor { indicator, .. }
            | Self::InsertRowsAndShowNewMessageIndicator { indicator, .. }
            | Self::ScrollToRow { indicator, .. }
            | Self::Reload { indicator, .. } => Some(*indicator),
            _ => None,
        }
    }
}

/// Decides, per change, whether to hold the anchored content still, follow
/// the live end, or surface a new-message indicator.
#[derive(Debug, Clone)]
pub struct ScrollAnchorReconciler {
    near_bottom_distance: f64,
    follow_local_sends: bool,
    indicator: NewMessageIndicator,
}

impl ScrollAnchorReconciler {
    #[must_use]
    pub const fn new(near_bottom_distance: f64, follow_local_sends: bool) -> Self {
        Self {
            near_bottom_distance,
            follow_local_sends,
            indicator: NewMessageIndicator {
                visible: false,
                count: 0,
            },
        }
    }

    #[must_use]
    pub const fn from_config(config: &TimelineConfig) -> Self {
        Self::new(config.near_bottom_distance, config.follow_local_sends)
    }

    #[must_use]
    pub const fn indicator(&self) -> NewMessageIndicator {
        self.indicator
    }

    #[must_use]
    pub const fn near_bottom_distance(&self) -> f64 {
        self.near_bottom_distance
    }

    /// Reconcile one change. `view` is the full view after the change and
    /// `viewport` the state before it; `viewport` is updated in place.
    pub fn reconcile(
        &mut self,
        change: &TimelineChange,
        view: &[MessageRecord],
        viewport: &mut ViewportState,
        measure: &impl RowMeasure,
    ) -> PresentationInstruction {
        let was_near_bottom = viewport.is_near_bottom(self.near_bottom_distance);
        let previous = viewport.clone();
        viewport.content_extent = content_extent(view, measure);

        if change.origin == ChangeOrigin::Reload {
            self.indicator = NewMessageIndicator {
                visible: change.has_newer,
                count: 0,
            };
            let bottom = viewport.max_offset();
            viewport.settle(view, measure, bottom);
            return PresentationInstruction::Reload {
                offset: viewport.content_offset,
                indicator: self.indicator,
            };
        }

        if !change.is_structural() {
            let offset =
                anchored_offset(&previous, view, measure).unwrap_or(previous.content_offset);
            viewport.settle(view, measure, offset);
            return PresentationInstruction::ReplaceRowInPlace {
                rows: change.updated.clone(),
            };
        }

        match change.origin {
            ChangeOrigin::OlderPage => self.older_page(change, view, &previous, viewport, measure),
            ChangeOrigin::Delete => {
                let offset = offset_after_delete(change, view, &previous, measure);
                viewport.settle(view, measure, offset);
                PresentationInstruction::RemoveRow {
                    rows: change.removed_indices(),
                    offset: viewport.content_offset,
                }
            }
            _ => {
                if self.follows_bottom(change.origin, was_near_bottom) {
                    self.follow_bottom(change, view, viewport, measure)
                } else {
                    let offset = anchored_offset(&previous, view, measure)
                        .unwrap_or(previous.content_offset);
                    self.show_indicator(change, view, viewport, measure, offset)
                }
            }
        }
    }

    /// Scroll to the newest loaded row and reset the indicator.
    pub fn scroll_to_bottom(
        &mut self,
        view: &[MessageRecord],
        viewport: &mut ViewportState,
        measure: &impl RowMeasure,
        has_newer: bool,
    ) -> PresentationInstruction {
        self.reset_indicator(has_newer);
        viewport.content_extent = content_extent(view, measure);
        let bottom = viewport.max_offset();
        viewport.settle(view, measure, bottom);
        PresentationInstruction::ScrollToRow {
            row: view.len().saturating_sub(1),
            offset: viewport.content_offset,
            indicator: self.indicator,
        }
    }

    /// Hide and zero the indicator. It stays visible while newer pages remain.
    pub fn reset_indicator(&mut self, has_newer: bool) {
        self.indicator = NewMessageIndicator {
            visible: has_newer,
            count: 0,
        };
    }

    /// React to a user scroll. Returns the new indicator when reaching the
    /// live end hid it.
    pub fn viewport_did_scroll(
        &mut self,
        viewport: &ViewportState,
        has_newer: bool,
    ) -> Option<NewMessageIndicator> {
        if has_newer
            || !self.indicator.visible
            || !viewport.is_near_bottom(self.near_bottom_distance)
        {
            return None;
        }
        self.reset_indicator(false);
        Some(self.indicator)
    }

    fn follows_bottom(&self, origin: ChangeOrigin, was_near_bottom: bool) -> bool {
        match origin {
            ChangeOrigin::PendingAdded | ChangeOrigin::Live(MessageSource::LocalSend) => {
                self.follow_local_sends || was_near_bottom
            }
            ChangeOrigin::Live(MessageSource::Unspecified) => false,
            _ => was_near_bottom,
        }
    }

    fn older_page(
        &mut self,
        change: &TimelineChange,
        view: &[MessageRecord],
        previous: &ViewportState,
        viewport: &mut ViewportState,
        measure: &impl RowMeasure,
    ) -> PresentationInstruction {
        let offset = if previous.anchor.is_some() {
            match anchored_offset(previous, view, measure) {
                Some(offset) => offset,
                None => {
                    tracing::info!("scroll anchor lost after older page; showing indicator");
                    return self.show_indicator(
                        change,
                        view,
                        viewport,
                        measure,
                        previous.content_offset,
                    );
                }
            }
        } else {
            let above: f64 = change
                .inserted
                .iter()
                .filter_map(|&index| view.get(index))
                .map(|record| measure.row_extent(record))
                .sum();
            previous.content_offset + above
        };

        viewport.settle(view, measure, offset);
        PresentationInstruction::InsertRowsPreservingOffset {
            removed: change.removed_indices(),
            inserted: change.inserted.clone(),
            updated: change.updated.clone(),
            offset: viewport.content_offset,
        }
    }

    fn follow_bottom(
        &mut self,
        change: &TimelineChange,
        view: &[MessageRecord],
        viewport: &mut ViewportState,
        measure: &impl RowMeasure,
    ) -> PresentationInstruction {
        self.reset_indicator(change.has_newer);
        let bottom = viewport.max_offset();
        viewport.settle(view, measure, bottom);
        PresentationInstruction::InsertRowsAndScrollToAnchor {
            removed: change.removed_indices(),
            inserted: change.inserted.clone(),
            updated: change.updated.clone(),
            anchor_row: view.len().saturating_sub(1),
            offset: viewport.content_offset,
            indicator: self.indicator,
        }
    }

    fn show_indicator(
        &mut self,
        change: &TimelineChange,
        view: &[MessageRecord],
        viewport: &mut ViewportState,
        measure: &impl RowMeasure,
        offset: f64,
    ) -> PresentationInstruction {
        if change.origin != ChangeOrigin::OlderPage {
            self.indicator.count += change.arrivals;
        }
        self.indicator.visible = self.indicator.count > 0 || change.has_newer;

        viewport.settle(view, measure, offset);
        PresentationInstruction::InsertRowsAndShowNewMessageIndicator {
            removed: change.removed_indices(),
            inserted: change.inserted.clone(),
            updated: change.updated.clone(),
            offset: viewport.content_offset,
            indicator: self.indicator,
        }
    }
}

fn content_extent(view: &[MessageRecord], measure: &impl RowMeasure) -> f64 {
    view.iter().map(|record| measure.row_extent(record)).sum()
}

fn row_top(view: &[MessageRecord], measure: &impl RowMeasure, index: usize) -> f64 {
    view.iter()
        .take(index)
        .map(|record| measure.row_extent(record))
        .sum()
}

/// Offset that keeps the previous anchor row at the same screen position.
fn anchored_offset(
    previous: &ViewportState,
    view: &[MessageRecord],
    measure: &impl RowMeasure,
) -> Option<f64> {
    let anchor = previous.anchor.as_ref()?;
    let index = view.iter().position(|record| record.matches(&anchor.key))?;
    Some(row_top(view, measure, index) + anchor.offset_within_row)
}

/// Offset after rows were removed: the anchor row keeps its screen position,
/// or, when it was itself removed, the row that followed it moves to the top.
fn offset_after_delete(
    change: &TimelineChange,
    view: &[MessageRecord],
    previous: &ViewportState,
    measure: &impl RowMeasure,
) -> f64 {
    if let Some(offset) = anchored_offset(previous, view, measure) {
        return offset;
    }
    let Some(anchor) = &previous.anchor else {
        return previous.content_offset;
    };
    let Some(anchor_index) = change
        .removed
        .iter()
        .find(|row| row.record.matches(&anchor.key))
        .map(|row| row.index)
    else {
        return previous.content_offset;
    };

    let removed_above: f64 = change
        .removed
        .iter()
        .filter(|row| row.index < anchor_index)
        .map(|row| measure.row_extent(&row.record))
        .sum();
    previous.content_offset - anchor.offset_within_row - removed_above
}
