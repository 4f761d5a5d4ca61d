//! Executes presentation instructions against a concrete viewport.

use std::ops::Range;

use crate::models::MessageRecord;

use super::anchor::{NewMessageIndicator, PresentationInstruction, RowMeasure, ViewportState};

/// The scrollable list a timeline renders into.
///
/// Implemented by UI integrations; row indices are chronological.
pub trait Viewport: RowMeasure {
    fn visible_rows(&self) -> Range<usize>;
    fn content_offset(&self) -> f64;
    fn viewport_extent(&self) -> f64;
    fn insert_rows(&mut self, rows: &[usize]);
    fn remove_rows(&mut self, rows: &[usize]);
    fn replace_rows(&mut self, rows: &[usize]);
    fn set_content_offset(&mut self, offset: f64, animated: bool);
    fn reload(&mut self);
    fn set_new_message_indicator(&mut self, indicator: NewMessageIndicator);
}

/// Drives a [`Viewport`] from [`PresentationInstruction`]s.
#[derive(Debug)]
pub struct PresentationAdapter<V> {
    viewport: V,
    indicator: NewMessageIndicator,
}

impl<V: Viewport> PresentationAdapter<V> {
    pub fn new(viewport: V) -> Self {
        Self {
            viewport,
            indicator: NewMessageIndicator::default(),
        }
    }

    pub const fn viewport(&self) -> &V {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    pub fn into_inner(self) -> V {
        self.viewport
    }

    /// Current viewport geometry for `view`, the full view it is showing.
    pub fn viewport_state(&self, view: &[MessageRecord]) -> ViewportState {
        ViewportState::capture(
            view,
            &self.viewport,
            self.viewport.content_offset(),
            self.viewport.viewport_extent(),
        )
    }

    /// Removals first, then insertions and replacements, then the offset
    /// change when it differs from the current one.
    pub fn apply(&mut self, instruction: &PresentationInstruction) {
        match instruction {
            PresentationInstruction::InsertRowsPreservingOffset {
                removed,
                inserted,
                updated,
                ..
            }
            | PresentationInstruction::InsertRowsAndScrollToAnchor {
                removed,
                inserted,
                updated,
                ..
            }
            | PresentationInstruction::InsertRowsAndShowNewMessageIndicator {
                removed,
                inserted,
                updated,
                ..
            } => {
                if !removed.is_empty() {
                    self.viewport.remove_rows(removed);
                }
                if !inserted.is_empty() {
                    self.viewport.insert_rows(inserted);
                }
                if !updated.is_empty() {
                    self.viewport.replace_rows(updated);
                }
            }
            PresentationInstruction::ReplaceRowInPlace { rows } => {
                self.viewport.replace_rows(rows);
            }
            PresentationInstruction::RemoveRow { rows, .. } => {
                self.viewport.remove_rows(rows);
            }
            PresentationInstruction::ScrollToRow { .. } => {}
            PresentationInstruction::Reload { .. } => self.viewport.reload(),
        }

        if let Some(offset) = instruction.offset() {
            #[allow(clippy::float_cmp)]
            let unchanged = self.viewport.content_offset() == offset;
            if !unchanged {
                let animated = matches!(
                    instruction,
                    PresentationInstruction::InsertRowsAndScrollToAnchor { .. }
                        | PresentationInstruction::ScrollToRow { .. }
                );
                self.viewport.set_content_offset(offset, animated);
            }
        }

        if let Some(indicator) = instruction.indicator() {
            self.set_indicator(indicator);
        }
    }

    pub fn set_indicator(&mut self, indicator: NewMessageIndicator) {
        if indicator != self.indicator {
            self.indicator = indicator;
            self.viewport.set_new_message_indicator(indicator);
        }
    }
}
