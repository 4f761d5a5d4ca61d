//! Headless viewport that records what a real list view would be told to do.

use std::ops::Range;

use chatline_core::timeline::{NewMessageIndicator, RowMeasure, Viewport};
use chatline_core::{MessagePayload, MessageRecord};

const TEXT_ROW: f64 = 44.0;
const TEXT_EXTRA_LINE: f64 = 18.0;
const FILE_ROW: f64 = 160.0;
const ADMIN_ROW: f64 = 28.0;

/// Fixed row extents per message kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct KindMeasure;

impl RowMeasure for KindMeasure {
    #[allow(clippy::cast_precision_loss)]
    fn row_extent(&self, record: &MessageRecord) -> f64 {
        match &record.payload {
            MessagePayload::Text { body } => {
                let extra_lines = body.lines().count().saturating_sub(1);
                TEXT_ROW + TEXT_EXTRA_LINE * extra_lines as f64
            }
            MessagePayload::File { .. } => FILE_ROW,
            MessagePayload::Admin { .. } => ADMIN_ROW,
            MessagePayload::Unknown => TEXT_ROW,
        }
    }
}

#[derive(Debug)]
pub struct SimulatedViewport {
    extent: f64,
    offset: f64,
    row_extents: Vec<f64>,
    indicator: NewMessageIndicator,
    log: Vec<String>,
}

impl SimulatedViewport {
    pub const fn new(extent: f64) -> Self {
        Self {
            extent,
            offset: 0.0,
            row_extents: Vec::new(),
            indicator: NewMessageIndicator {
                visible: false,
                count: 0,
            },
            log: Vec::new(),
        }
    }

    /// Refresh row geometry from the rows the list currently shows.
    pub fn sync_rows(&mut self, view: &[MessageRecord]) {
        self.row_extents = view.iter().map(|record| KindMeasure.row_extent(record)).collect();
    }

    /// Move as if the user dragged the list.
    pub fn scroll_to(&mut self, offset: f64) -> f64 {
        let content: f64 = self.row_extents.iter().sum();
        self.offset = offset.clamp(0.0, (content - self.extent).max(0.0));
        self.offset
    }

    pub const fn indicator(&self) -> NewMessageIndicator {
        self.indicator
    }

    pub fn take_log(&mut self) -> Vec<String> {
        std::mem::take(&mut self.log)
    }
}

impl RowMeasure for SimulatedViewport {
    fn row_extent(&self, record: &MessageRecord) -> f64 {
        KindMeasure.row_extent(record)
    }
}

impl Viewport for SimulatedViewport {
    fn visible_rows(&self) -> Range<usize> {
        let bottom = self.offset + self.extent;
        let mut top = 0.0;
        let mut first = None;
        let mut end = 0;
        for (index, row_extent) in self.row_extents.iter().enumerate() {
            let row_bottom = top + row_extent;
            if row_bottom > self.offset && top < bottom {
                first.get_or_insert(index);
                end = index + 1;
            }
            top = row_bottom;
        }
        first.map_or(0..0, |first| first..end)
    }

    fn content_offset(&self) -> f64 {
        self.offset
    }

    fn viewport_extent(&self) -> f64 {
        self.extent
    }

    fn insert_rows(&mut self, rows: &[usize]) {
        self.log.push(format!("insert rows {rows:?}"));
    }

    fn remove_rows(&mut self, rows: &[usize]) {
        self.log.push(format!("remove rows {rows:?}"));
    }

    fn replace_rows(&mut self, rows: &[usize]) {
        self.log.push(format!("replace rows {rows:?}"));
    }

    fn set_content_offset(&mut self, offset: f64, animated: bool) {
        self.offset = offset;
        let how = if animated { "animated" } else { "immediate" };
        self.log.push(format!("set offset {offset:.1} ({how})"));
    }

    fn reload(&mut self) {
        self.log.push("reload".to_string());
    }

    fn set_new_message_indicator(&mut self, indicator: NewMessageIndicator) {
        self.indicator = indicator;
        if indicator.visible {
            self.log
                .push(format!("show new-message indicator ({})", indicator.count));
        } else {
            self.log.push("hide new-message indicator".to_string());
        }
    }
}
