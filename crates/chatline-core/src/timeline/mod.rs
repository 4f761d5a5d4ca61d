//! Message timeline: ordered store, pagination, scroll anchoring and the
//! engine that drives them.

mod anchor;
mod change;
mod engine;
mod pagination;
mod pending;
mod presenter;
mod store;

pub use anchor::{
    NewMessageIndicator, PresentationInstruction, RowMeasure, ScrollAnchor,
    ScrollAnchorReconciler, ViewportState,
};
pub use change::{ChangeOrigin, MessageSource, RemovedRow, TimelineChange};
pub use engine::{EngineEvent, TimelineEngine, TimelineOp};
pub use pagination::{FetchDirection, FetchRequest, PaginationCursor, PaginationPolicy};
pub use pending::PendingOverlay;
pub use presenter::{PresentationAdapter, Viewport};
pub use store::TimelineStore;
