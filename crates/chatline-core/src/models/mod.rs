//! Data models for chatline

mod ids;
mod message;

pub use ids::{ChannelId, ClientToken, MessageId};
pub use message::{MessageKind, MessagePayload, MessageRecord, MessageStatus, RowKey};
