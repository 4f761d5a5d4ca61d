//! chatline-core - Core library for chatline
//!
//! This crate keeps a chat channel's message timeline consistent while pages
//! load, live events arrive and local sends are confirmed, and tells the
//! presentation layer how to update without moving the content the user is
//! reading.

pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod state;
pub mod timeline;
pub mod transport;
pub mod util;

pub use config::TimelineConfig;
pub use error::{Error, Result};
pub use models::{ChannelId, ClientToken, MessageId, MessagePayload, MessageRecord, MessageStatus};
pub use session::{ChannelSession, SessionError, SessionHandle, SessionSnapshot};
pub use timeline::{EngineEvent, TimelineEngine, TimelineStore};
pub use transport::{LiveEvent, MessageSender, MessageTransport, TransportError};
