//! Error types for chatline-core

use thiserror::Error;

/// Result type alias using chatline-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in chatline-core operations
///
/// Normal timeline operations never fail; duplicates and late echoes are
/// absorbed as no-ops. Only construction and configuration are fallible.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
