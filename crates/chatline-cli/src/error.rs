use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] chatline_core::Error),
    #[error(transparent)]
    Session(#[from] chatline_core::SessionError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Script error: {0}")]
    Script(String),
    #[error("Config file already exists at {0}; pass --force to overwrite")]
    ConfigExists(String),
}
