//! Chatline CLI - replay chat timeline scenarios from the terminal
//!
//! Scenario scripts describe an initial page plus a sequence of pages, live
//! events, sends and scrolls. `replay` drives them through the timeline engine
//! against a simulated viewport; `session` runs them through a live channel
//! session backed by an in-memory transport.

mod cli;
mod commands;
mod error;
mod script;
mod viewport;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::common::{load_config, resolve_config_path};
use crate::commands::config::run_config;
use crate::commands::replay::run_replay;
use crate::commands::session::run_session;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "chatline=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config);

    match cli.command {
        Commands::Replay { script, json } => {
            run_replay(&script, load_config(&config_path)?, json)?;
        }
        Commands::Session {
            script,
            starting_point,
        } => run_session(&script, starting_point, load_config(&config_path)?).await?,
        Commands::Config { command } => run_config(command, &config_path)?,
    }

    Ok(())
}
