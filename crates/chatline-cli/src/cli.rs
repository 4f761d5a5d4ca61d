use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "chatline")]
#[command(about = "Replay chat timeline scenarios against a simulated viewport")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the timeline config file (defaults to $CHATLINE_CONFIG, then ./chatline.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a scenario script step by step through the timeline engine
    Replay {
        /// Scenario script (JSON)
        script: PathBuf,
        /// Output the transcript as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a scenario through a channel session backed by an in-memory transport
    Session {
        /// Scenario script (JSON)
        script: PathBuf,
        /// Open the channel at this timestamp instead of the live end
        #[arg(long, value_name = "MILLIS")]
        starting_point: Option<i64>,
    },
    /// Inspect or create the timeline config file
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Write a config file with the default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
