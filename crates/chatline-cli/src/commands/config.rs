use std::fs;
use std::path::Path;

use chatline_core::TimelineConfig;

use crate::cli::ConfigCommands;
use crate::commands::common::load_config;
use crate::error::CliError;

pub fn run_config(command: Option<ConfigCommands>, path: &Path) -> Result<(), CliError> {
    match command.unwrap_or(ConfigCommands::Show) {
        ConfigCommands::Show => run_config_show(path),
        ConfigCommands::Init { force } => run_config_init(path, force),
    }
}

fn run_config_show(path: &Path) -> Result<(), CliError> {
    let config = load_config(path)?;
    let source = if path.exists() {
        path.display().to_string()
    } else {
        "defaults".to_string()
    };
    println!("# {source}");
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Write the default config to `path`.
pub fn run_config_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::ConfigExists(path.display().to_string()));
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let raw = serde_json::to_string_pretty(&TimelineConfig::default())?;
    fs::write(path, format!("{raw}\n"))?;
    println!("Wrote default timeline config to {}", path.display());
    Ok(())
}
