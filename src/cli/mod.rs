pub mod commands;
pub mod tasks;
pub mod link;
pub mod events;

pub use commands::{Cli, Commands};

use std::path::PathBuf;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use crate::config::{parse_config, TaskhubConfig};
use crate::errors::TaskhubError;
use crate::hub::Hub;

/// Load the config file (defaults when none is given) and apply `--db`.
pub async fn load_config(cli: &Cli) -> Result<TaskhubConfig, TaskhubError> {
    let mut config = match &cli.config {
        Some(path) => parse_config(&PathBuf::from(path)).await?,
        None => TaskhubConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    debug!(db = %config.database.path, "Configuration loaded");
    Ok(config)
}

pub async fn open_hub(cli: &Cli) -> Result<Hub, TaskhubError> {
    let config = load_config(cli).await?;
    Hub::open(&config)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), TaskhubError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse a JSON command-line argument, naming the flag on failure.
pub(crate) fn parse_json_arg(flag: &str, raw: &str) -> Result<Value, TaskhubError> {
    serde_json::from_str(raw)
        .map_err(|e| TaskhubError::Validation(format!("--{} is not valid JSON: {}", flag, e)))
}

pub(crate) fn parse_optional_json_arg(flag: &str, raw: Option<&str>) -> Result<Option<Value>, TaskhubError> {
    raw.map(|r| parse_json_arg(flag, r)).transpose()
}
