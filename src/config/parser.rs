use std::path::Path;
use crate::errors::TaskhubError;
use super::types::{TaskhubConfig, MAX_PRIORITY, MIN_PRIORITY};
use tracing::warn;

pub async fn parse_config(path: &Path) -> Result<TaskhubConfig, TaskhubError> {
    if !path.exists() {
        return Err(TaskhubError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(TaskhubError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<TaskhubConfig, TaskhubError> {
    // An empty file means "all defaults"
    if content.trim().is_empty() {
        return Ok(TaskhubConfig::default());
    }

    let config: TaskhubConfig = serde_yaml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject values the queue cannot work with.
fn validate_config(config: &TaskhubConfig) -> Result<(), TaskhubError> {
    let queue = &config.queue;
    if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&queue.default_priority) {
        return Err(TaskhubError::Config(format!(
            "queue.default_priority must be between {} and {}, got {}",
            MIN_PRIORITY, MAX_PRIORITY, queue.default_priority
        )));
    }
    if queue.claim_attempts == 0 {
        return Err(TaskhubError::Config("queue.claim_attempts must be at least 1".into()));
    }
    if queue.history_limit == 0 {
        return Err(TaskhubError::Config("queue.history_limit must be at least 1".into()));
    }
    if config.database.path.trim().is_empty() {
        return Err(TaskhubError::Config("database.path must not be empty".into()));
    }

    let notifications = &config.notifications;
    if notifications.channel_capacity == 0 {
        return Err(TaskhubError::Config("notifications.channel_capacity must be at least 1".into()));
    }
    if notifications.webhook_timeout_ms == 0 {
        return Err(TaskhubError::Config("notifications.webhook_timeout_ms must be at least 1".into()));
    }
    if let Some(url) = &notifications.webhook_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(TaskhubError::Config(format!("notifications.webhook_url '{}' is not an http(s) URL", url)));
        }
    }

    if !notifications.log && !notifications.journal && notifications.webhook_url.is_none() {
        warn!("All notification sinks disabled; observers will not see state changes");
    }

    Ok(())
}
