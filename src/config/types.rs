use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TaskhubConfig {
    pub database: DatabaseConfig,
    pub queue: QueueConfig,
    pub generator: GeneratorConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "./data/taskhub.db".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

pub const MIN_PRIORITY: i64 = 1;
pub const MAX_PRIORITY: i64 = 10;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Priority given to tasks enqueued without one.
    pub default_priority: i64,
    /// Row cap for `history` when the caller gives none.
    pub history_limit: usize,
    /// How many times a claim is attempted when it loses a race.
    pub claim_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_priority: 5,
            history_limit: 100,
            claim_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Skip findings that already have an open task for the same agent.
    pub dedup: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Emit every event as a tracing record.
    pub log: bool,
    /// Persist every event to the `events` table for out-of-process observers.
    pub journal: bool,
    /// POST every event as JSON to this URL.
    pub webhook_url: Option<String>,
    /// Per-request webhook timeout; also bounds how long shutdown waits.
    pub webhook_timeout_ms: u64,
    /// Buffer size of the in-process broadcast channel.
    pub channel_capacity: usize,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            log: true,
            journal: true,
            webhook_url: None,
            webhook_timeout_ms: 5_000,
            channel_capacity: 256,
        }
    }
}
