use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use super::status::TaskStatus;

/// A unit of work in one agent's queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub agent_id: String,
    pub session_id: Option<String>,
    pub task_type: String,
    pub priority: i64,
    pub status: TaskStatus,
    pub title: String,
    pub description: Option<String>,
    pub context: Value,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub retry_count: i64,
    pub parent_task_id: Option<String>,
    pub dedup_key: Option<String>,
}

/// Input for `TaskStore::enqueue`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub agent_id: String,
    pub task_type: String,
    pub priority: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub context: Option<Value>,
    pub parent_task_id: Option<String>,
    #[serde(skip)]
    pub dedup_key: Option<String>,
}

impl NewTask {
    pub fn new(agent_id: impl Into<String>, task_type: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            task_type: task_type.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn parent(mut self, parent_task_id: impl Into<String>) -> Self {
        self.parent_task_id = Some(parent_task_id.into());
        self
    }
}

/// Per-agent queue counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: i64,
    pub completed: i64,
    pub failed: i64,
    pub pending: i64,
    pub in_progress: i64,
}
