use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use super::status::{RequestStatus, TaskStatus};

/// A delegation from one named agent to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTask {
    pub task_id: String,
    pub from_agent: String,
    pub to_agent: String,
    pub task_description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<String>,
    pub metadata: Value,
}

/// An agent's own statement about how a delegated task went. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    pub report_id: String,
    pub agent_name: String,
    pub task_id: String,
    pub status: TaskStatus,
    pub summary: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

/// A request for the orchestrator to provision a new kind of agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub request_id: String,
    pub from_agent: String,
    pub request_type: String,
    pub request_data: Value,
    pub status: RequestStatus,
    pub response: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

/// Everything an agent sent, received, reported and requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentHistory {
    pub sent: Vec<AgentTask>,
    pub received: Vec<AgentTask>,
    pub reports: Vec<AgentReport>,
    pub requests: Vec<AgentRequest>,
}
