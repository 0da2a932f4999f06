use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use crate::errors::TaskhubError;
use crate::models::{RequestStatus, TaskStatus};

/// State changes observers can subscribe to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    TaskEnqueued {
        task_id: String,
        agent_id: String,
        task_type: String,
        priority: i64,
        parent_task_id: Option<String>,
    },
    TaskStarted {
        task_id: String,
        agent_id: String,
        session_id: String,
    },
    TaskCompleted {
        task_id: String,
        agent_id: String,
        result: Option<Value>,
    },
    TaskFailed {
        task_id: String,
        agent_id: String,
        error: String,
        retry_count: i64,
    },
    TaskRequeued {
        task_id: String,
        agent_id: String,
        retry_count: i64,
    },
    AgentTaskAssigned {
        task_id: String,
        from_agent: String,
        to_agent: String,
        task_description: String,
    },
    AgentTaskStatusUpdated {
        task_id: String,
        status: TaskStatus,
        result: Option<String>,
    },
    ReportSubmitted {
        report_id: String,
        agent_name: String,
        task_id: String,
        status: TaskStatus,
        summary: String,
        /// Status the delegated task moved to because of this report, if any.
        task_status: Option<TaskStatus>,
    },
    AgentRequested {
        request_id: String,
        from_agent: String,
        agent_type: String,
        capabilities: Vec<String>,
    },
    RequestResolved {
        request_id: String,
        from_agent: String,
        status: RequestStatus,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskEnqueued { .. } => "task_enqueued",
            Self::TaskStarted { .. } => "task_started",
            Self::TaskCompleted { .. } => "task_completed",
            Self::TaskFailed { .. } => "task_failed",
            Self::TaskRequeued { .. } => "task_requeued",
            Self::AgentTaskAssigned { .. } => "agent_task_assigned",
            Self::AgentTaskStatusUpdated { .. } => "agent_task_status_updated",
            Self::ReportSubmitted { .. } => "report_submitted",
            Self::AgentRequested { .. } => "agent_requested",
            Self::RequestResolved { .. } => "request_resolved",
        }
    }
}

/// An event stamped with the time it was emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    #[serde(flatten)]
    pub event: Event,
    /// ISO-8601 UTC.
    pub timestamp: String,
}

impl Notification {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    pub fn name(&self) -> &'static str {
        self.event.name()
    }

    /// The wire form: `{"event": ..., <ids and fields>, "timestamp": ...}`.
    pub fn to_json(&self) -> Result<Value, TaskhubError> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_wire_form() {
        let n = Notification::new(Event::ReportSubmitted {
            report_id: "r1".into(),
            agent_name: "coder".into(),
            task_id: "coder-1".into(),
            status: TaskStatus::Completed,
            summary: "done".into(),
            task_status: Some(TaskStatus::Completed),
        });
        let json = n.to_json().unwrap();
        assert_eq!(json["event"], "report_submitted");
        assert_eq!(json["task_id"], "coder-1");
        assert_eq!(json["status"], "completed");
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_event_name_matches_tag() {
        let event = Event::AgentRequested {
            request_id: "q".into(),
            from_agent: "planner".into(),
            agent_type: "dba".into(),
            capabilities: vec!["sql".into()],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
    }
}
