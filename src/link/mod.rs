//! Agent-to-agent delegation: handoffs, reports and capability requests.

pub mod ids;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use crate::db::Database;
use crate::errors::TaskhubError;
use crate::models::{AgentHistory, AgentRequest, AgentTask, RequestStatus, TaskStatus, Transition};
use crate::notify::{Event, Notifier};
use ids::readable_id;

pub const NEW_AGENT_REQUEST: &str = "new_agent";

#[derive(Clone)]
pub struct AgentLink {
    db: Database,
    notifier: Notifier,
}

fn require(field: &str, value: &str) -> Result<(), TaskhubError> {
    if value.trim().is_empty() {
        return Err(TaskhubError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

impl AgentLink {
    pub fn new(db: Database, notifier: Notifier) -> Self {
        Self { db, notifier }
    }

    /// Delegate work from one agent to another. Returns the new task id.
    pub fn assign(
        &self,
        from_agent: &str,
        to_agent: &str,
        description: &str,
        metadata: Option<Value>,
    ) -> Result<String, TaskhubError> {
        require("from_agent", from_agent)?;
        require("to_agent", to_agent)?;
        require("task_description", description)?;

        let task_id = readable_id(to_agent, Utc::now());
        let metadata = metadata.unwrap_or_else(|| json!({}));
        let task = self.db.insert_agent_task(&task_id, from_agent, to_agent, description, &metadata)?;
        info!(task_id = %task.task_id, from_agent, to_agent, "Task assigned");

        self.notifier.emit(Event::AgentTaskAssigned {
            task_id: task.task_id.clone(),
            from_agent: task.from_agent.clone(),
            to_agent: task.to_agent.clone(),
            task_description: task.task_description.clone(),
        });
        Ok(task.task_id)
    }

    /// Move a delegated task to `status`. Repeating the current status is a
    /// no-op and emits nothing.
    pub fn set_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        result: Option<&str>,
    ) -> Result<AgentTask, TaskhubError> {
        let (task, transition) = self.db.update_agent_task_status(task_id, status, result)?;
        if transition == Transition::Applied {
            info!(task_id, status = %status, "Agent task status updated");
            self.emit_status(&task);
        }
        Ok(task)
    }

    /// Record an outcome report. `completed` and `failed` reports also close
    /// the referenced task, exactly as `set_status` would.
    pub fn report(
        &self,
        agent_name: &str,
        task_id: &str,
        status: TaskStatus,
        summary: &str,
        details: Option<Value>,
    ) -> Result<String, TaskhubError> {
        require("agent_name", agent_name)?;
        require("task_id", task_id)?;

        let report_id = readable_id(&format!("report-{}", agent_name), Utc::now());
        let details = details.unwrap_or_else(|| json!({}));
        let outcome = self.db.insert_report(&report_id, agent_name, task_id, status, summary, &details)?;
        info!(report_id = %report_id, agent_name, task_id, status = %status, "Report submitted");

        // One event per report; a transition it caused rides along as `task_status`
        let task_status = (outcome.transition == Some(Transition::Applied)).then_some(status);
        self.notifier.emit(Event::ReportSubmitted {
            report_id: outcome.report.report_id.clone(),
            agent_name: outcome.report.agent_name.clone(),
            task_id: outcome.report.task_id.clone(),
            status,
            summary: outcome.report.summary.clone(),
            task_status,
        });
        Ok(outcome.report.report_id)
    }

    /// Ask the orchestrator for a new agent of `agent_type`. Nothing is
    /// provisioned here.
    pub fn request_capability(
        &self,
        from_agent: &str,
        agent_type: &str,
        capabilities: &[String],
    ) -> Result<String, TaskhubError> {
        require("from_agent", from_agent)?;
        require("agent_type", agent_type)?;

        let request_id = readable_id(&format!("request-{}", from_agent), Utc::now());
        let data = json!({"agent_type": agent_type, "capabilities": capabilities});
        let request = self.db.insert_request(&request_id, from_agent, NEW_AGENT_REQUEST, &data)?;
        info!(request_id = %request.request_id, from_agent, agent_type, "Capability requested");

        self.notifier.emit(Event::AgentRequested {
            request_id: request.request_id.clone(),
            from_agent: request.from_agent.clone(),
            agent_type: agent_type.to_string(),
            capabilities: capabilities.to_vec(),
        });
        Ok(request.request_id)
    }

    /// Record the orchestrator's answer to a pending request.
    pub fn resolve_request(
        &self,
        request_id: &str,
        approved: bool,
        response: Value,
    ) -> Result<AgentRequest, TaskhubError> {
        let status = if approved { RequestStatus::Approved } else { RequestStatus::Rejected };
        let request = self.db.resolve_request(request_id, status, &response)?;
        info!(request_id, status = %status, "Request resolved");

        self.notifier.emit(Event::RequestResolved {
            request_id: request.request_id.clone(),
            from_agent: request.from_agent.clone(),
            status,
        });
        Ok(request)
    }

    pub fn get(&self, task_id: &str) -> Result<AgentTask, TaskhubError> {
        self.db
            .get_agent_task(task_id)?
            .ok_or_else(|| TaskhubError::NotFound(format!("Agent task {}", task_id)))
    }

    /// Pending and in-progress delegations, newest first.
    pub fn active_agent_tasks(&self) -> Result<Vec<AgentTask>, TaskhubError> {
        self.db.list_active_agent_tasks()
    }

    pub fn pending_requests(&self) -> Result<Vec<AgentRequest>, TaskhubError> {
        self.db.list_pending_requests()
    }

    pub fn history(&self, agent_name: &str) -> Result<AgentHistory, TaskhubError> {
        Ok(AgentHistory {
            sent: self.db.list_agent_tasks_sent(agent_name)?,
            received: self.db.list_agent_tasks_received(agent_name)?,
            reports: self.db.list_reports_by_agent(agent_name)?,
            requests: self.db.list_requests_by_agent(agent_name)?,
        })
    }

    fn emit_status(&self, task: &AgentTask) {
        self.notifier.emit(Event::AgentTaskStatusUpdated {
            task_id: task.task_id.clone(),
            status: task.status,
            result: task.result.clone(),
        });
    }
}
