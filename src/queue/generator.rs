use std::path::Path;
use serde_json::{json, Value};
use tracing::{debug, info};
use crate::errors::TaskhubError;
use crate::models::{Analysis, NewTask};
use super::store::TaskStore;

pub const TODO_TASK_TYPE: &str = "implement_todo";
pub const COVERAGE_TASK_TYPE: &str = "improve_coverage";
pub const QUALITY_TASK_TYPE: &str = "fix_quality";

pub const TODO_PRIORITY: i64 = 6;
pub const COVERAGE_PRIORITY: i64 = 7;
pub const HIGH_SEVERITY_PRIORITY: i64 = 8;
pub const QUALITY_PRIORITY: i64 = 5;

/// Turns static-analysis findings into queue tasks.
#[derive(Clone)]
pub struct TaskGenerator {
    store: TaskStore,
    dedup: bool,
}

impl TaskGenerator {
    pub fn new(store: TaskStore, dedup: bool) -> Self {
        Self { store, dedup }
    }

    /// Enqueue one task per finding for `agent_id` and return the new ids in
    /// finding order: TODOs, then coverage, then quality issues.
    pub fn generate(&self, agent_id: &str, analysis: &Analysis) -> Result<Vec<String>, TaskhubError> {
        if agent_id.trim().is_empty() {
            return Err(TaskhubError::Validation("agent_id is required".into()));
        }

        let planned = plan_tasks(agent_id, analysis)?;
        let total = planned.len();
        let mut ids = Vec::with_capacity(total);

        for new in planned {
            if !self.dedup {
                ids.push(self.store.enqueue(new)?);
                continue;
            }
            match self.store.enqueue_unless_open(new)? {
                Some(id) => ids.push(id),
                None => debug!(agent_id, "Skipping duplicate finding"),
            }
        }

        info!(agent_id, generated = ids.len(), skipped = total - ids.len(), "Generated tasks from analysis");
        Ok(ids)
    }
}

/// Read an analysis document from a JSON file.
pub async fn load_analysis(path: &Path) -> Result<Analysis, TaskhubError> {
    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content)
        .map_err(|e| TaskhubError::Validation(format!("Invalid analysis JSON in {}: {}", path.display(), e)))
}

/// The deterministic finding-to-task mapping.
pub fn plan_tasks(agent_id: &str, analysis: &Analysis) -> Result<Vec<NewTask>, TaskhubError> {
    let mut tasks = Vec::new();

    for todo in &analysis.todos {
        let context = json!({"file": todo.file, "line": todo.line, "text": todo.text});
        tasks.push(finding_task(
            agent_id,
            TODO_TASK_TYPE,
            TODO_PRIORITY,
            format!("Implement TODO: {}", todo.text.trim()),
            format!("TODO comment at {}:{}", todo.file, todo.line),
            context,
        )?);
    }

    if let Some(coverage) = &analysis.coverage {
        for file in &coverage.low_coverage {
            let context = json!({"file": file.file, "coverage": file.coverage});
            tasks.push(finding_task(
                agent_id,
                COVERAGE_TASK_TYPE,
                COVERAGE_PRIORITY,
                format!("Improve test coverage for {}", file.file),
                format!("Current coverage is {:.1}%", file.coverage),
                context,
            )?);
        }
    }

    if let Some(quality) = &analysis.quality {
        for issue in &quality.issues {
            let priority = if issue.severity.eq_ignore_ascii_case("high") {
                HIGH_SEVERITY_PRIORITY
            } else {
                QUALITY_PRIORITY
            };
            let location = match issue.line {
                Some(line) => format!("{}:{}", issue.file, line),
                None => issue.file.clone(),
            };
            let context = json!({
                "file": issue.file,
                "line": issue.line,
                "type": issue.issue_type,
                "message": issue.message,
                "severity": issue.severity,
            });
            tasks.push(finding_task(
                agent_id,
                QUALITY_TASK_TYPE,
                priority,
                format!("Fix {} issue: {}", issue.issue_type, issue.message),
                format!("{} ({} severity) at {}", issue.message, issue.severity, location),
                context,
            )?);
        }
    }

    Ok(tasks)
}

fn finding_task(
    agent_id: &str,
    task_type: &str,
    priority: i64,
    title: String,
    description: String,
    context: Value,
) -> Result<NewTask, TaskhubError> {
    let mut task = NewTask::new(agent_id, task_type, title)
        .priority(priority)
        .description(description);
    task.dedup_key = Some(dedup_key(task_type, &context)?);
    Ok(task.context(context))
}

/// `task_type` plus the context serialized with sorted keys, so equal findings
/// always produce equal keys.
pub fn dedup_key(task_type: &str, context: &Value) -> Result<String, TaskhubError> {
    Ok(format!("{}:{}", task_type, serde_json::to_string(context)?))
}
