use serde_json::Value;
use tracing::{debug, info, warn};
use crate::config::{QueueConfig, MAX_PRIORITY, MIN_PRIORITY};
use crate::db::Database;
use crate::errors::TaskhubError;
use crate::models::{NewTask, Task, TaskStats, Transition};
use crate::notify::{Event, Notifier};
use crate::utils::{truncate_error, truncate_title};

/// Per-agent priority queue over the `tasks` table.
#[derive(Clone)]
pub struct TaskStore {
    db: Database,
    notifier: Notifier,
    config: QueueConfig,
}

impl TaskStore {
    pub fn new(db: Database, notifier: Notifier, config: QueueConfig) -> Self {
        Self { db, notifier, config }
    }

    /// Add a pending task and return its id. Titles longer than 120
    /// characters are cut and marked with `...`.
    pub fn enqueue(&self, mut new: NewTask) -> Result<String, TaskhubError> {
        let priority = self.prepare(&mut new)?;
        let task = self.db.insert_task(&new, priority)?;
        Ok(self.announce(task))
    }

    /// Like `enqueue`, but skipped (`None`) when the agent already has an
    /// open task with the same `dedup_key`.
    pub(crate) fn enqueue_unless_open(&self, mut new: NewTask) -> Result<Option<String>, TaskhubError> {
        let priority = self.prepare(&mut new)?;
        let task = self.db.insert_task_unless_open(&new, priority)?;
        Ok(task.map(|t| self.announce(t)))
    }

    fn prepare(&self, new: &mut NewTask) -> Result<i64, TaskhubError> {
        if new.agent_id.trim().is_empty() {
            return Err(TaskhubError::Validation("agent_id is required".into()));
        }
        if new.title.trim().is_empty() {
            return Err(TaskhubError::Validation("title is required".into()));
        }
        if new.task_type.trim().is_empty() {
            new.task_type = "general".to_string();
        }
        let priority = new.priority.unwrap_or(self.config.default_priority);
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(TaskhubError::Validation(format!(
                "priority must be between {} and {}, got {}",
                MIN_PRIORITY, MAX_PRIORITY, priority
            )));
        }
        new.title = truncate_title(&new.title);
        Ok(priority)
    }

    fn announce(&self, task: Task) -> String {
        info!(task_id = %task.id, agent_id = %task.agent_id, task_type = %task.task_type, priority = task.priority, "Task enqueued");

        self.notifier.emit(Event::TaskEnqueued {
            task_id: task.id.clone(),
            agent_id: task.agent_id.clone(),
            task_type: task.task_type.clone(),
            priority: task.priority,
            parent_task_id: task.parent_task_id.clone(),
        });
        task.id
    }

    /// Atomically take the most urgent pending task of `agent_id` for `session_id`.
    /// Lost races are retried up to `claim_attempts` times before the
    /// `Conflict` is handed back to the caller.
    pub fn claim_next(&self, agent_id: &str, session_id: &str) -> Result<Option<Task>, TaskhubError> {
        if agent_id.trim().is_empty() {
            return Err(TaskhubError::Validation("agent_id is required".into()));
        }
        if session_id.trim().is_empty() {
            return Err(TaskhubError::Validation("session_id is required".into()));
        }

        let attempts = self.config.claim_attempts.max(1);
        let mut attempt = 0;
        let claimed = loop {
            attempt += 1;
            match self.db.claim_next_task(agent_id, session_id) {
                Err(TaskhubError::Conflict(reason)) if attempt < attempts => {
                    debug!(agent_id, attempt, reason = %reason, "Claim lost a race, retrying");
                }
                Err(e @ TaskhubError::Conflict(_)) => {
                    warn!(agent_id, attempts, "Claim retries exhausted");
                    return Err(e);
                }
                other => break other?,
            }
        };

        match &claimed {
            Some(task) => {
                info!(task_id = %task.id, agent_id, session_id, priority = task.priority, "Task claimed");
                self.notifier.emit(Event::TaskStarted {
                    task_id: task.id.clone(),
                    agent_id: task.agent_id.clone(),
                    session_id: session_id.to_string(),
                });
            }
            None => debug!(agent_id, "No pending task to claim"),
        }
        Ok(claimed)
    }

    /// Start a specific pending task. Calling it again from the same session
    /// changes nothing.
    pub fn start(&self, task_id: &str, session_id: &str) -> Result<Task, TaskhubError> {
        if session_id.trim().is_empty() {
            return Err(TaskhubError::Validation("session_id is required".into()));
        }

        let (task, transition) = self.db.start_task(task_id, session_id)?;
        if transition == Transition::Applied {
            info!(task_id, session_id, "Task started");
            self.notifier.emit(Event::TaskStarted {
                task_id: task.id.clone(),
                agent_id: task.agent_id.clone(),
                session_id: session_id.to_string(),
            });
        }
        Ok(task)
    }

    pub fn complete(&self, task_id: &str, result: Value) -> Result<Task, TaskhubError> {
        let task = self.db.complete_task(task_id, &result)?;
        info!(task_id, agent_id = %task.agent_id, "Task completed");

        self.notifier.emit(Event::TaskCompleted {
            task_id: task.id.clone(),
            agent_id: task.agent_id.clone(),
            result: task.result.clone(),
        });
        Ok(task)
    }

    /// Mark the task failed and bump its retry counter. The task is not requeued.
    pub fn fail(&self, task_id: &str, error: &str) -> Result<Task, TaskhubError> {
        let task = self.db.fail_task(task_id, &truncate_error(error))?;
        warn!(task_id, agent_id = %task.agent_id, retry_count = task.retry_count, error, "Task failed");

        self.notifier.emit(Event::TaskFailed {
            task_id: task.id.clone(),
            agent_id: task.agent_id.clone(),
            error: task.error.clone().unwrap_or_default(),
            retry_count: task.retry_count,
        });
        Ok(task)
    }

    /// Put a failed task back in the queue.
    pub fn requeue(&self, task_id: &str) -> Result<Task, TaskhubError> {
        let task = self.db.requeue_task(task_id)?;
        info!(task_id, agent_id = %task.agent_id, retry_count = task.retry_count, "Task requeued");

        self.notifier.emit(Event::TaskRequeued {
            task_id: task.id.clone(),
            agent_id: task.agent_id.clone(),
            retry_count: task.retry_count,
        });
        Ok(task)
    }

    pub fn get(&self, task_id: &str) -> Result<Task, TaskhubError> {
        self.db
            .get_task(task_id)?
            .ok_or_else(|| TaskhubError::NotFound(format!("Task {}", task_id)))
    }

    /// Most recent tasks of `agent_id`, newest first.
    pub fn history(&self, agent_id: &str, limit: Option<usize>) -> Result<Vec<Task>, TaskhubError> {
        let limit = limit.unwrap_or(self.config.history_limit);
        self.db.list_tasks_for_agent(agent_id, limit)
    }

    /// In-progress tasks of every agent, most recently started first.
    pub fn active_across_agents(&self) -> Result<Vec<Task>, TaskhubError> {
        self.db.list_in_progress_tasks()
    }

    pub fn stats(&self, agent_id: &str) -> Result<TaskStats, TaskhubError> {
        self.db.task_stats(agent_id)
    }

    pub fn subtasks(&self, parent_task_id: &str) -> Result<Vec<Task>, TaskhubError> {
        self.db.list_subtasks(parent_task_id)
    }

}
