use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use crate::errors::TaskhubError;
use crate::models::{AgentTask, TaskStatus, Transition};
use super::codec::{decode_json, encode_json, now, parse_optional_timestamp, parse_status, parse_timestamp};
use super::Database;

const AGENT_TASK_COLUMNS: &str = "task_id, from_agent, to_agent, task_description, status, created_at, started_at, completed_at, result, metadata";

struct AgentTaskRow {
    task_id: String,
    from_agent: String,
    to_agent: String,
    task_description: String,
    status: String,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    result: Option<String>,
    metadata: String,
}

impl AgentTaskRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            task_id: row.get(0)?,
            from_agent: row.get(1)?,
            to_agent: row.get(2)?,
            task_description: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
            started_at: row.get(6)?,
            completed_at: row.get(7)?,
            result: row.get(8)?,
            metadata: row.get(9)?,
        })
    }

    fn into_agent_task(self) -> Result<AgentTask, TaskhubError> {
        Ok(AgentTask {
            status: parse_status(&self.status)?,
            created_at: parse_timestamp("agent_tasks.created_at", &self.created_at)?,
            started_at: parse_optional_timestamp("agent_tasks.started_at", self.started_at)?,
            completed_at: parse_optional_timestamp("agent_tasks.completed_at", self.completed_at)?,
            metadata: decode_json("agent_tasks.metadata", &self.metadata)?,
            task_id: self.task_id,
            from_agent: self.from_agent,
            to_agent: self.to_agent,
            task_description: self.task_description,
            result: self.result,
        })
    }
}

fn select_agent_task(conn: &Connection, task_id: &str) -> Result<Option<AgentTask>, TaskhubError> {
    let sql = format!("SELECT {} FROM agent_tasks WHERE task_id = ?1", AGENT_TASK_COLUMNS);
    conn.query_row(&sql, rusqlite::params![task_id], AgentTaskRow::from_row)
        .optional()
        .map_err(|e| TaskhubError::storage("Failed to load agent task", e))?
        .map(AgentTaskRow::into_agent_task)
        .transpose()
}

fn query_agent_tasks<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<AgentTask>, TaskhubError> {
    let mut stmt = conn.prepare(sql)
        .map_err(|e| TaskhubError::storage("Query failed", e))?;
    let rows = stmt.query_map(params, AgentTaskRow::from_row)
        .map_err(|e| TaskhubError::storage("Query error", e))?;

    let mut tasks = Vec::new();
    for row in rows {
        let raw = row.map_err(|e| TaskhubError::storage("Row error", e))?;
        tasks.push(raw.into_agent_task()?);
    }
    Ok(tasks)
}

/// The single status transition rule for delegated tasks, shared by direct
/// status updates and by terminal reports.
///
/// - repeating the current status is a no-op (timestamps are not re-stamped)
/// - a completed or failed task cannot move to a different status
/// - `started_at` is stamped the first time the task enters `in_progress`,
///   `completed_at` the first time it enters `completed` or `failed`
/// - `result` is only overwritten when one is supplied
pub(crate) fn apply_agent_status(
    conn: &Connection,
    task_id: &str,
    status: TaskStatus,
    result: Option<&str>,
) -> Result<Transition, TaskhubError> {
    let current: Option<String> = conn.query_row(
        "SELECT status FROM agent_tasks WHERE task_id = ?1",
        rusqlite::params![task_id],
        |row: &rusqlite::Row| row.get(0),
    )
    .optional()
    .map_err(|e| TaskhubError::storage("Failed to read agent task status", e))?;

    let Some(current) = current else {
        return Err(TaskhubError::NotFound(format!("Agent task {}", task_id)));
    };
    let current = parse_status(&current)?;

    if current == status {
        return Ok(Transition::Unchanged);
    }
    if current.is_terminal() {
        return Err(TaskhubError::Conflict(format!(
            "Agent task {} is {}; cannot move to {}",
            task_id, current, status
        )));
    }

    let changed = conn.execute(
        "UPDATE agent_tasks SET
            status = ?2,
            result = COALESCE(?3, result),
            started_at = CASE WHEN ?2 = 'in_progress' THEN COALESCE(started_at, ?4) ELSE started_at END,
            completed_at = CASE WHEN ?2 IN ('completed', 'failed') THEN COALESCE(completed_at, ?4) ELSE completed_at END
         WHERE task_id = ?1 AND status = ?5",
        rusqlite::params![task_id, status.as_str(), result, now(), current.as_str()],
    ).map_err(|e| TaskhubError::storage("Failed to update agent task status", e))?;

    if changed == 0 {
        return Err(TaskhubError::Conflict(format!("Agent task {} changed concurrently", task_id)));
    }
    Ok(Transition::Applied)
}

impl Database {
    pub fn insert_agent_task(
        &self,
        task_id: &str,
        from_agent: &str,
        to_agent: &str,
        description: &str,
        metadata: &Value,
    ) -> Result<AgentTask, TaskhubError> {
        let metadata = encode_json(metadata)?;
        self.write_tx("Failed to create agent task", |tx| {
            tx.execute(
                "INSERT INTO agent_tasks (task_id, from_agent, to_agent, task_description, status, created_at, metadata) VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6)",
                rusqlite::params![task_id, from_agent, to_agent, description, now(), metadata],
            ).map_err(|e| TaskhubError::storage("Failed to create agent task", e))?;

            select_agent_task(tx, task_id)?
                .ok_or_else(|| TaskhubError::Internal(format!("Agent task {} vanished after insert", task_id)))
        })
    }

    pub fn get_agent_task(&self, task_id: &str) -> Result<Option<AgentTask>, TaskhubError> {
        let conn = self.lock()?;
        select_agent_task(&conn, task_id)
    }

    pub fn update_agent_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        result: Option<&str>,
    ) -> Result<(AgentTask, Transition), TaskhubError> {
        self.write_tx("Failed to update agent task", |tx| {
            let transition = apply_agent_status(tx, task_id, status, result)?;
            let task = select_agent_task(tx, task_id)?
                .ok_or_else(|| TaskhubError::NotFound(format!("Agent task {}", task_id)))?;
            Ok((task, transition))
        })
    }

    pub fn list_active_agent_tasks(&self) -> Result<Vec<AgentTask>, TaskhubError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM agent_tasks WHERE status IN ('pending', 'in_progress') ORDER BY created_at DESC, rowid DESC",
            AGENT_TASK_COLUMNS
        );
        query_agent_tasks(&conn, &sql, [])
    }

    pub fn list_agent_tasks_sent(&self, agent: &str) -> Result<Vec<AgentTask>, TaskhubError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM agent_tasks WHERE from_agent = ?1 ORDER BY created_at DESC, rowid DESC",
            AGENT_TASK_COLUMNS
        );
        query_agent_tasks(&conn, &sql, rusqlite::params![agent])
    }

    pub fn list_agent_tasks_received(&self, agent: &str) -> Result<Vec<AgentTask>, TaskhubError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM agent_tasks WHERE to_agent = ?1 ORDER BY created_at DESC, rowid DESC",
            AGENT_TASK_COLUMNS
        );
        query_agent_tasks(&conn, &sql, rusqlite::params![agent])
    }
}
