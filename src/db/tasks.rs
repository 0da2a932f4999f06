use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use tracing::debug;
use crate::errors::TaskhubError;
use crate::models::{NewTask, Task, TaskStats, TaskStatus, Transition};
use super::codec::{
    decode_json, decode_optional_json, encode_json, now, parse_optional_timestamp, parse_status,
    parse_timestamp,
};
use super::Database;

const TASK_COLUMNS: &str = "id, agent_id, session_id, task_type, priority, status, title, description, context, created_at, started_at, completed_at, result, error, retry_count, parent_task_id, dedup_key";

/// Raw column values; decoding happens outside the rusqlite row callback so that
/// bad payloads surface as `Decode` errors rather than generic row errors.
struct TaskRow {
    id: String,
    agent_id: String,
    session_id: Option<String>,
    task_type: String,
    priority: i64,
    status: String,
    title: String,
    description: Option<String>,
    context: String,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    result: Option<String>,
    error: Option<String>,
    retry_count: i64,
    parent_task_id: Option<String>,
    dedup_key: Option<String>,
}

impl TaskRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            agent_id: row.get(1)?,
            session_id: row.get(2)?,
            task_type: row.get(3)?,
            priority: row.get(4)?,
            status: row.get(5)?,
            title: row.get(6)?,
            description: row.get(7)?,
            context: row.get(8)?,
            created_at: row.get(9)?,
            started_at: row.get(10)?,
            completed_at: row.get(11)?,
            result: row.get(12)?,
            error: row.get(13)?,
            retry_count: row.get(14)?,
            parent_task_id: row.get(15)?,
            dedup_key: row.get(16)?,
        })
    }

    fn into_task(self) -> Result<Task, TaskhubError> {
        Ok(Task {
            status: parse_status(&self.status)?,
            context: decode_json("tasks.context", &self.context)?,
            created_at: parse_timestamp("tasks.created_at", &self.created_at)?,
            started_at: parse_optional_timestamp("tasks.started_at", self.started_at)?,
            completed_at: parse_optional_timestamp("tasks.completed_at", self.completed_at)?,
            result: decode_optional_json("tasks.result", self.result)?,
            id: self.id,
            agent_id: self.agent_id,
            session_id: self.session_id,
            task_type: self.task_type,
            priority: self.priority,
            title: self.title,
            description: self.description,
            error: self.error,
            retry_count: self.retry_count,
            parent_task_id: self.parent_task_id,
            dedup_key: self.dedup_key,
        })
    }
}

fn select_task(conn: &Connection, id: &str) -> Result<Option<Task>, TaskhubError> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
    conn.query_row(&sql, rusqlite::params![id], TaskRow::from_row)
        .optional()
        .map_err(|e| TaskhubError::storage("Failed to load task", e))?
        .map(TaskRow::into_task)
        .transpose()
}

fn require_task(conn: &Connection, id: &str) -> Result<Task, TaskhubError> {
    select_task(conn, id)?.ok_or_else(|| TaskhubError::NotFound(format!("Task {}", id)))
}

fn query_tasks<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Task>, TaskhubError> {
    let mut stmt = conn.prepare(sql)
        .map_err(|e| TaskhubError::storage("Query failed", e))?;
    let rows = stmt.query_map(params, TaskRow::from_row)
        .map_err(|e| TaskhubError::storage("Query error", e))?;

    let mut tasks = Vec::new();
    for row in rows {
        let raw = row.map_err(|e| TaskhubError::storage("Row error", e))?;
        tasks.push(raw.into_task()?);
    }
    Ok(tasks)
}

/// Status and owning session of a task, if it exists.
fn current_state(conn: &Connection, id: &str) -> Result<Option<(TaskStatus, Option<String>)>, TaskhubError> {
    let row = conn.query_row(
        "SELECT status, session_id FROM tasks WHERE id = ?1",
        rusqlite::params![id],
        |row: &rusqlite::Row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
    )
    .optional()
    .map_err(|e| TaskhubError::storage("Failed to read task status", e))?;

    match row {
        Some((status, session)) => Ok(Some((parse_status(&status)?, session))),
        None => Ok(None),
    }
}

/// Explain why a status-guarded update touched no rows.
fn rejected(conn: &Connection, id: &str, target: TaskStatus) -> TaskhubError {
    match current_state(conn, id) {
        Ok(Some((status, _))) => TaskhubError::Conflict(format!(
            "Task {} is {}; cannot move to {}",
            id, status, target
        )),
        Ok(None) => TaskhubError::NotFound(format!("Task {}", id)),
        Err(e) => e,
    }
}

fn open_task_with_key(conn: &Connection, agent_id: &str, dedup_key: &str) -> Result<Option<String>, TaskhubError> {
    conn.query_row(
        "SELECT id FROM tasks WHERE agent_id = ?1 AND dedup_key = ?2 AND status IN ('pending', 'in_progress') LIMIT 1",
        rusqlite::params![agent_id, dedup_key],
        |row: &rusqlite::Row| row.get::<_, String>(0),
    )
    .optional()
    .map_err(|e| TaskhubError::storage("Dedup lookup failed", e))
}

fn insert_in(conn: &Connection, new: &NewTask, priority: i64) -> Result<Task, TaskhubError> {
    let id = uuid::Uuid::new_v4().to_string();
    let context = encode_json(new.context.as_ref().unwrap_or(&Value::Object(Default::default())))?;

    if let Some(parent) = &new.parent_task_id {
        if current_state(conn, parent)?.is_none() {
            return Err(TaskhubError::NotFound(format!("Parent task {}", parent)));
        }
    }

    conn.execute(
        "INSERT INTO tasks (id, agent_id, task_type, priority, status, title, description, context, created_at, parent_task_id, dedup_key) VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?7, ?8, ?9, ?10)",
        rusqlite::params![
            id,
            new.agent_id,
            new.task_type,
            priority,
            new.title,
            new.description,
            context,
            now(),
            new.parent_task_id,
            new.dedup_key,
        ],
    ).map_err(|e| TaskhubError::storage("Failed to insert task", e))?;

    require_task(conn, &id)
}

impl Database {
    pub fn insert_task(&self, new: &NewTask, priority: i64) -> Result<Task, TaskhubError> {
        self.write_tx("Failed to insert task", |tx| insert_in(tx, new, priority))
    }

    /// Insert unless the agent already has a pending or in-progress task with
    /// the same `dedup_key`. Check and insert share one transaction. Returns
    /// `None` when a duplicate was found.
    pub fn insert_task_unless_open(&self, new: &NewTask, priority: i64) -> Result<Option<Task>, TaskhubError> {
        self.write_tx("Failed to insert task", |tx| {
            if let Some(key) = &new.dedup_key {
                if let Some(existing) = open_task_with_key(tx, &new.agent_id, key)? {
                    debug!(agent_id = %new.agent_id, existing = %existing, key = %key, "Open task with same key exists");
                    return Ok(None);
                }
            }
            insert_in(tx, new, priority).map(Some)
        })
    }

    pub fn get_task(&self, id: &str) -> Result<Option<Task>, TaskhubError> {
        let conn = self.lock()?;
        select_task(&conn, id)
    }

    /// Id of a pending or in-progress task of `agent_id` carrying `dedup_key`.
    pub fn find_open_task_by_dedup_key(&self, agent_id: &str, dedup_key: &str) -> Result<Option<String>, TaskhubError> {
        let conn = self.lock()?;
        open_task_with_key(&conn, agent_id, dedup_key)
    }

    /// Pick the most urgent pending task of `agent_id` and move it to
    /// `in_progress` in one transaction. Highest priority wins, then oldest
    /// `created_at`, then insertion order. Returns `Conflict` if the guarded
    /// update lost a race; the transaction is rolled back in that case.
    pub fn claim_next_task(&self, agent_id: &str, session_id: &str) -> Result<Option<Task>, TaskhubError> {
        self.write_tx("Failed to claim task", |tx| {
            let candidate: Option<String> = tx.query_row(
                "SELECT id FROM tasks WHERE agent_id = ?1 AND status = 'pending' ORDER BY priority DESC, created_at ASC, rowid ASC LIMIT 1",
                rusqlite::params![agent_id],
                |row: &rusqlite::Row| row.get(0),
            )
            .optional()
            .map_err(|e| TaskhubError::storage("Failed to select next task", e))?;

            let Some(id) = candidate else {
                return Ok(None);
            };

            let changed = tx.execute(
                "UPDATE tasks SET status = 'in_progress', session_id = ?2, started_at = ?3 WHERE id = ?1 AND status = 'pending'",
                rusqlite::params![id, session_id, now()],
            ).map_err(|e| TaskhubError::storage("Failed to mark task started", e))?;

            if changed == 0 {
                return Err(TaskhubError::Conflict(format!("Task {} was claimed concurrently", id)));
            }

            require_task(tx, &id).map(Some)
        })
    }

    /// `pending -> in_progress`. Re-starting with the owning session is a no-op;
    /// any other session, or a finished task, is a conflict.
    pub fn start_task(&self, id: &str, session_id: &str) -> Result<(Task, Transition), TaskhubError> {
        self.write_tx("Failed to start task", |tx| {
            let changed = tx.execute(
                "UPDATE tasks SET status = 'in_progress', session_id = ?2, started_at = ?3 WHERE id = ?1 AND status = 'pending'",
                rusqlite::params![id, session_id, now()],
            ).map_err(|e| TaskhubError::storage("Failed to start task", e))?;

            if changed == 1 {
                return Ok((require_task(tx, id)?, Transition::Applied));
            }

            match current_state(tx, id)? {
                None => Err(TaskhubError::NotFound(format!("Task {}", id))),
                Some((TaskStatus::InProgress, Some(owner))) if owner == session_id => {
                    Ok((require_task(tx, id)?, Transition::Unchanged))
                }
                Some((TaskStatus::InProgress, owner)) => Err(TaskhubError::Conflict(format!(
                    "Task {} is already in progress under session {}",
                    id,
                    owner.as_deref().unwrap_or("<none>")
                ))),
                Some((status, _)) => Err(TaskhubError::Conflict(format!(
                    "Task {} is {}; cannot move to {}",
                    id, status, TaskStatus::InProgress
                ))),
            }
        })
    }

    /// `pending | in_progress -> completed`.
    pub fn complete_task(&self, id: &str, result: &Value) -> Result<Task, TaskhubError> {
        let result = encode_json(result)?;
        self.write_tx("Failed to complete task", |tx| {
            let changed = tx.execute(
                "UPDATE tasks SET status = 'completed', result = ?2, completed_at = ?3 WHERE id = ?1 AND status IN ('pending', 'in_progress')",
                rusqlite::params![id, result, now()],
            ).map_err(|e| TaskhubError::storage("Failed to complete task", e))?;

            if changed == 0 {
                return Err(rejected(tx, id, TaskStatus::Completed));
            }
            require_task(tx, id)
        })
    }

    /// `pending | in_progress | failed -> failed`. Each call bumps `retry_count`
    /// and overwrites `error`; `completed_at` keeps the first failure time.
    pub fn fail_task(&self, id: &str, error: &str) -> Result<Task, TaskhubError> {
        self.write_tx("Failed to record task failure", |tx| {
            let changed = tx.execute(
                "UPDATE tasks SET status = 'failed', error = ?2, retry_count = retry_count + 1, completed_at = COALESCE(completed_at, ?3) WHERE id = ?1 AND status IN ('pending', 'in_progress', 'failed')",
                rusqlite::params![id, error, now()],
            ).map_err(|e| TaskhubError::storage("Failed to record task failure", e))?;

            if changed == 0 {
                return Err(rejected(tx, id, TaskStatus::Failed));
            }
            require_task(tx, id)
        })
    }

    /// `failed -> pending`, clearing the run stamps but keeping `error` and `retry_count`.
    pub fn requeue_task(&self, id: &str) -> Result<Task, TaskhubError> {
        self.write_tx("Failed to requeue task", |tx| {
            let changed = tx.execute(
                "UPDATE tasks SET status = 'pending', session_id = NULL, started_at = NULL, completed_at = NULL WHERE id = ?1 AND status = 'failed'",
                rusqlite::params![id],
            ).map_err(|e| TaskhubError::storage("Failed to requeue task", e))?;

            if changed == 0 {
                return Err(rejected(tx, id, TaskStatus::Pending));
            }
            require_task(tx, id)
        })
    }

    pub fn list_tasks_for_agent(&self, agent_id: &str, limit: usize) -> Result<Vec<Task>, TaskhubError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM tasks WHERE agent_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            TASK_COLUMNS
        );
        query_tasks(&conn, &sql, rusqlite::params![agent_id, limit as i64])
    }

    pub fn list_in_progress_tasks(&self) -> Result<Vec<Task>, TaskhubError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM tasks WHERE status = 'in_progress' ORDER BY started_at DESC, rowid DESC",
            TASK_COLUMNS
        );
        query_tasks(&conn, &sql, [])
    }

    pub fn list_subtasks(&self, parent_task_id: &str) -> Result<Vec<Task>, TaskhubError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM tasks WHERE parent_task_id = ?1 ORDER BY created_at ASC, rowid ASC",
            TASK_COLUMNS
        );
        query_tasks(&conn, &sql, rusqlite::params![parent_task_id])
    }

    pub fn task_stats(&self, agent_id: &str) -> Result<TaskStats, TaskhubError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM tasks WHERE agent_id = ?1 GROUP BY status"
        ).map_err(|e| TaskhubError::storage("Query failed", e))?;

        let rows = stmt.query_map(rusqlite::params![agent_id], |row: &rusqlite::Row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        }).map_err(|e| TaskhubError::storage("Query error", e))?;

        let mut stats = TaskStats::default();
        for row in rows {
            let (status, count) = row.map_err(|e| TaskhubError::storage("Row error", e))?;
            match parse_status(&status)? {
                TaskStatus::Pending => stats.pending = count,
                TaskStatus::InProgress => stats.in_progress = count,
                TaskStatus::Completed => stats.completed = count,
                TaskStatus::Failed => stats.failed = count,
            }
            stats.total += count;
        }
        Ok(stats)
    }
}
