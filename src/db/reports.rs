use serde_json::Value;
use tracing::warn;
use crate::errors::TaskhubError;
use crate::models::{AgentReport, TaskStatus, Transition};
use super::agent_tasks::apply_agent_status;
use super::codec::{decode_json, encode_json, parse_status, parse_timestamp, timestamp};
use super::Database;

/// Stored report plus what happened to the delegated task it refers to.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub report: AgentReport,
    /// `None` when the status is not terminal, the task is unknown, or the
    /// transition was rejected.
    pub transition: Option<Transition>,
}

impl Database {
    /// Append a report. A terminal status also moves the referenced agent task
    /// through the shared transition rule, in the same transaction.
    pub fn insert_report(
        &self,
        report_id: &str,
        agent_name: &str,
        task_id: &str,
        status: TaskStatus,
        summary: &str,
        details: &Value,
    ) -> Result<ReportOutcome, TaskhubError> {
        let created_at = chrono::Utc::now();
        let details_json = encode_json(details)?;

        self.write_tx("Failed to submit report", |tx| {
            tx.execute(
                "INSERT INTO agent_reports (report_id, agent_name, task_id, status, summary, details, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![report_id, agent_name, task_id, status.as_str(), summary, details_json, timestamp(&created_at)],
            ).map_err(|e| TaskhubError::storage("Failed to insert report", e))?;

            let transition = if status.is_terminal() {
                match apply_agent_status(tx, task_id, status, Some(summary)) {
                    Ok(t) => Some(t),
                    Err(e @ (TaskhubError::NotFound(_) | TaskhubError::Conflict(_))) => {
                        warn!(report_id, task_id, error = %e, "Report kept; agent task status not updated");
                        None
                    }
                    Err(e) => return Err(e),
                }
            } else {
                None
            };

            Ok(ReportOutcome {
                report: AgentReport {
                    report_id: report_id.to_string(),
                    agent_name: agent_name.to_string(),
                    task_id: task_id.to_string(),
                    status,
                    summary: summary.to_string(),
                    details: details.clone(),
                    created_at,
                },
                transition,
            })
        })
    }

    pub fn list_reports_by_agent(&self, agent_name: &str) -> Result<Vec<AgentReport>, TaskhubError> {
        self.query_reports(
            "SELECT report_id, agent_name, task_id, status, summary, details, created_at FROM agent_reports WHERE agent_name = ?1 ORDER BY created_at DESC, rowid DESC",
            agent_name,
        )
    }

    pub fn list_reports_for_task(&self, task_id: &str) -> Result<Vec<AgentReport>, TaskhubError> {
        self.query_reports(
            "SELECT report_id, agent_name, task_id, status, summary, details, created_at FROM agent_reports WHERE task_id = ?1 ORDER BY created_at ASC, rowid ASC",
            task_id,
        )
    }

    fn query_reports(&self, sql: &str, key: &str) -> Result<Vec<AgentReport>, TaskhubError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)
            .map_err(|e| TaskhubError::storage("Query failed", e))?;

        let rows = stmt.query_map(rusqlite::params![key], |row: &rusqlite::Row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        }).map_err(|e| TaskhubError::storage("Query error", e))?;

        let mut reports = Vec::new();
        for row in rows {
            let (report_id, agent_name, task_id, status, summary, details, created_at) =
                row.map_err(|e| TaskhubError::storage("Row error", e))?;
            reports.push(AgentReport {
                report_id,
                agent_name,
                task_id,
                status: parse_status(&status)?,
                summary,
                details: decode_json("agent_reports.details", &details)?,
                created_at: parse_timestamp("agent_reports.created_at", &created_at)?,
            });
        }
        Ok(reports)
    }
}
