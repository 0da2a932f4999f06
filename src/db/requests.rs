use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use crate::errors::TaskhubError;
use crate::models::{AgentRequest, RequestStatus};
use super::codec::{
    decode_json, decode_optional_json, encode_json, now, parse_optional_timestamp,
    parse_request_status, parse_timestamp,
};
use super::Database;

const REQUEST_COLUMNS: &str = "request_id, from_agent, request_type, request_data, status, response, created_at, responded_at";

type RequestRow = (String, String, String, String, String, Option<String>, String, Option<String>);

fn read_row(row: &rusqlite::Row) -> rusqlite::Result<RequestRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn decode_row(raw: RequestRow) -> Result<AgentRequest, TaskhubError> {
    let (request_id, from_agent, request_type, request_data, status, response, created_at, responded_at) = raw;
    Ok(AgentRequest {
        request_id,
        from_agent,
        request_type,
        request_data: decode_json("agent_requests.request_data", &request_data)?,
        status: parse_request_status(&status)?,
        response: decode_optional_json("agent_requests.response", response)?,
        created_at: parse_timestamp("agent_requests.created_at", &created_at)?,
        responded_at: parse_optional_timestamp("agent_requests.responded_at", responded_at)?,
    })
}

fn select_request(conn: &Connection, request_id: &str) -> Result<Option<AgentRequest>, TaskhubError> {
    let sql = format!("SELECT {} FROM agent_requests WHERE request_id = ?1", REQUEST_COLUMNS);
    conn.query_row(&sql, rusqlite::params![request_id], read_row)
        .optional()
        .map_err(|e| TaskhubError::storage("Failed to load request", e))?
        .map(decode_row)
        .transpose()
}

impl Database {
    pub fn insert_request(
        &self,
        request_id: &str,
        from_agent: &str,
        request_type: &str,
        request_data: &Value,
    ) -> Result<AgentRequest, TaskhubError> {
        let data = encode_json(request_data)?;
        self.write_tx("Failed to record request", |tx| {
            tx.execute(
                "INSERT INTO agent_requests (request_id, from_agent, request_type, request_data, status, created_at) VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                rusqlite::params![request_id, from_agent, request_type, data, now()],
            ).map_err(|e| TaskhubError::storage("Failed to record request", e))?;

            select_request(tx, request_id)?
                .ok_or_else(|| TaskhubError::Internal(format!("Request {} vanished after insert", request_id)))
        })
    }

    pub fn get_request(&self, request_id: &str) -> Result<Option<AgentRequest>, TaskhubError> {
        let conn = self.lock()?;
        select_request(&conn, request_id)
    }

    /// Record the orchestrator's decision. Only pending requests can be resolved.
    pub fn resolve_request(
        &self,
        request_id: &str,
        status: RequestStatus,
        response: &Value,
    ) -> Result<AgentRequest, TaskhubError> {
        if status == RequestStatus::Pending {
            return Err(TaskhubError::Validation("A request cannot be resolved back to pending".into()));
        }
        let response = encode_json(response)?;

        self.write_tx("Failed to resolve request", |tx| {
            let changed = tx.execute(
                "UPDATE agent_requests SET status = ?2, response = ?3, responded_at = ?4 WHERE request_id = ?1 AND status = 'pending'",
                rusqlite::params![request_id, status.as_str(), response, now()],
            ).map_err(|e| TaskhubError::storage("Failed to resolve request", e))?;

            let current = select_request(tx, request_id)?
                .ok_or_else(|| TaskhubError::NotFound(format!("Request {}", request_id)))?;
            if changed == 0 {
                return Err(TaskhubError::Conflict(format!(
                    "Request {} was already {}",
                    request_id, current.status
                )));
            }
            Ok(current)
        })
    }

    pub fn list_requests_by_agent(&self, from_agent: &str) -> Result<Vec<AgentRequest>, TaskhubError> {
        let sql = format!(
            "SELECT {} FROM agent_requests WHERE from_agent = ?1 ORDER BY created_at DESC, rowid DESC",
            REQUEST_COLUMNS
        );
        self.query_requests(&sql, rusqlite::params![from_agent])
    }

    pub fn list_pending_requests(&self) -> Result<Vec<AgentRequest>, TaskhubError> {
        let sql = format!(
            "SELECT {} FROM agent_requests WHERE status = 'pending' ORDER BY created_at ASC, rowid ASC",
            REQUEST_COLUMNS
        );
        self.query_requests(&sql, [])
    }

    fn query_requests<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<AgentRequest>, TaskhubError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)
            .map_err(|e| TaskhubError::storage("Query failed", e))?;
        let rows = stmt.query_map(params, read_row)
            .map_err(|e| TaskhubError::storage("Query error", e))?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(decode_row(row.map_err(|e| TaskhubError::storage("Row error", e))?)?);
        }
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_db_insert_request_defaults_pending() {
        let db = Database::in_memory().unwrap();
        let req = db.insert_request("req-1", "planner", "new_agent", &json!({"agent_type": "dba"})).unwrap();
        assert_eq!(req.status, RequestStatus::Pending);
        assert!(req.response.is_none());
        assert!(req.responded_at.is_none());
        assert_eq!(db.list_pending_requests().unwrap().len(), 1);
    }

    #[test]
    fn test_db_resolve_request_once() {
        let db = Database::in_memory().unwrap();
        db.insert_request("req-1", "planner", "new_agent", &json!({})).unwrap();

        let resolved = db.resolve_request("req-1", RequestStatus::Approved, &json!({"agent": "dba-1"})).unwrap();
        assert_eq!(resolved.status, RequestStatus::Approved);
        assert_eq!(resolved.response, Some(json!({"agent": "dba-1"})));
        assert!(resolved.responded_at.is_some());
        assert!(db.list_pending_requests().unwrap().is_empty());

        let again = db.resolve_request("req-1", RequestStatus::Rejected, &json!(null));
        assert!(matches!(again, Err(TaskhubError::Conflict(_))));
    }

    #[test]
    fn test_db_resolve_unknown_request() {
        let db = Database::in_memory().unwrap();
        let res = db.resolve_request("nope", RequestStatus::Rejected, &json!(null));
        assert!(matches!(res, Err(TaskhubError::NotFound(_))));
    }

    #[test]
    fn test_db_requests_by_agent() {
        let db = Database::in_memory().unwrap();
        db.insert_request("req-1", "planner", "new_agent", &json!({})).unwrap();
        db.insert_request("req-2", "coder", "new_agent", &json!({})).unwrap();
        let mine = db.list_requests_by_agent("planner").unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].request_id, "req-1");
    }
}
