use serde_json::Value;
use crate::errors::TaskhubError;
use crate::models::EventRecord;
use super::codec::{decode_json, encode_json, parse_timestamp};
use super::Database;

impl Database {
    pub fn insert_event(&self, event: &str, payload: &Value, created_at: &str) -> Result<i64, TaskhubError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO events (event, payload, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![event, encode_json(payload)?, created_at],
        ).map_err(|e| TaskhubError::storage("Failed to record event", e))?;
        Ok(conn.last_insert_rowid())
    }

    /// Events with an id greater than `after_id`, oldest first.
    pub fn list_events(&self, after_id: i64, limit: usize) -> Result<Vec<EventRecord>, TaskhubError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, event, payload, created_at FROM events WHERE id > ?1 ORDER BY id ASC LIMIT ?2"
        ).map_err(|e| TaskhubError::storage("Query failed", e))?;

        let rows = stmt.query_map(rusqlite::params![after_id, limit as i64], |row: &rusqlite::Row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        }).map_err(|e| TaskhubError::storage("Query error", e))?;

        let mut events = Vec::new();
        for row in rows {
            let (id, event, payload, created_at) = row.map_err(|e| TaskhubError::storage("Row error", e))?;
            events.push(EventRecord {
                id,
                event,
                payload: decode_json("events.payload", &payload)?,
                created_at: parse_timestamp("events.created_at", &created_at)?,
            });
        }
        Ok(events)
    }
}
