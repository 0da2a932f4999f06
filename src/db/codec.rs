//! Column encodings shared by the table modules.
//!
//! Timestamps are RFC 3339 UTC with fixed microsecond precision so that text
//! ordering in SQL matches chronological ordering. JSON payloads are stored as
//! text and decoded on read; a payload that fails to decode is an error, never
//! silently replaced.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use crate::errors::TaskhubError;
use crate::models::{RequestStatus, TaskStatus};

pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn now() -> String {
    timestamp(&Utc::now())
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, TaskhubError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TaskhubError::Decode(format!("{} '{}': {}", column, raw, e)))
}

pub(crate) fn parse_optional_timestamp(
    column: &str,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, TaskhubError> {
    raw.map(|r| parse_timestamp(column, &r)).transpose()
}

pub(crate) fn encode_json(value: &Value) -> Result<String, TaskhubError> {
    Ok(serde_json::to_string(value)?)
}

pub(crate) fn decode_json(column: &str, raw: &str) -> Result<Value, TaskhubError> {
    serde_json::from_str(raw).map_err(|e| TaskhubError::Decode(format!("{}: {}", column, e)))
}

pub(crate) fn decode_optional_json(column: &str, raw: Option<String>) -> Result<Option<Value>, TaskhubError> {
    raw.map(|r| decode_json(column, &r)).transpose()
}

pub(crate) fn parse_status(raw: &str) -> Result<TaskStatus, TaskhubError> {
    raw.parse()
        .map_err(|_| TaskhubError::Decode(format!("status '{}' is not a task status", raw)))
}

pub(crate) fn parse_request_status(raw: &str) -> Result<RequestStatus, TaskhubError> {
    raw.parse()
        .map_err(|_| TaskhubError::Decode(format!("status '{}' is not a request status", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_roundtrip_keeps_micros() {
        let at = Utc::now();
        let parsed = parse_timestamp("created_at", &timestamp(&at)).unwrap();
        assert_eq!(parsed.timestamp_micros(), at.timestamp_micros());
    }

    #[test]
    fn test_timestamps_sort_lexically() {
        let earlier = parse_timestamp("t", "2024-01-01T09:59:59.999999Z").unwrap();
        let later = parse_timestamp("t", "2024-01-01T10:00:00.000001Z").unwrap();
        assert!(timestamp(&earlier) < timestamp(&later));
    }

    #[test]
    fn test_malformed_json_fails_closed() {
        let err = decode_json("context", "{not json").unwrap_err();
        assert!(matches!(err, TaskhubError::Decode(_)));
    }

    #[test]
    fn test_unknown_status_is_decode_error() {
        assert!(matches!(parse_status("archived"), Err(TaskhubError::Decode(_))));
    }
}
