use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskhubError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TaskhubError {
    /// Wrap a rusqlite failure. A busy or locked store means another writer holds
    /// the lock, which callers treat like a lost claim race.
    pub fn storage(context: &str, err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref code, _) = err {
            if matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) {
                return TaskhubError::Conflict(format!("{}: store is busy", context));
            }
        }
        TaskhubError::Database(format!("{}: {}", context, err))
    }
}
