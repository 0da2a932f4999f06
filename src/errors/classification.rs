use super::types::TaskhubError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl TaskhubError {
    /// Classify this error so callers can decide whether re-issuing the call makes sense.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Lost claim race or busy store: safe to retry
            TaskhubError::Conflict(_) => ErrorClassification {
                error_type: "ConflictError",
                retryable: true,
            },
            TaskhubError::Database(_) => ErrorClassification {
                error_type: "StorageError",
                retryable: true,
            },

            TaskhubError::Validation(_) => ErrorClassification {
                error_type: "ValidationError",
                retryable: false,
            },
            TaskhubError::NotFound(_) => ErrorClassification {
                error_type: "NotFoundError",
                retryable: false,
            },
            TaskhubError::Decode(_) => ErrorClassification {
                error_type: "DecodeError",
                retryable: false,
            },
            TaskhubError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
            },
            TaskhubError::Notification(_) => ErrorClassification {
                error_type: "NotificationError",
                retryable: false,
            },
            TaskhubError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: false,
            },
            TaskhubError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
            },
            TaskhubError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
            },
            TaskhubError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_retryable() {
        let err = TaskhubError::Conflict("claim race lost".into());
        let class = err.classify();
        assert!(class.retryable);
        assert_eq!(class.error_type, "ConflictError");
    }

    #[test]
    fn test_validation_not_retryable() {
        let err = TaskhubError::Validation("title is required".into());
        let class = err.classify();
        assert!(!class.retryable);
        assert_eq!(class.error_type, "ValidationError");
    }

    #[test]
    fn test_not_found_not_retryable() {
        let err = TaskhubError::NotFound("task abc".into());
        assert!(!err.classify().retryable);
    }

    #[test]
    fn test_storage_error_retryable() {
        let err = TaskhubError::Database("disk I/O error".into());
        let class = err.classify();
        assert!(class.retryable);
        assert_eq!(class.error_type, "StorageError");
    }

    #[test]
    fn test_decode_not_retryable() {
        let err = TaskhubError::Decode("bad context".into());
        assert!(!err.classify().retryable);
    }

    #[test]
    fn test_busy_sqlite_maps_to_conflict() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(TaskhubError::storage("claim", err), TaskhubError::Conflict(_)));
    }

    #[test]
    fn test_other_sqlite_maps_to_database() {
        let err = rusqlite::Error::InvalidQuery;
        assert!(matches!(TaskhubError::storage("query", err), TaskhubError::Database(_)));
    }
}
