use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use crate::config::DatabaseConfig;
use crate::errors::TaskhubError;

pub struct Database {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, TaskhubError> {
        Self::open(&DatabaseConfig {
            path: path.to_string(),
            ..Default::default()
        })
    }

    pub fn open(config: &DatabaseConfig) -> Result<Self, TaskhubError> {
        // Ensure parent directory exists
        if let Some(parent) = Path::new(&config.path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&config.path)
            .map_err(|e| TaskhubError::Database(format!("Failed to open database: {}", e)))?;

        // Several handles may share one file: WAL plus a busy timeout lets writers queue
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
            .map_err(|e| TaskhubError::Database(format!("Failed to set busy timeout: {}", e)))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| TaskhubError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.initialize()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, TaskhubError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| TaskhubError::Database(format!("Failed to open in-memory db: {}", e)))?;
        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<(), TaskhubError> {
        let conn = self.lock()?;
        conn.execute_batch(super::schema::CREATE_TABLES)
            .map_err(|e| TaskhubError::Database(format!("Failed to create tables: {}", e)))?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, TaskhubError> {
        self.conn
            .lock()
            .map_err(|_| TaskhubError::Internal("Database connection mutex poisoned".into()))
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction. The write lock is taken up
    /// front, so a read-then-update inside `f` cannot interleave with another writer.
    pub(crate) fn write_tx<T>(
        &self,
        context: &str,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, TaskhubError>,
    ) -> Result<T, TaskhubError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| TaskhubError::storage(context, e))?;
        let value = f(&tx)?;
        tx.commit().map_err(|e| TaskhubError::storage(context, e))?;
        Ok(value)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self { conn: self.conn.clone() }
    }
}
