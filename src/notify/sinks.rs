use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use crate::db::Database;
use crate::errors::TaskhubError;
use super::events::Notification;

/// Receives every state-change notification. Delivery is best-effort: an
/// error here is logged by the caller and never undoes the mutation.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), TaskhubError>;
}

/// Drops everything.
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn notify(&self, _notification: &Notification) -> Result<(), TaskhubError> {
        Ok(())
    }
}

/// Writes each notification as a structured tracing record.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, notification: &Notification) -> Result<(), TaskhubError> {
        let payload = notification.to_json()?;
        info!(event = notification.name(), payload = %payload, "notification");
        Ok(())
    }
}

/// In-process fan-out to any number of subscribers.
#[derive(Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

impl NotificationSink for BroadcastSink {
    fn notify(&self, notification: &Notification) -> Result<(), TaskhubError> {
        // No subscribers is not a failure
        let _ = self.sender.send(notification.clone());
        Ok(())
    }
}

/// Appends notifications to the `events` table so another process can poll them.
pub struct JournalSink {
    db: Database,
}

impl JournalSink {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl NotificationSink for JournalSink {
    fn notify(&self, notification: &Notification) -> Result<(), TaskhubError> {
        let payload = notification.to_json()?;
        self.db
            .insert_event(notification.name(), &payload, &notification.timestamp)
            .map_err(|e| TaskhubError::Notification(format!("journal write failed: {}", e)))?;
        Ok(())
    }
}

/// Delivers to every inner sink; one failing sink does not stop the others.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

impl NotificationSink for FanoutSink {
    fn notify(&self, notification: &Notification) -> Result<(), TaskhubError> {
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.notify(notification) {
                failures.push(e.to_string());
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(TaskhubError::Notification(failures.join("; ")))
        }
    }
}
