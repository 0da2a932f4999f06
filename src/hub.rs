use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};
use crate::config::TaskhubConfig;
use crate::db::Database;
use crate::errors::TaskhubError;
use crate::link::AgentLink;
use crate::notify::{
    BroadcastSink, FanoutSink, JournalSink, LogSink, Notification, NotificationSink, Notifier, WebhookSink,
};
use crate::queue::{TaskGenerator, TaskStore};

/// One database handle plus the services wired to a shared notifier.
pub struct Hub {
    pub db: Database,
    pub store: TaskStore,
    pub generator: TaskGenerator,
    pub link: AgentLink,
    broadcast: BroadcastSink,
    webhook: Option<Arc<WebhookSink>>,
}

impl Hub {
    /// Open the configured database and build the sinks the config enables.
    pub fn open(config: &TaskhubConfig) -> Result<Self, TaskhubError> {
        let db = Database::open(&config.database)?;
        info!(path = %config.database.path, "Database opened");
        Self::build(db, config)
    }

    pub fn build(db: Database, config: &TaskhubConfig) -> Result<Self, TaskhubError> {
        let notifications = &config.notifications;
        let broadcast = BroadcastSink::new(notifications.channel_capacity);

        let mut sinks: Vec<Arc<dyn NotificationSink>> = vec![Arc::new(broadcast.clone())];
        if notifications.log {
            sinks.push(Arc::new(LogSink));
        }
        if notifications.journal {
            sinks.push(Arc::new(JournalSink::new(db.clone())));
        }
        let webhook = notifications
            .webhook_url
            .as_ref()
            .map(|url| WebhookSink::new(url.clone(), Duration::from_millis(notifications.webhook_timeout_ms)))
            .transpose()?
            .map(Arc::new);
        if let Some(webhook) = &webhook {
            sinks.push(webhook.clone());
        }
        debug!(sinks = sinks.len(), "Notification sinks configured");

        let notifier = Notifier::new(Arc::new(FanoutSink::new(sinks)));
        let store = TaskStore::new(db.clone(), notifier.clone(), config.queue.clone());
        let generator = TaskGenerator::new(store.clone(), config.generator.dedup);
        let link = AgentLink::new(db.clone(), notifier);

        Ok(Self { db, store, generator, link, broadcast, webhook })
    }

    /// Live feed of every notification emitted through this hub.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.broadcast.subscribe()
    }

    /// Wait for outstanding webhook deliveries.
    pub async fn shutdown(&self) {
        if let Some(webhook) = &self.webhook {
            webhook.flush().await;
        }
    }
}
