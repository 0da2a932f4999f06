use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};
use crate::errors::TaskhubError;
use super::events::Notification;
use super::sinks::NotificationSink;

/// POSTs each notification as JSON. Requests run on the ambient tokio runtime
/// and are bounded by `timeout`; `flush` waits at most that long for the ones
/// still in flight.
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    inflight: Mutex<Vec<JoinHandle<()>>>,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TaskhubError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| TaskhubError::Config(format!("Failed to build webhook client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
            inflight: Mutex::new(Vec::new()),
        })
    }

    /// Wait for in-flight deliveries. Whatever is still running when the
    /// deadline passes is aborted.
    pub async fn flush(&self) {
        let pending: Vec<JoinHandle<()>> = match self.inflight.lock() {
            Ok(mut inflight) => inflight.drain(..).collect(),
            Err(_) => return,
        };

        let deadline = Instant::now() + self.timeout;
        let mut abandoned = 0;
        for mut handle in pending {
            if timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
                abandoned += 1;
            }
        }
        if abandoned > 0 {
            warn!(url = %self.url, abandoned, "Webhook deliveries abandoned at shutdown");
        }
    }
}

impl NotificationSink for WebhookSink {
    fn notify(&self, notification: &Notification) -> Result<(), TaskhubError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| TaskhubError::Notification("webhook delivery needs a tokio runtime".into()))?;

        let body = notification.to_json()?;
        let event = notification.name();
        let client = self.client.clone();
        let url = self.url.clone();

        let handle = runtime.spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(resp) if resp.status().is_success() => {
                    debug!(event, url = %url, "Webhook delivered");
                }
                Ok(resp) => {
                    warn!(event, url = %url, status = %resp.status(), "Webhook rejected notification");
                }
                Err(e) => {
                    warn!(event, url = %url, error = %e, "Webhook delivery failed");
                }
            }
        });

        if let Ok(mut inflight) = self.inflight.lock() {
            inflight.retain(|h| !h.is_finished());
            inflight.push(handle);
        }
        Ok(())
    }
}
