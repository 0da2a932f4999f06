//! Observer notifications.
//!
//! Services hand every state change to a [`Notifier`], which stamps it and
//! passes it to the configured [`NotificationSink`]. Sink failures are logged
//! and swallowed.

pub mod events;
pub mod sinks;
pub mod webhook;

pub use events::{Event, Notification};
pub use sinks::{BroadcastSink, FanoutSink, JournalSink, LogSink, NoopSink, NotificationSink};
pub use webhook::WebhookSink;

use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(NoopSink))
    }

    pub fn emit(&self, event: Event) {
        let notification = Notification::new(event);
        if let Err(e) = self.sink.notify(&notification) {
            warn!(event = notification.name(), error = %e, "Failed to deliver notification");
        }
    }
}
