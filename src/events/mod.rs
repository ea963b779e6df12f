//! Transition events and their fire-and-forget delivery
//!
//! The workflow engine publishes one [`TransitionEvent`] per committed
//! operation into an [`EventHub`]. Publishing never blocks and never fails
//! the operation. A dispatcher task drains the hub into the configured
//! [`NotificationSink`]s, retrying each sink a bounded number of times and
//! logging what it could not deliver.

mod dispatcher;
mod sinks;

pub use crate::core::{Operation, TransitionEvent};
pub use dispatcher::{DeliveryPolicy, deliver_with_retry, spawn_dispatcher};
pub use sinks::{JsonlAuditSink, LogSink, MemorySink, NotificationSink, sinks_from_config};

#[cfg(test)]
pub use sinks::MockNotificationSink;

use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default number of undelivered events buffered per subscriber
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Broadcast point for transition events
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<TransitionEvent>,
}

impl EventHub {
    /// Create a hub buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Get an event receiver
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish an event without waiting for anyone to consume it
    pub fn publish(&self, event: TransitionEvent) {
        let ticket = event.ticket_id.short();
        let operation = event.operation;
        match self.sender.send(event) {
            Ok(receivers) => trace!(%ticket, %operation, receivers, "event published"),
            Err(_) => debug!(%ticket, %operation, "event dropped: no subscribers"),
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
