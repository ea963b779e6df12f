use super::{NotificationSink, TransitionEvent};
use crate::config::NotificationConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How hard the dispatcher tries before giving up on an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Total attempts per sink and event, at least 1
    pub attempts: u32,
    /// Delay before the second attempt; grows linearly afterwards
    pub backoff: Duration,
}

impl DeliveryPolicy {
    #[must_use]
    pub fn from_config(config: &NotificationConfig) -> Self {
        Self {
            attempts: config.delivery_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Deliver `event` to `sink`, retrying per `policy`
///
/// Returns whether the sink eventually accepted the event. Failures are
/// logged here and go no further.
pub async fn deliver_with_retry(
    sink: &dyn NotificationSink,
    event: &TransitionEvent,
    policy: DeliveryPolicy,
) -> bool {
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        match sink.deliver(event).await {
            Ok(()) => {
                debug!(sink = sink.name(), ticket = %event.ticket_id, attempt, "event delivered");
                return true;
            },
            Err(e) => {
                warn!(
                    sink = sink.name(),
                    ticket = %event.ticket_id,
                    operation = %event.operation,
                    attempt,
                    attempts,
                    error = %e,
                    "event delivery failed"
                );
                if attempt < attempts {
                    tokio::time::sleep(policy.backoff * attempt).await;
                }
            },
        }
    }
    false
}

/// Drain `receiver` into `sinks` until every publisher is gone
pub fn spawn_dispatcher(
    mut receiver: broadcast::Receiver<TransitionEvent>,
    sinks: Vec<Arc<dyn NotificationSink>>,
    policy: DeliveryPolicy,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    for sink in &sinks {
                        deliver_with_retry(sink.as_ref(), &event, policy).await;
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "notification dispatcher fell behind; events dropped");
                },
                Err(RecvError::Closed) => {
                    debug!("event hub closed; dispatcher stopping");
                    break;
                },
            }
        }
    })
}
