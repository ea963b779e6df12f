use super::TransitionEvent;
use crate::config::NotificationConfig;
use crate::error::{FixhubError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Downstream consumer of transition events (audit log, mailer, ...)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Short name used in delivery logs
    fn name(&self) -> &'static str;

    /// Deliver one event; errors are retried by the dispatcher, then dropped
    async fn deliver(&self, event: &TransitionEvent) -> Result<()>;
}

/// Writes every event as a structured `tracing` record
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, event: &TransitionEvent) -> Result<()> {
        info!(
            target: "fixhub::audit",
            ticket = %event.ticket_id,
            operation = %event.operation,
            from = event.from_status.map_or("-", |s| s.as_str()),
            to = %event.to_status,
            actor = %event.actor_id,
            version = event.version,
            "ticket transition"
        );
        Ok(())
    }
}

/// Appends one JSON document per event to a file
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonlAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }
}

#[async_trait]
impl NotificationSink for JsonlAuditSink {
    fn name(&self) -> &'static str {
        "jsonl-audit"
    }

    async fn deliver(&self, event: &TransitionEvent) -> Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Keeps delivered events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TransitionEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far
    #[must_use]
    pub fn events(&self) -> Vec<TransitionEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn deliver(&self, event: &TransitionEvent) -> Result<()> {
        self.events
            .lock()
            .map_err(|_| FixhubError::Unavailable("memory sink poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}

/// Sinks enabled by the configuration; the log sink is always present
#[must_use]
pub fn sinks_from_config(config: &NotificationConfig) -> Vec<Arc<dyn NotificationSink>> {
    let mut sinks: Vec<Arc<dyn NotificationSink>> = vec![Arc::new(LogSink)];
    if let Some(path) = &config.audit_log {
        sinks.push(Arc::new(JsonlAuditSink::new(path)));
    }
    sinks
}
