//! Handler for the `check` command
//!
//! Scans every stored ticket, withdrawn ones included, prints status
//! statistics and lists tickets whose snapshot breaks a data-model
//! invariant or cannot be read at all. Any violation makes the command fail.

use crate::cli::OutputFormatter;
use crate::config::Config;
use crate::core::{Status, Ticket};
use crate::error::{FixhubError, Result};
use crate::storage::{TicketStore, open_store};
use serde::Serialize;

/// Handler for the `check` command
pub fn handle_check_command(config: &Config, output: &OutputFormatter) -> Result<()> {
    let store = open_store(&config.store)?;
    let report = check_store(store.as_ref())?;

    if output.is_json() {
        output.print_json(&serde_json::json!({
            "backend": config.store.backend,
            "path": config.store.path,
            "statistics": report.statistics,
            "violations": report.violations,
        }))?;
    } else {
        output_text(&report, config, output);
    }

    if report.violations.is_empty() {
        Ok(())
    } else {
        Err(FixhubError::InvariantViolation(format!(
            "{} ticket(s) violate data-model invariants",
            report.violations.len()
        )))
    }
}

/// Result of scanning a store
#[derive(Debug, Default, Serialize)]
pub struct CheckReport {
    pub statistics: Statistics,
    pub violations: Vec<Violation>,
}

/// Ticket counts per status
#[derive(Debug, Default, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub unreadable: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub done: usize,
    pub rejected: usize,
    pub withdrawn: usize,
}

/// A ticket whose snapshot is inconsistent or unreadable
#[derive(Debug, Serialize)]
pub struct Violation {
    /// Ticket id, or the snapshot location when the id is unknown
    pub id: String,
    /// `None` when the snapshot could not be parsed
    pub status: Option<Status>,
    pub problem: String,
}

/// Count tickets and collect invariant violations
pub fn check_store(store: &dyn TicketStore) -> Result<CheckReport> {
    let mut report = CheckReport::default();

    for entry in store.entries()? {
        match entry {
            Ok(ticket) => {
                count(&mut report.statistics, &ticket);
                if let Err(e) = ticket.check_invariants() {
                    report.violations.push(Violation {
                        id: ticket.id.to_string(),
                        status: Some(ticket.status),
                        problem: e.to_string(),
                    });
                }
            },
            Err(damaged) => {
                report.statistics.total += 1;
                report.statistics.unreadable += 1;
                report.violations.push(Violation {
                    id: damaged.ticket_id.unwrap_or(damaged.location),
                    status: None,
                    problem: format!("unreadable snapshot: {}", damaged.problem),
                });
            },
        }
    }
    Ok(report)
}

fn count(stats: &mut Statistics, ticket: &Ticket) {
    stats.total += 1;
    if ticket.is_withdrawn() {
        stats.withdrawn += 1;
        return;
    }
    match ticket.status {
        Status::Pending => stats.pending += 1,
        Status::InProgress => stats.in_progress += 1,
        Status::Done => stats.done += 1,
        Status::Rejected => stats.rejected += 1,
    }
}

/// Output check report as text
fn output_text(report: &CheckReport, config: &Config, output: &OutputFormatter) {
    let stats = &report.statistics;
    output.info(&format!(
        "Store: {:?} ({})",
        config.store.backend,
        config.store.path.display()
    ));
    output.info("");
    output.info("Statistics:");
    output.info(&format!("  Total tickets: {}", stats.total));
    output.info(&format!("  Pending: {}", stats.pending));
    output.info(&format!("  In progress: {}", stats.in_progress));
    output.info(&format!("  Done: {}", stats.done));
    output.info(&format!("  Rejected: {}", stats.rejected));
    output.info(&format!("  Withdrawn: {}", stats.withdrawn));
    if stats.unreadable > 0 {
        output.info(&format!("  Unreadable: {}", stats.unreadable));
    }
    output.info("");

    if report.violations.is_empty() {
        output.success("All tickets are consistent");
        return;
    }
    for violation in &report.violations {
        let status = violation
            .status
            .map_or_else(|| "unknown status".to_string(), |s| s.to_string());
        output.warning(&format!("{} ({status}): {}", violation.id, violation.problem));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TicketBuilder;
    use crate::storage::{FileStore, MemoryStore};
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_consistent_store_reports_statistics() {
        let store = MemoryStore::new();
        store
            .create(TicketBuilder::new().reporter("alice").build())
            .unwrap();
        store
            .create(
                TicketBuilder::new()
                    .status(Status::InProgress)
                    .assignee("bob")
                    .build(),
            )
            .unwrap();
        store
            .create(TicketBuilder::new().withdrawn_at(Utc::now()).build())
            .unwrap();

        let report = check_store(&store).unwrap();
        assert!(report.violations.is_empty());
        assert_eq!(report.statistics.total, 3);
        assert_eq!(report.statistics.pending, 1);
        assert_eq!(report.statistics.in_progress, 1);
        assert_eq!(report.statistics.withdrawn, 1);
    }

    #[test]
    fn test_hand_edited_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        let ticket = store
            .create(TicketBuilder::new().reporter("alice").build())
            .unwrap();

        // Someone marks the ticket IN_PROGRESS without an assignee
        let path = temp_dir
            .path()
            .join("tickets")
            .join(format!("{}.yaml", ticket.id));
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.replace("PENDING", "IN_PROGRESS")).unwrap();

        let report = check_store(&store).unwrap();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].status, Some(Status::InProgress));
    }

    #[test]
    fn test_unparsable_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(temp_dir.path()).unwrap();
        store
            .create(TicketBuilder::new().reporter("alice").build())
            .unwrap();
        let broken = store
            .create(TicketBuilder::new().reporter("alice").build())
            .unwrap();

        let path = temp_dir
            .path()
            .join("tickets")
            .join(format!("{}.yaml", broken.id));
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, content.replace("PENDING", "CLOSED")).unwrap();

        let report = check_store(&store).unwrap();
        assert_eq!(report.statistics.total, 2);
        assert_eq!(report.statistics.pending, 1);
        assert_eq!(report.statistics.unreadable, 1);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].id, broken.id.to_string());
        assert_eq!(report.violations[0].status, None);
        assert!(report.violations[0].problem.starts_with("unreadable snapshot"));
    }
}
