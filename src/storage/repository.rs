use crate::core::{Ticket, TicketId};
use crate::error::{FixhubError, Result};

/// A stored snapshot that could not be loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableSnapshot {
    /// Backend-specific location, e.g. a file path
    pub location: String,
    /// Ticket id as far as the location reveals it
    pub ticket_id: Option<String>,
    pub problem: String,
}

/// One stored snapshot as read back from the backend
pub type StoredEntry = std::result::Result<Ticket, UnreadableSnapshot>;

/// Storage contract for ticket snapshots
///
/// `commit` is the only way to change a stored ticket. Implementations run
/// the version check, the mutator and the write under one per-ticket lock
/// scope, so two commits on the same ticket never interleave while commits
/// on different tickets never wait on each other.
pub trait TicketStore: Send + Sync {
    /// Loads the latest committed snapshot, including withdrawn tickets
    fn get(&self, id: &TicketId) -> Result<Ticket>;

    /// Stores a new ticket and assigns it version 1
    fn create(&self, ticket: Ticket) -> Result<Ticket>;

    /// Applies `mutator` to the stored snapshot if its version still equals
    /// `expected_version`, then bumps the version
    ///
    /// Fails with `TicketNotFound` for unknown ids and `Conflict` when the
    /// stored version moved on. Errors returned by `mutator` abort the commit
    /// and leave the ticket untouched.
    fn commit(
        &self,
        id: &TicketId,
        expected_version: u64,
        mutator: &mut dyn FnMut(&Ticket) -> Result<Ticket>,
    ) -> Result<Ticket>;

    /// Returns committed snapshots matching `predicate`
    fn scan(&self, predicate: &dyn Fn(&Ticket) -> bool) -> Result<Vec<Ticket>>;

    /// Every stored snapshot, reporting damaged ones instead of failing
    fn entries(&self) -> Result<Vec<StoredEntry>> {
        Ok(self.scan(&|_| true)?.into_iter().map(Ok).collect())
    }

    /// Checks if a ticket exists by ID
    fn exists(&self, id: &TicketId) -> Result<bool> {
        match self.get(id) {
            Ok(_) => Ok(true),
            Err(FixhubError::TicketNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Counts tickets matching a predicate
    fn count(&self, predicate: &dyn Fn(&Ticket) -> bool) -> Result<usize> {
        Ok(self.scan(predicate)?.len())
    }
}

/// Prepare a ticket for its first write
pub(crate) fn prepare_create(mut ticket: Ticket) -> Result<Ticket> {
    ticket.version = 1;
    ticket.check_invariants()?;
    Ok(ticket)
}

/// Version check, mutation and post-conditions shared by every store
pub(crate) fn apply_commit(
    current: &Ticket,
    expected_version: u64,
    mutator: &mut dyn FnMut(&Ticket) -> Result<Ticket>,
) -> Result<Ticket> {
    if current.version != expected_version {
        return Err(FixhubError::Conflict {
            id: current.id.to_string(),
            expected: expected_version,
            actual: current.version,
        });
    }

    let mut next = mutator(current)?;

    if next.id != current.id
        || next.reporter_id != current.reporter_id
        || next.created_at != current.created_at
    {
        return Err(FixhubError::InvariantViolation(format!(
            "commit on ticket {} changed an immutable field",
            current.id
        )));
    }

    next.version = current.version + 1;
    next.check_invariants()?;
    Ok(next)
}
