//! Read-only projections over committed tickets
//!
//! Every view skips withdrawn tickets. The three listing views are thin
//! wrappers that build a [`TicketFilter`] and enforce who may ask and
//! which status filters make sense for the view.

use crate::core::{Actor, ActorId, Priority, Status, Ticket};
use crate::error::{FixhubError, Result};
use crate::storage::TicketStore;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Sort options for ticket listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Newest first
    #[default]
    Created,
    /// Most recently updated first
    Updated,
    /// Higher priority first, then oldest first
    Priority,
}

/// Generic ticket filter backing the listing views
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Any of these statuses; empty means all
    pub statuses: Vec<Status>,
    pub priority: Option<Priority>,
    pub reporter: Option<ActorId>,
    pub assignee: Option<ActorId>,
    /// Keep PENDING tickets regardless of `assignee`
    pub include_unclaimed: bool,
    pub sort_by: SortBy,
    pub limit: Option<usize>,
}

impl TicketFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.statuses = vec![status];
        self
    }

    #[must_use]
    pub fn statuses(mut self, statuses: &[Status]) -> Self {
        self.statuses = statuses.to_vec();
        self
    }

    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn reporter(mut self, reporter: ActorId) -> Self {
        self.reporter = Some(reporter);
        self
    }

    #[must_use]
    pub fn assignee(mut self, assignee: ActorId) -> Self {
        self.assignee = Some(assignee);
        self
    }

    #[must_use]
    pub const fn include_unclaimed(mut self) -> Self {
        self.include_unclaimed = true;
        self
    }

    #[must_use]
    pub const fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if a ticket matches all filter criteria
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        if ticket.is_withdrawn() {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&ticket.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != ticket.priority) {
            return false;
        }
        if let Some(reporter) = &self.reporter {
            if !ticket.is_reported_by(reporter) {
                return false;
            }
        }
        if let Some(assignee) = &self.assignee {
            let unclaimed = self.include_unclaimed && ticket.status == Status::Pending;
            if !unclaimed && !ticket.is_assigned_to(assignee) {
                return false;
            }
        }
        true
    }

    /// Sort and truncate already matching tickets
    #[must_use]
    pub fn arrange(&self, mut tickets: Vec<Ticket>) -> Vec<Ticket> {
        tickets.sort_by(|a, b| self.compare(a, b));
        if let Some(limit) = self.limit {
            tickets.truncate(limit);
        }
        tickets
    }

    fn compare(&self, a: &Ticket, b: &Ticket) -> Ordering {
        let ordering = match self.sort_by {
            SortBy::Created => b.created_at.cmp(&a.created_at),
            SortBy::Updated => b.updated_at.cmp(&a.updated_at),
            SortBy::Priority => b
                .priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at)),
        };
        // Stable output for equal timestamps
        ordering.then_with(|| a.id.to_string().cmp(&b.id.to_string()))
    }
}

const OPEN_STATUSES: [Status; 2] = [Status::Pending, Status::InProgress];
const CLOSED_STATUSES: [Status; 2] = [Status::Done, Status::Rejected];

/// Listing views used by the "mine", "assigned" and "closed" pages
#[derive(Clone)]
pub struct TicketQueries {
    store: Arc<dyn TicketStore>,
}

impl TicketQueries {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Run an arbitrary filter against the store
    pub fn find(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let matching = self.store.scan(&|ticket| filter.matches(ticket))?;
        let tickets = filter.arrange(matching);
        debug!(count = tickets.len(), sort = ?filter.sort_by, "ticket query");
        Ok(tickets)
    }

    /// Tickets reported by `actor`, newest first
    pub fn reported_by(&self, actor: &Actor, status: Option<Status>) -> Result<Vec<Ticket>> {
        let mut filter = TicketFilter::new()
            .reporter(actor.id.clone())
            .sort_by(SortBy::Created);
        if let Some(status) = status {
            filter = filter.status(status);
        }
        self.find(&filter)
    }

    /// Unclaimed tickets plus those assigned to `handler`
    ///
    /// Ordered by priority, most urgent first, then oldest first.
    pub fn assigned_to(&self, handler: &Actor, status: Option<Status>) -> Result<Vec<Ticket>> {
        require_handler(handler, "list assigned tickets")?;
        let statuses = status_domain(status, &OPEN_STATUSES, "assigned")?;
        let filter = TicketFilter::new()
            .statuses(&statuses)
            .assignee(handler.id.clone())
            .include_unclaimed()
            .sort_by(SortBy::Priority);
        self.find(&filter)
    }

    /// DONE and REJECTED tickets, most recently updated first
    pub fn closed(&self, handler: &Actor, status: Option<Status>) -> Result<Vec<Ticket>> {
        require_handler(handler, "list closed tickets")?;
        let statuses = status_domain(status, &CLOSED_STATUSES, "closed")?;
        let filter = TicketFilter::new()
            .statuses(&statuses)
            .sort_by(SortBy::Updated);
        self.find(&filter)
    }
}

fn require_handler(actor: &Actor, action: &str) -> Result<()> {
    if actor.is_handler() {
        Ok(())
    } else {
        Err(FixhubError::forbidden(
            actor.id.as_str(),
            action,
            "only handlers can see this view",
        ))
    }
}

fn status_domain(status: Option<Status>, domain: &[Status], view: &str) -> Result<Vec<Status>> {
    match status {
        None => Ok(domain.to_vec()),
        Some(status) if domain.contains(&status) => Ok(vec![status]),
        Some(status) => Err(FixhubError::invalid_input(format!(
            "status {status} cannot be used with the {view} view"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TicketBuilder;
    use crate::storage::MemoryStore;
    use chrono::{Duration, Utc};

    fn seeded() -> (TicketQueries, Vec<Ticket>) {
        let store = Arc::new(MemoryStore::new());
        let base = Utc::now() - Duration::hours(10);
        let at = |h: i64| base + Duration::hours(h);

        let tickets = vec![
            TicketBuilder::new()
                .reporter("alice")
                .description("old regular")
                .created_at(at(0))
                .updated_at(at(0))
                .build(),
            TicketBuilder::new()
                .reporter("alice")
                .description("urgent leak")
                .priority(Priority::Urgent)
                .created_at(at(1))
                .updated_at(at(1))
                .build(),
            TicketBuilder::new()
                .reporter("dave")
                .description("bob's job")
                .status(Status::InProgress)
                .assignee("bob")
                .created_at(at(2))
                .updated_at(at(3))
                .build(),
            TicketBuilder::new()
                .reporter("dave")
                .description("carol's job")
                .priority(Priority::Urgent)
                .status(Status::InProgress)
                .assignee("carol")
                .created_at(at(2))
                .updated_at(at(3))
                .build(),
            TicketBuilder::new()
                .reporter("alice")
                .description("fixed")
                .resolved_by("bob", "done")
                .created_at(at(3))
                .updated_at(at(5))
                .build(),
            TicketBuilder::new()
                .reporter("dave")
                .description("refused")
                .rejected_by("carol", "not ours")
                .created_at(at(4))
                .updated_at(at(6))
                .build(),
            TicketBuilder::new()
                .reporter("alice")
                .description("withdrawn")
                .created_at(at(7))
                .updated_at(at(7))
                .withdrawn_at(at(8))
                .build(),
        ];
        for ticket in &tickets {
            store.create(ticket.clone()).unwrap();
        }
        (TicketQueries::new(store), tickets)
    }

    fn descriptions(tickets: &[Ticket]) -> Vec<&str> {
        tickets.iter().map(|t| t.description.as_str()).collect()
    }

    #[test]
    fn test_mine_lists_own_tickets_newest_first() {
        let (queries, _) = seeded();
        let mine = queries.reported_by(&Actor::reporter("alice"), None).unwrap();
        assert_eq!(descriptions(&mine), vec!["fixed", "urgent leak", "old regular"]);

        let done = queries
            .reported_by(&Actor::reporter("alice"), Some(Status::Done))
            .unwrap();
        assert_eq!(descriptions(&done), vec!["fixed"]);
    }

    #[test]
    fn test_assigned_shows_pool_and_own_claims_by_priority() {
        let (queries, _) = seeded();
        let assigned = queries.assigned_to(&Actor::handler("bob"), None).unwrap();
        assert_eq!(
            descriptions(&assigned),
            vec!["urgent leak", "old regular", "bob's job"]
        );

        let claimed = queries
            .assigned_to(&Actor::handler("bob"), Some(Status::InProgress))
            .unwrap();
        assert_eq!(descriptions(&claimed), vec!["bob's job"]);
    }

    #[test]
    fn test_closed_view_most_recent_first() {
        let (queries, _) = seeded();
        let closed = queries.closed(&Actor::handler("bob"), None).unwrap();
        assert_eq!(descriptions(&closed), vec!["refused", "fixed"]);
    }

    #[test]
    fn test_status_outside_view_is_invalid_input() {
        let (queries, _) = seeded();
        let bob = Actor::handler("bob");
        assert!(matches!(
            queries.assigned_to(&bob, Some(Status::Done)),
            Err(FixhubError::InvalidInput(_))
        ));
        assert!(matches!(
            queries.closed(&bob, Some(Status::Pending)),
            Err(FixhubError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_handler_views_require_handler_role() {
        let (queries, _) = seeded();
        let alice = Actor::reporter("alice");
        assert!(matches!(
            queries.assigned_to(&alice, None),
            Err(FixhubError::Forbidden { .. })
        ));
        assert!(matches!(
            queries.closed(&alice, None),
            Err(FixhubError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_filter_limit_and_priority() {
        let (queries, _) = seeded();
        let filter = TicketFilter::new()
            .priority(Priority::Urgent)
            .sort_by(SortBy::Created)
            .limit(1);
        let found = queries.find(&filter).unwrap();
        assert_eq!(descriptions(&found), vec!["carol's job"]);
    }

    #[test]
    fn test_withdrawn_tickets_never_match() {
        let (_, tickets) = seeded();
        let withdrawn = tickets.last().unwrap();
        assert!(!TicketFilter::new().matches(withdrawn));
    }
}
