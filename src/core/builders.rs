use super::{ActorId, Location, Priority, Resolution, Status, Ticket, TicketId};
use chrono::{DateTime, Utc};

/// Builder for creating Ticket snapshots in any state
///
/// The builder does not enforce the workflow invariants; call
/// [`Ticket::check_invariants`] on the result when that matters.
#[derive(Default)]
pub struct TicketBuilder {
    id: Option<TicketId>,
    reporter: Option<ActorId>,
    description: Option<String>,
    location: Option<Location>,
    priority: Option<Priority>,
    status: Option<Status>,
    assignee: Option<ActorId>,
    resolution: Option<Resolution>,
    rejection_reason: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: Option<u64>,
    withdrawn_at: Option<DateTime<Utc>>,
}

impl TicketBuilder {
    /// Create a new ticket builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ticket ID
    #[must_use]
    pub fn id(mut self, id: TicketId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the reporter
    #[must_use]
    pub fn reporter(mut self, reporter: impl Into<String>) -> Self {
        self.reporter = Some(ActorId::new(reporter));
        self
    }

    /// Set the description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the location
    #[must_use]
    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the priority
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the status
    #[must_use]
    pub const fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the assignee
    #[must_use]
    pub fn assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(ActorId::new(assignee));
        self
    }

    /// Close as DONE by `handler`
    #[must_use]
    pub fn resolved_by(mut self, handler: impl Into<String>, description: impl Into<String>) -> Self {
        self.status = Some(Status::Done);
        self.assignee = None;
        self.resolution = Some(Resolution {
            description: description.into(),
            resolved_at: Utc::now(),
            resolved_by: ActorId::new(handler),
        });
        self
    }

    /// Close as REJECTED by `handler`
    #[must_use]
    pub fn rejected_by(mut self, handler: impl Into<String>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.status = Some(Status::Rejected);
        self.assignee = None;
        self.resolution = Some(Resolution {
            description: reason.clone(),
            resolved_at: Utc::now(),
            resolved_by: ActorId::new(handler),
        });
        self.rejection_reason = Some(reason);
        self
    }

    /// Set `created_at` timestamp
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Set `updated_at` timestamp
    #[must_use]
    pub const fn updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Set the concurrency token
    #[must_use]
    pub const fn version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Mark as withdrawn
    #[must_use]
    pub const fn withdrawn_at(mut self, withdrawn_at: DateTime<Utc>) -> Self {
        self.withdrawn_at = Some(withdrawn_at);
        self
    }

    /// Build the ticket
    pub fn build(self) -> Ticket {
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        Ticket {
            id: self.id.unwrap_or_default(),
            reporter_id: self.reporter.unwrap_or_else(|| ActorId::new("reporter")),
            description: self.description.unwrap_or_else(|| "Untitled issue".to_string()),
            location: self.location.unwrap_or_else(|| Location::new("unspecified")),
            priority: self.priority.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            assignee_id: self.assignee,
            resolution: self.resolution,
            rejection_reason: self.rejection_reason,
            created_at,
            updated_at: self.updated_at.unwrap_or(created_at).max(created_at),
            version: self.version.unwrap_or(1),
            withdrawn_at: self.withdrawn_at,
        }
    }
}
