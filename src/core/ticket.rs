use crate::error::{FixhubError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a ticket
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Generate a fresh random ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an ID from its textual form
    pub fn parse_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| FixhubError::invalid_input(format!("'{s}' is not a valid ticket id")))
    }

    /// First eight characters, for log lines
    #[must_use]
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque caller identity, produced by whatever authenticated the request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// What an authenticated caller is allowed to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Reports issues and manages its own pending tickets
    Reporter,
    /// Maintenance staff: claims and closes tickets
    Handler,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reporter => write!(f, "REPORTER"),
            Self::Handler => write!(f, "HANDLER"),
        }
    }
}

/// Caller context passed explicitly into every operation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: ActorId::new(id),
            role,
        }
    }

    pub fn reporter(id: impl Into<String>) -> Self {
        Self::new(id, Role::Reporter)
    }

    pub fn handler(id: impl Into<String>) -> Self {
        Self::new(id, Role::Handler)
    }

    #[must_use]
    pub fn is_handler(&self) -> bool {
        self.role == Role::Handler
    }
}

/// Ticket status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Reported, nobody working on it
    Pending,
    /// Claimed by exactly one handler
    InProgress,
    /// Fixed
    Done,
    /// Closed without a fix
    Rejected,
}

impl Status {
    /// Terminal statuses accept no further transitions
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Rejected)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Rejected => "REJECTED",
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = FixhubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "DONE" => Ok(Self::Done),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(FixhubError::invalid_input(format!(
                "unknown status '{s}' (expected PENDING, IN_PROGRESS, DONE or REJECTED)"
            ))),
        }
    }
}

/// Ticket priority; informational only, never affects transition legality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Regular,
    Important,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Regular
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Regular => write!(f, "REGULAR"),
            Self::Important => write!(f, "IMPORTANT"),
            Self::Urgent => write!(f, "URGENT"),
        }
    }
}

impl FromStr for Priority {
    type Err = FixhubError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "REGULAR" => Ok(Self::Regular),
            "IMPORTANT" => Ok(Self::Important),
            "URGENT" => Ok(Self::Urgent),
            _ => Err(FixhubError::invalid_input(format!(
                "unknown priority '{s}' (expected LOW, REGULAR, IMPORTANT or URGENT)"
            ))),
        }
    }
}

/// Where the problem is
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    pub area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

impl Location {
    pub fn new(area: impl Into<String>) -> Self {
        Self {
            floor: None,
            area: area.into(),
            zone: None,
        }
    }

    #[must_use]
    pub fn with_floor(mut self, floor: impl Into<String>) -> Self {
        self.floor = Some(floor.into());
        self
    }

    #[must_use]
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Trim every field; blank optional fields become `None`
    pub fn normalized(self) -> Result<Self> {
        let area = self.area.trim().to_string();
        if area.is_empty() {
            return Err(FixhubError::invalid_input("location.area must not be empty"));
        }
        let tidy = |field: Option<String>| {
            field
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Ok(Self {
            floor: tidy(self.floor),
            area,
            zone: tidy(self.zone),
        })
    }
}

/// How a ticket was closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub description: String,
    pub resolved_at: DateTime<Utc>,
    pub resolved_by: ActorId,
}

/// A maintenance ticket snapshot
///
/// Snapshots are plain values. The only way a new snapshot reaches the store
/// is through [`TicketStore::commit`](crate::storage::TicketStore::commit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    pub reporter_id: ActorId,
    pub description: String,
    pub location: Location,
    pub priority: Priority,
    pub status: Status,
    pub assignee_id: Option<ActorId>,
    pub resolution: Option<Resolution>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawn_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// A fresh PENDING ticket; the store assigns the first version on create
    pub fn new(
        reporter_id: ActorId,
        description: impl Into<String>,
        location: Location,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TicketId::new(),
            reporter_id,
            description: description.into(),
            location,
            priority,
            status: Status::Pending,
            assignee_id: None,
            resolution: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            version: 0,
            withdrawn_at: None,
        }
    }

    #[must_use]
    pub const fn is_withdrawn(&self) -> bool {
        self.withdrawn_at.is_some()
    }

    #[must_use]
    pub fn is_assigned_to(&self, actor: &ActorId) -> bool {
        self.assignee_id.as_ref() == Some(actor)
    }

    #[must_use]
    pub fn is_reported_by(&self, actor: &ActorId) -> bool {
        &self.reporter_id == actor
    }

    /// Verify the data-model invariants of this snapshot
    pub fn check_invariants(&self) -> Result<()> {
        let violation = |what: &str| {
            Err(FixhubError::InvariantViolation(format!(
                "ticket {} ({}): {what}",
                self.id, self.status
            )))
        };

        if self.assignee_id.is_some() != (self.status == Status::InProgress) {
            return violation("an assignee must be present exactly while IN_PROGRESS");
        }
        if self.resolution.is_some() != self.status.is_terminal() {
            return violation("a resolution must be present exactly in DONE or REJECTED");
        }
        if self.rejection_reason.is_some() != (self.status == Status::Rejected) {
            return violation("a rejection reason must be present exactly in REJECTED");
        }
        if self.is_withdrawn() && self.status != Status::Pending {
            return violation("only PENDING tickets can be withdrawn");
        }
        if self.updated_at < self.created_at {
            return violation("updatedAt precedes createdAt");
        }
        Ok(())
    }
}
