//! The ticket state machine
//!
//! ```text
//! PENDING ──assume──▶ IN_PROGRESS ──resolve──▶ DONE
//!    ▲                   │    │
//!    └─────renounce──────┘    └────reject────▶ REJECTED
//! ```
//!
//! [`apply`] is pure: it maps the current snapshot plus a requested action
//! to the next snapshot and the event describing the change. It never touches
//! the store, so the store can run it inside its compare-and-swap.

use super::draft::{TicketPatch, required_text};
use super::{Actor, ActorId, Resolution, Status, Ticket, TicketId};
use crate::error::{FixhubError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of workflow operation, as recorded in events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Assume,
    Renounce,
    Reject,
    Resolve,
    Edit,
    Withdraw,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Assume => "assume",
            Self::Renounce => "renounce",
            Self::Reject => "reject",
            Self::Resolve => "resolve",
            Self::Edit => "edit",
            Self::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state change requested by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Assume,
    Renounce,
    Reject { reason: String },
    Resolve { description: String },
    Edit(TicketPatch),
    Withdraw,
}

impl Action {
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Assume => Operation::Assume,
            Self::Renounce => Operation::Renounce,
            Self::Reject { .. } => Operation::Reject,
            Self::Resolve { .. } => Operation::Resolve,
            Self::Edit(_) => Operation::Edit,
            Self::Withdraw => Operation::Withdraw,
        }
    }

    /// Validate the payload and return a normalized copy
    pub fn validated(&self) -> Result<Self> {
        Ok(match self {
            Self::Reject { reason } => Self::Reject {
                reason: required_text("reason", reason)?,
            },
            Self::Resolve { description } => Self::Resolve {
                description: required_text("description", description)?,
            },
            Self::Edit(patch) => Self::Edit(patch.clone().validate()?),
            other => other.clone(),
        })
    }
}

/// Audit/notification record of one committed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionEvent {
    pub ticket_id: TicketId,
    pub operation: Operation,
    /// `None` for ticket creation
    pub from_status: Option<Status>,
    pub to_status: Status,
    pub actor_id: ActorId,
    pub timestamp: DateTime<Utc>,
    /// Version of the snapshot this event produced
    pub version: u64,
}

impl TransitionEvent {
    /// Event for a freshly stored ticket
    #[must_use]
    pub fn created(ticket: &Ticket) -> Self {
        Self {
            ticket_id: ticket.id.clone(),
            operation: Operation::Create,
            from_status: None,
            to_status: ticket.status,
            actor_id: ticket.reporter_id.clone(),
            timestamp: ticket.created_at,
            version: ticket.version,
        }
    }
}

/// Output of [`apply`]
#[derive(Debug, Clone)]
pub struct Transition {
    pub ticket: Ticket,
    pub event: TransitionEvent,
}

/// Whether the state machine has an edge from `from` to `to`
///
/// Self-loops on PENDING cover reporter edits and withdrawal.
#[must_use]
pub const fn is_legal_edge(from: Status, to: Status) -> bool {
    matches!(
        (from, to),
        (Status::Pending, Status::Pending | Status::InProgress)
            | (
                Status::InProgress,
                Status::Pending | Status::Done | Status::Rejected
            )
    )
}

/// Compute the next snapshot for `action` performed by `actor`
///
/// Checks run in a fixed order: payload validation, caller role, then for
/// handler operations the status before the assignee, and for reporter
/// operations the ownership before the status. The returned ticket keeps the
/// current version; the store bumps it on commit.
pub fn apply(
    current: &Ticket,
    action: &Action,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Transition> {
    if current.is_withdrawn() {
        return Err(FixhubError::not_found(&current.id));
    }

    let action = action.validated()?;
    let operation = action.operation();
    let mut next = current.clone();

    match action {
        Action::Assume => {
            require_handler(actor, operation)?;
            require_status(current, Status::Pending, operation)?;
            next.status = Status::InProgress;
            next.assignee_id = Some(actor.id.clone());
        },
        Action::Renounce => {
            require_assignee(current, actor, operation)?;
            next.status = Status::Pending;
            next.assignee_id = None;
            next.resolution = None;
            next.rejection_reason = None;
        },
        Action::Reject { reason } => {
            require_assignee(current, actor, operation)?;
            next.status = Status::Rejected;
            next.assignee_id = None;
            next.resolution = Some(Resolution {
                description: reason.clone(),
                resolved_at: now,
                resolved_by: actor.id.clone(),
            });
            next.rejection_reason = Some(reason);
        },
        Action::Resolve { description } => {
            require_assignee(current, actor, operation)?;
            next.status = Status::Done;
            next.assignee_id = None;
            next.resolution = Some(Resolution {
                description,
                resolved_at: now,
                resolved_by: actor.id.clone(),
            });
        },
        Action::Edit(patch) => {
            require_reporter(current, actor, operation)?;
            require_status(current, Status::Pending, operation)?;
            if let Some(description) = patch.description {
                next.description = description;
            }
            if let Some(location) = patch.location {
                next.location = location;
            }
            if let Some(priority) = patch.priority {
                next.priority = priority;
            }
        },
        Action::Withdraw => {
            require_reporter(current, actor, operation)?;
            require_status(current, Status::Pending, operation)?;
            next.withdrawn_at = Some(now);
        },
    }

    next.updated_at = now.max(current.updated_at);
    debug_assert!(is_legal_edge(current.status, next.status));

    let event = TransitionEvent {
        ticket_id: current.id.clone(),
        operation,
        from_status: Some(current.status),
        to_status: next.status,
        actor_id: actor.id.clone(),
        timestamp: next.updated_at,
        version: current.version + 1,
    };

    Ok(Transition {
        ticket: next,
        event,
    })
}

fn require_handler(actor: &Actor, operation: Operation) -> Result<()> {
    if actor.is_handler() {
        Ok(())
    } else {
        Err(FixhubError::forbidden(
            actor.id.as_str(),
            operation.as_str(),
            "only handlers can work on tickets",
        ))
    }
}

fn require_status(current: &Ticket, expected: Status, operation: Operation) -> Result<()> {
    if current.status == expected {
        Ok(())
    } else {
        Err(FixhubError::IllegalTransition {
            id: current.id.to_string(),
            operation: operation.as_str().to_string(),
            status: current.status,
        })
    }
}

/// Handler operations on an IN_PROGRESS ticket owned by the caller
fn require_assignee(current: &Ticket, actor: &Actor, operation: Operation) -> Result<()> {
    require_handler(actor, operation)?;
    require_status(current, Status::InProgress, operation)?;
    if current.is_assigned_to(&actor.id) {
        Ok(())
    } else {
        Err(FixhubError::forbidden(
            actor.id.as_str(),
            operation.as_str(),
            "ticket is assigned to another handler",
        ))
    }
}

fn require_reporter(current: &Ticket, actor: &Actor, operation: Operation) -> Result<()> {
    if current.is_reported_by(&actor.id) {
        Ok(())
    } else {
        Err(FixhubError::forbidden(
            actor.id.as_str(),
            operation.as_str(),
            "only the reporter can change this ticket",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Location, Priority, TicketBuilder};

    fn pending() -> Ticket {
        TicketBuilder::new()
            .reporter("alice")
            .description("leak in room 4")
            .location(Location::new("room 4"))
            .version(1)
            .build()
    }

    fn in_progress(handler: &str) -> Ticket {
        TicketBuilder::new()
            .reporter("alice")
            .description("leak in room 4")
            .status(Status::InProgress)
            .assignee(handler)
            .version(2)
            .build()
    }

    fn reject(reason: &str) -> Action {
        Action::Reject {
            reason: reason.to_string(),
        }
    }

    fn resolve(description: &str) -> Action {
        Action::Resolve {
            description: description.to_string(),
        }
    }

    #[test]
    fn test_assume_claims_pending_ticket() {
        let ticket = pending();
        let t = apply(&ticket, &Action::Assume, &Actor::handler("bob"), Utc::now()).unwrap();
        assert_eq!(t.ticket.status, Status::InProgress);
        assert_eq!(t.ticket.assignee_id, Some(ActorId::new("bob")));
        assert_eq!(t.ticket.version, ticket.version, "store owns the version bump");
        assert_eq!(t.event.from_status, Some(Status::Pending));
        assert_eq!(t.event.to_status, Status::InProgress);
        assert_eq!(t.event.version, 2);
        t.ticket.check_invariants().unwrap();
    }

    #[test]
    fn test_assume_requires_handler_role() {
        let err = apply(&pending(), &Action::Assume, &Actor::reporter("carol"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, FixhubError::Forbidden { .. }));
    }

    #[test]
    fn test_assume_of_claimed_ticket_is_illegal() {
        let err = apply(&in_progress("bob"), &Action::Assume, &Actor::handler("carol"), Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            FixhubError::IllegalTransition { status: Status::InProgress, .. }
        ));
    }

    #[test]
    fn test_renounce_returns_ticket_to_pool() {
        let t = apply(&in_progress("bob"), &Action::Renounce, &Actor::handler("bob"), Utc::now())
            .unwrap();
        assert_eq!(t.ticket.status, Status::Pending);
        assert!(t.ticket.assignee_id.is_none());
        assert!(t.ticket.resolution.is_none());
        t.ticket.check_invariants().unwrap();
    }

    #[test]
    fn test_renounce_by_other_handler_is_forbidden() {
        let err = apply(&in_progress("bob"), &Action::Renounce, &Actor::handler("carol"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, FixhubError::Forbidden { .. }));
    }

    #[test]
    fn test_renounce_of_pending_ticket_is_illegal() {
        let err = apply(&pending(), &Action::Renounce, &Actor::handler("bob"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, FixhubError::IllegalTransition { .. }));
    }

    #[test]
    fn test_resolve_records_resolution() {
        let now = Utc::now();
        let t = apply(&in_progress("bob"), &resolve("pipe replaced"), &Actor::handler("bob"), now)
            .unwrap();
        assert_eq!(t.ticket.status, Status::Done);
        assert!(t.ticket.assignee_id.is_none());
        let resolution = t.ticket.resolution.as_ref().unwrap();
        assert_eq!(resolution.description, "pipe replaced");
        assert_eq!(resolution.resolved_by, ActorId::new("bob"));
        assert_eq!(resolution.resolved_at, now);
        t.ticket.check_invariants().unwrap();
    }

    #[test]
    fn test_reject_requires_reason() {
        let err = apply(&in_progress("bob"), &reject("  "), &Actor::handler("bob"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, FixhubError::InvalidInput(_)));
    }

    #[test]
    fn test_reject_records_reason_and_resolution() {
        let t = apply(&in_progress("bob"), &reject("not our building"), &Actor::handler("bob"), Utc::now())
            .unwrap();
        assert_eq!(t.ticket.status, Status::Rejected);
        assert_eq!(t.ticket.rejection_reason.as_deref(), Some("not our building"));
        assert!(t.ticket.resolution.is_some());
        t.ticket.check_invariants().unwrap();
    }

    #[test]
    fn test_terminal_tickets_accept_nothing() {
        let done = apply(&in_progress("bob"), &resolve("fixed"), &Actor::handler("bob"), Utc::now())
            .unwrap()
            .ticket;
        let actions = [
            Action::Assume,
            Action::Renounce,
            reject("late"),
            resolve("again"),
            Action::Edit(TicketPatch {
                priority: Some(Priority::Low),
                ..TicketPatch::default()
            }),
            Action::Withdraw,
        ];
        for action in &actions {
            for actor in [Actor::handler("bob"), Actor::reporter("alice")] {
                assert!(
                    apply(&done, action, &actor, Utc::now()).is_err(),
                    "{action:?} by {actor:?} succeeded on a DONE ticket"
                );
            }
        }
    }

    #[test]
    fn test_edit_only_by_reporter_while_pending() {
        let patch = Action::Edit(TicketPatch {
            description: Some("bigger leak".to_string()),
            ..TicketPatch::default()
        });

        let t = apply(&pending(), &patch, &Actor::reporter("alice"), Utc::now()).unwrap();
        assert_eq!(t.ticket.description, "bigger leak");
        assert_eq!(t.event.to_status, Status::Pending);

        let err = apply(&pending(), &patch, &Actor::reporter("mallory"), Utc::now()).unwrap_err();
        assert!(matches!(err, FixhubError::Forbidden { .. }));

        let err = apply(&in_progress("bob"), &patch, &Actor::reporter("alice"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, FixhubError::IllegalTransition { .. }));
    }

    #[test]
    fn test_withdraw_marks_ticket_and_hides_it() {
        let t = apply(&pending(), &Action::Withdraw, &Actor::reporter("alice"), Utc::now()).unwrap();
        assert!(t.ticket.is_withdrawn());
        t.ticket.check_invariants().unwrap();

        let err = apply(&t.ticket, &Action::Assume, &Actor::handler("bob"), Utc::now()).unwrap_err();
        assert!(matches!(err, FixhubError::TicketNotFound { .. }));
    }

    #[test]
    fn test_updated_at_never_moves_backwards() {
        let ticket = pending();
        let earlier = ticket.updated_at - chrono::Duration::seconds(30);
        let t = apply(&ticket, &Action::Assume, &Actor::handler("bob"), earlier).unwrap();
        assert_eq!(t.ticket.updated_at, ticket.updated_at);
    }

    #[test]
    fn test_legal_edges() {
        assert!(is_legal_edge(Status::Pending, Status::InProgress));
        assert!(is_legal_edge(Status::InProgress, Status::Pending));
        assert!(is_legal_edge(Status::InProgress, Status::Done));
        assert!(is_legal_edge(Status::InProgress, Status::Rejected));
        assert!(!is_legal_edge(Status::Pending, Status::Done));
        assert!(!is_legal_edge(Status::Done, Status::Pending));
        assert!(!is_legal_edge(Status::Rejected, Status::InProgress));
    }
}
