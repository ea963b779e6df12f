//! The workflow engine: validated, atomic ticket transitions
//!
//! Every mutating operation follows the same path:
//!
//! 1. read the latest snapshot and its version from the store,
//! 2. let the store run [`transition::apply`] inside its compare-and-swap,
//! 3. on `Conflict`, re-read and try again (bounded),
//! 4. publish the resulting event; publishing cannot fail the operation.
//!
//! A losing writer in an `assume` race either exhausts its attempts
//! (`Conflict`) or, after re-reading, finds the ticket IN_PROGRESS
//! (`IllegalTransition`). It never overwrites the winner.

use crate::core::transition::{self, Action};
use crate::core::{Actor, NewTicket, Ticket, TicketId, TicketPatch, TransitionEvent};
use crate::error::{FixhubError, Result};
use crate::events::EventHub;
use crate::storage::TicketStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default commit attempts before a conflict is surfaced
pub const DEFAULT_COMMIT_ATTEMPTS: u32 = 3;

/// Applies workflow operations to tickets in a [`TicketStore`]
#[derive(Clone)]
pub struct WorkflowEngine {
    store: Arc<dyn TicketStore>,
    events: EventHub,
    commit_attempts: u32,
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("store", &"Arc<dyn TicketStore>")
            .field("events", &self.events)
            .field("commit_attempts", &self.commit_attempts)
            .finish()
    }
}

impl WorkflowEngine {
    pub fn new(store: Arc<dyn TicketStore>, events: EventHub) -> Self {
        Self {
            store,
            events,
            commit_attempts: DEFAULT_COMMIT_ATTEMPTS,
        }
    }

    /// Override how many times a conflicted commit is retried (minimum 1)
    #[must_use]
    pub fn with_commit_attempts(mut self, attempts: u32) -> Self {
        self.commit_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn TicketStore> {
        &self.store
    }

    #[must_use]
    pub const fn events(&self) -> &EventHub {
        &self.events
    }

    /// Open a new PENDING ticket on behalf of `reporter`
    pub fn create(&self, reporter: &Actor, draft: NewTicket) -> Result<Ticket> {
        let draft = draft.validate()?;
        let ticket = Ticket::new(
            reporter.id.clone(),
            draft.description,
            draft.location,
            draft.priority,
            Utc::now(),
        );
        let created = self.store.create(ticket)?;

        info!(
            ticket = %created.id,
            reporter = %created.reporter_id,
            priority = %created.priority,
            "ticket created"
        );
        self.events.publish(TransitionEvent::created(&created));
        Ok(created)
    }

    /// Latest committed snapshot; withdrawn tickets are `TicketNotFound`
    pub fn get(&self, id: &TicketId) -> Result<Ticket> {
        let ticket = self.store.get(id)?;
        if ticket.is_withdrawn() {
            return Err(FixhubError::not_found(id));
        }
        Ok(ticket)
    }

    /// Like [`get`](Self::get), restricted to the reporter and handlers
    pub fn view(&self, id: &TicketId, actor: &Actor) -> Result<Ticket> {
        let ticket = self.get(id)?;
        if actor.is_handler() || ticket.is_reported_by(&actor.id) {
            Ok(ticket)
        } else {
            Err(FixhubError::forbidden(
                actor.id.as_str(),
                "view",
                "ticket belongs to another reporter",
            ))
        }
    }

    /// Claim a PENDING ticket
    pub fn assume(&self, id: &TicketId, handler: &Actor) -> Result<Ticket> {
        self.execute(id, handler, &Action::Assume, None)
    }

    /// Give a claimed ticket back to the pool
    pub fn renounce(&self, id: &TicketId, handler: &Actor) -> Result<Ticket> {
        self.execute(id, handler, &Action::Renounce, None)
    }

    /// Close a claimed ticket without a fix
    pub fn reject(&self, id: &TicketId, handler: &Actor, reason: &str) -> Result<Ticket> {
        let action = Action::Reject {
            reason: reason.to_string(),
        };
        self.execute(id, handler, &action, None)
    }

    /// Close a claimed ticket as fixed
    pub fn resolve(&self, id: &TicketId, handler: &Actor, description: &str) -> Result<Ticket> {
        let action = Action::Resolve {
            description: description.to_string(),
        };
        self.execute(id, handler, &action, None)
    }

    /// Change description, location or priority of a PENDING ticket
    pub fn edit(&self, id: &TicketId, reporter: &Actor, patch: TicketPatch) -> Result<Ticket> {
        self.execute(id, reporter, &Action::Edit(patch), None)
    }

    /// Soft-remove a PENDING ticket
    pub fn withdraw(&self, id: &TicketId, reporter: &Actor) -> Result<Ticket> {
        self.execute(id, reporter, &Action::Withdraw, None)
    }

    /// Run `action` against ticket `id`
    ///
    /// With `expected_version` set, exactly one commit is attempted against
    /// that version and a mismatch surfaces as `Conflict`. Without it, the
    /// engine reads the latest version and retries conflicts up to the
    /// configured number of attempts.
    pub fn execute(
        &self,
        id: &TicketId,
        actor: &Actor,
        action: &Action,
        expected_version: Option<u64>,
    ) -> Result<Ticket> {
        let operation = action.operation();
        // Bad payloads fail before any store access
        let action = action.validated()?;
        let attempts = if expected_version.is_some() {
            1
        } else {
            self.commit_attempts
        };

        let mut last_conflict = None;
        for attempt in 1..=attempts {
            let version = match expected_version {
                Some(version) => version,
                None => self.store.get(id)?.version,
            };

            let mut event = None;
            let outcome = self.store.commit(id, version, &mut |current: &Ticket| {
                let transition = transition::apply(current, &action, actor, Utc::now())?;
                event = Some(transition.event);
                Ok(transition.ticket)
            });

            match outcome {
                Ok(ticket) => {
                    info!(
                        ticket = %ticket.id,
                        %operation,
                        actor = %actor.id,
                        status = %ticket.status,
                        version = ticket.version,
                        attempt,
                        "transition committed"
                    );
                    if let Some(event) = event {
                        self.events.publish(event);
                    }
                    return Ok(ticket);
                },
                Err(e @ FixhubError::Conflict { .. }) => {
                    debug!(ticket = %id, %operation, attempt, error = %e, "commit conflicted");
                    last_conflict = Some(e);
                },
                Err(e) => {
                    debug!(ticket = %id, %operation, actor = %actor.id, error = %e, "transition refused");
                    return Err(e);
                },
            }
        }

        warn!(ticket = %id, %operation, attempts, "giving up after repeated conflicts");
        Err(last_conflict.unwrap_or_else(|| FixhubError::Conflict {
            id: id.to_string(),
            expected: expected_version.unwrap_or_default(),
            actual: expected_version.unwrap_or_default(),
        }))
    }
}
