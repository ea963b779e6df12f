//! fixhub - Ticket lifecycle and assignment workflow engine
//!
//! This crate provides the authoritative state machine behind a maintenance
//! ticket service:
//! - Validated transitions between PENDING, IN_PROGRESS, DONE and REJECTED
//! - Exclusive assignment: at most one handler works on a ticket
//! - Optimistic concurrency through a per-ticket version token
//! - Read-only listing views for reporters and handlers
//! - Fire-and-forget transition events for audit and notification sinks
//! - An HTTP API (feature `api`, enabled by default)

// Allow missing error documentation for internal implementations
#![allow(clippy::missing_errors_doc)]
// Allow some pedantic lints that don't improve code quality
#![allow(clippy::option_if_let_else)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::module_name_repetitions)]

//! # Concurrent Safety
//!
//! Every mutation goes through [`storage::TicketStore::commit`], which
//! compares the caller's expected version with the stored one under a
//! per-ticket lock. Unrelated tickets never wait on each other. Two handlers
//! racing to assume the same ticket cannot both win: the loser sees
//! `Conflict`, or `IllegalTransition` once its retry reads the new state.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fixhub::core::{Actor, Location, NewTicket, Priority, Status};
//! use fixhub::events::EventHub;
//! use fixhub::storage::MemoryStore;
//! use fixhub::workflow::WorkflowEngine;
//!
//! let engine = WorkflowEngine::new(Arc::new(MemoryStore::new()), EventHub::default());
//! let alice = Actor::reporter("alice");
//! let bob = Actor::handler("bob");
//!
//! let draft = NewTicket::new("Leaking tap", Location::new("Kitchen"), Priority::Regular);
//! let ticket = engine.create(&alice, draft)?;
//! engine.assume(&ticket.id, &bob)?;
//! let done = engine.resolve(&ticket.id, &bob, "Replaced the washer")?;
//! assert_eq!(done.status, Status::Done);
//! # Ok::<(), fixhub::FixhubError>(())
//! ```

pub mod auth;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod query;
pub mod storage;
pub mod workflow;

#[cfg(feature = "api")]
pub mod api;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use error::{FixhubError, Result};
