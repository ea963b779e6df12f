//! Test utilities for fixhub
//!
//! This module provides common test fixtures and utilities to reduce
//! duplication in test code across the codebase.

#![cfg(test)]

use crate::core::{Actor, Location, NewTicket, Priority, Ticket, TransitionEvent};
use crate::events::EventHub;
use crate::storage::{MemoryStore, TicketStore};
use crate::workflow::WorkflowEngine;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Engine over an in-memory store with a subscribed event receiver
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub engine: WorkflowEngine,
    pub events: broadcast::Receiver<TransitionEvent>,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let hub = EventHub::new(64);
        let events = hub.subscribe();
        let engine = WorkflowEngine::new(Arc::clone(&store) as Arc<dyn TicketStore>, hub);
        Self {
            store,
            engine,
            events,
        }
    }

    /// Create a PENDING ticket reported by `reporter`
    pub fn create_ticket(&self, reporter: &str, description: &str) -> Ticket {
        self.engine
            .create(&Actor::reporter(reporter), draft(description))
            .expect("Failed to create ticket")
    }

    /// Create a ticket and let `handler` assume it
    pub fn assumed_ticket(&self, reporter: &str, handler: &str) -> Ticket {
        let ticket = self.create_ticket(reporter, "assigned work");
        self.engine
            .assume(&ticket.id, &Actor::handler(handler))
            .expect("Failed to assume ticket")
    }

    /// Everything published so far
    pub fn drain_events(&mut self) -> Vec<TransitionEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

/// Valid draft with the given description
pub fn draft(description: &str) -> NewTicket {
    NewTicket::new(
        description,
        Location::new("Building A").with_floor("2"),
        Priority::Regular,
    )
}
