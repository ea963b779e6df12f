use super::repository::{TicketStore, apply_commit, prepare_create};
use super::poisoned;
use crate::core::{Ticket, TicketId};
use crate::error::{FixhubError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

type Slot = Arc<Mutex<Ticket>>;

/// In-process ticket store
///
/// The outer map lock is held only to find or insert a slot; commits then
/// lock the individual ticket.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tickets: RwLock<HashMap<TicketId, Slot>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: &TicketId) -> Result<Slot> {
        self.tickets
            .read()
            .map_err(poisoned)?
            .get(id)
            .cloned()
            .ok_or_else(|| FixhubError::not_found(id))
    }
}

impl TicketStore for MemoryStore {
    fn get(&self, id: &TicketId) -> Result<Ticket> {
        let slot = self.slot(id)?;
        let ticket = slot.lock().map_err(poisoned)?;
        Ok(ticket.clone())
    }

    fn create(&self, ticket: Ticket) -> Result<Ticket> {
        let ticket = prepare_create(ticket)?;
        let mut tickets = self.tickets.write().map_err(poisoned)?;
        if tickets.contains_key(&ticket.id) {
            return Err(FixhubError::DuplicateTicket {
                id: ticket.id.to_string(),
            });
        }
        tickets.insert(ticket.id.clone(), Arc::new(Mutex::new(ticket.clone())));
        Ok(ticket)
    }

    fn commit(
        &self,
        id: &TicketId,
        expected_version: u64,
        mutator: &mut dyn FnMut(&Ticket) -> Result<Ticket>,
    ) -> Result<Ticket> {
        let slot = self.slot(id)?;
        let mut stored = slot.lock().map_err(poisoned)?;
        let next = apply_commit(&stored, expected_version, mutator)?;
        *stored = next.clone();
        Ok(next)
    }

    fn scan(&self, predicate: &dyn Fn(&Ticket) -> bool) -> Result<Vec<Ticket>> {
        let slots: Vec<Slot> = self
            .tickets
            .read()
            .map_err(poisoned)?
            .values()
            .cloned()
            .collect();

        let mut found = Vec::new();
        for slot in slots {
            let ticket = slot.lock().map_err(poisoned)?;
            if predicate(&ticket) {
                found.push(ticket.clone());
            }
        }
        Ok(found)
    }
}
