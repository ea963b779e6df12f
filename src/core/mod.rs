//! Ticket domain model and the pure workflow state machine

mod builders;
mod draft;
mod ticket;
pub mod transition;

pub use builders::TicketBuilder;
pub use draft::{MAX_TEXT_LEN, NewTicket, TicketPatch};
pub use ticket::{Actor, ActorId, Location, Priority, Resolution, Role, Status, Ticket, TicketId};
pub use transition::{Action, Operation, Transition, TransitionEvent};
