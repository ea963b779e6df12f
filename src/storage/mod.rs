//! Durable ticket snapshots with optimistic concurrency
//!
//! Two backends implement [`TicketStore`]: [`MemoryStore`] for tests and
//! ephemeral deployments, [`FileStore`] for a single-node durable setup.

mod file;
mod memory;
mod repository;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use repository::{StoredEntry, TicketStore, UnreadableSnapshot};

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{FixhubError, Result};
use std::sync::{Arc, PoisonError};

/// Open the backend selected in the configuration
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn TicketStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::File => Ok(Arc::new(FileStore::open(&config.path)?)),
    }
}

pub(crate) fn poisoned<T>(_: PoisonError<T>) -> FixhubError {
    FixhubError::Unavailable("ticket store lock poisoned".to_string())
}
