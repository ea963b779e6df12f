use super::poisoned;
use super::repository::{StoredEntry, TicketStore, UnreadableSnapshot, apply_commit, prepare_create};
use crate::core::{Ticket, TicketId};
use crate::error::{FixhubError, Result};
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// File-backed ticket store
///
/// Each ticket lives in `<root>/tickets/<id>.yaml`. Writes go to a hidden
/// temporary file that is renamed over the previous snapshot, so readers
/// only ever see complete documents. Commits on one ticket are serialized by
/// an in-process lock keyed by ticket id; a single process owns the
/// directory. Lock entries are dropped again once no caller holds them.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    locks: Mutex<HashMap<TicketId, Arc<Mutex<()>>>>,
}

impl FileStore {
    /// Create a store rooted at `root` without touching the filesystem
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a store and make sure its directories exist
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        store.ensure_directories()?;
        Ok(store)
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(self.tickets_dir())?;
        Ok(())
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tickets_dir(&self) -> PathBuf {
        self.root.join("tickets")
    }

    fn ticket_path(&self, id: &TicketId) -> PathBuf {
        self.tickets_dir().join(format!("{id}.yaml"))
    }

    /// Run `f` while holding the lock of ticket `id`
    fn with_ticket_lock<T>(&self, id: &TicketId, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock = {
            let mut locks = self.locks.lock().map_err(poisoned)?;
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        let result = match lock.lock() {
            Ok(_guard) => f(),
            Err(e) => Err(poisoned(e)),
        };
        self.release(id, lock);
        result
    }

    fn release(&self, id: &TicketId, lock: Arc<Mutex<()>>) {
        // Clones are only handed out under the map lock, so a count of one
        // after dropping ours means nobody else is waiting on this ticket.
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        drop(lock);
        if locks.get(id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(id);
        }
    }

    fn is_snapshot(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "yaml")
            && !path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with('.'))
    }

    fn read_path(path: &Path) -> Result<Ticket> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    fn read(&self, id: &TicketId) -> Result<Ticket> {
        match Self::read_path(&self.ticket_path(id)) {
            Err(FixhubError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                Err(FixhubError::not_found(id))
            },
            other => other,
        }
    }

    fn write(&self, ticket: &Ticket) -> Result<()> {
        let target = self.ticket_path(&ticket.id);
        let tmp = self.tickets_dir().join(format!(".{}.yaml.tmp", ticket.id));
        let content = serde_yaml::to_string(ticket)?;

        let mut file = fs::File::create(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &target)?;
        Ok(())
    }
}

impl TicketStore for FileStore {
    fn get(&self, id: &TicketId) -> Result<Ticket> {
        self.read(id)
    }

    fn create(&self, ticket: Ticket) -> Result<Ticket> {
        let ticket = prepare_create(ticket)?;
        self.with_ticket_lock(&ticket.id.clone(), || {
            if self.ticket_path(&ticket.id).exists() {
                return Err(FixhubError::DuplicateTicket {
                    id: ticket.id.to_string(),
                });
            }
            self.write(&ticket)?;
            Ok(ticket)
        })
    }

    fn commit(
        &self,
        id: &TicketId,
        expected_version: u64,
        mutator: &mut dyn FnMut(&Ticket) -> Result<Ticket>,
    ) -> Result<Ticket> {
        self.with_ticket_lock(id, || {
            let current = self.read(id)?;
            let next = apply_commit(&current, expected_version, mutator)?;
            self.write(&next)?;
            Ok(next)
        })
    }

    /// Matching tickets; snapshots that cannot be parsed are logged and
    /// skipped so one damaged file does not hide every other ticket
    fn scan(&self, predicate: &dyn Fn(&Ticket) -> bool) -> Result<Vec<Ticket>> {
        let mut found = Vec::new();
        for entry in self.entries()? {
            match entry {
                Ok(ticket) if predicate(&ticket) => found.push(ticket),
                Ok(_) => {},
                Err(damaged) => warn!(
                    location = %damaged.location,
                    problem = %damaged.problem,
                    "skipping unreadable ticket snapshot"
                ),
            }
        }
        Ok(found)
    }

    fn entries(&self) -> Result<Vec<StoredEntry>> {
        let dir = self.tickets_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if !Self::is_snapshot(&path) {
                continue;
            }

            match Self::read_path(&path) {
                Ok(ticket) => entries.push(Ok(ticket)),
                // Deleted between listing and reading
                Err(FixhubError::Io(e)) if e.kind() == ErrorKind::NotFound => {},
                Err(e) => entries.push(Err(UnreadableSnapshot {
                    location: path.display().to_string(),
                    ticket_id: path
                        .file_stem()
                        .and_then(|stem| stem.to_str())
                        .map(str::to_string),
                    problem: e.to_string(),
                })),
            }
        }
        Ok(entries)
    }
}
