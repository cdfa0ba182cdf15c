//! Checkpoint persistence
//!
//! This module provides the resume state written at the end of every run
//! and the storage layer behind it:
//! - [`Checkpoint`]: processed count, item count and the error ledger
//! - [`CheckpointStore`]: load/save contract; `load` never fails
//! - [`FileStore`]: one file per task, JSON or gzip-compressed JSON
//! - [`MemoryStore`]: shared in-memory store for tests and embedding

mod file;
mod memory;

pub use file::{CheckpointFormat, FileStore};
pub use memory::MemoryStore;

use crate::error::Result;
use crate::ledger::ErrorLedger;
use serde::{Deserialize, Serialize};

/// Persisted resume state.
///
/// Every field is optional on load: a missing `processed` means 0, a
/// missing `items_len` means "use the live item count", missing `errors`
/// means no recorded failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "Id: Serialize",
    deserialize = "Id: Deserialize<'de> + Ord"
))]
pub struct Checkpoint<Id> {
    #[serde(default)]
    pub processed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_len: Option<usize>,
    #[serde(default)]
    pub errors: ErrorLedger<Id>,
}

impl<Id> Default for Checkpoint<Id> {
    fn default() -> Self {
        Self {
            processed: 0,
            items_len: None,
            errors: ErrorLedger::default(),
        }
    }
}

impl<Id> Checkpoint<Id> {
    /// Whether this is the empty state a missing checkpoint loads as
    pub fn is_empty(&self) -> bool {
        self.processed == 0 && self.items_len.is_none() && self.errors.is_empty()
    }
}

/// Load/save contract for resume state.
pub trait CheckpointStore<Id> {
    /// Load the last saved state.
    ///
    /// A missing or unreadable checkpoint is "no prior state" and yields
    /// [`Checkpoint::default`]; it is never reported as an error.
    fn load(&self) -> Checkpoint<Id>;

    /// Persist the full state, replacing whatever was saved before
    fn save(&self, checkpoint: &Checkpoint<Id>) -> Result<()>;
}

impl<Id, S: CheckpointStore<Id> + ?Sized> CheckpointStore<Id> for &S {
    fn load(&self) -> Checkpoint<Id> {
        (**self).load()
    }

    fn save(&self, checkpoint: &Checkpoint<Id>) -> Result<()> {
        (**self).save(checkpoint)
    }
}

impl<Id, S: CheckpointStore<Id> + ?Sized> CheckpointStore<Id> for Box<S> {
    fn load(&self) -> Checkpoint<Id> {
        (**self).load()
    }

    fn save(&self, checkpoint: &Checkpoint<Id>) -> Result<()> {
        (**self).save(checkpoint)
    }
}

/// Checkpoint file name for a task: `.<name>.task`, lowercased, spaces as `_`
pub fn checkpoint_file_name(task_name: &str) -> String {
    format!(".{}.task", task_name.to_lowercase().replace(' ', "_"))
}
