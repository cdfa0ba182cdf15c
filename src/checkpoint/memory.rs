//! In-memory checkpoint storage

use super::{Checkpoint, CheckpointStore};
use crate::error::Result;
use crate::task::ItemId;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

#[derive(Debug, Default)]
struct Slot {
    value: Option<Value>,
    saves: usize,
}

/// Keeps the serialized checkpoint in memory.
///
/// Clones share the same slot, so a handle kept outside the engine sees
/// what the engine saved. The value goes through the same serde shape as
/// the file store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Slot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `checkpoint`
    pub fn with_checkpoint<Id: ItemId>(checkpoint: &Checkpoint<Id>) -> Result<Self> {
        let store = Self::new();
        store.lock().value = Some(serde_json::to_value(checkpoint)?);
        Ok(store)
    }

    /// Create a store holding raw JSON, e.g. a partial or legacy checkpoint
    pub fn with_value(value: Value) -> Self {
        let store = Self::new();
        store.lock().value = Some(value);
        store
    }

    /// Number of completed saves
    pub fn saves(&self) -> usize {
        self.lock().saves
    }

    /// The stored JSON, if anything was saved
    pub fn value(&self) -> Option<Value> {
        self.lock().value.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<Id: ItemId> CheckpointStore<Id> for MemoryStore {
    fn load(&self) -> Checkpoint<Id> {
        let Some(value) = self.value() else {
            return Checkpoint::default();
        };
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "Stored checkpoint unreadable, starting from empty state");
            Checkpoint::default()
        })
    }

    fn save(&self, checkpoint: &Checkpoint<Id>) -> Result<()> {
        let value = serde_json::to_value(checkpoint)?;
        let mut slot = self.lock();
        slot.value = Some(value);
        slot.saves += 1;
        Ok(())
    }
}
