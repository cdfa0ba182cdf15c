//! The capability interface the engine drives: enumerate items, identify
//! them, process them.

use crate::ledger::ProcessError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::hash::Hash;

/// Bounds every item identity must satisfy.
///
/// Identities are hashed for membership tests, ordered so checkpoints are
/// written deterministically, and serialized into the checkpoint. They must
/// be stable across runs for resume to work.
pub trait ItemId: Clone + Eq + Hash + Ord + fmt::Debug + Serialize + DeserializeOwned {}

impl<T> ItemId for T where T: Clone + Eq + Hash + Ord + fmt::Debug + Serialize + DeserializeOwned {}

/// A unit of batch work.
///
/// `items` may be called more than once per run and must return the same
/// items in the same order each time, otherwise index-based resume cannot
/// line up with the checkpoint.
pub trait Task {
    type Item;
    type Id: ItemId;

    /// Task name; also keys the checkpoint file
    fn name(&self) -> &str;

    /// Enumerate the ordered, finite item collection
    fn items(&self) -> anyhow::Result<Vec<Self::Item>>;

    /// Stable identity used for all bookkeeping
    fn item_id(&self, item: &Self::Item) -> Self::Id;

    /// Human-readable label used in verbose failure output
    fn describe_item(&self, item: &Self::Item) -> String {
        format!("{:?}", self.item_id(item))
    }

    /// Do the work for one item
    fn process_item(&mut self, item: &Self::Item) -> Result<(), ProcessError>;
}

/// A [`Task`] assembled from a fixed item list and a closure.
///
/// The identity of an item defaults to the item itself; use
/// [`FnTask::with_id`] to key items by something else.
pub struct FnTask<I, Id, F> {
    name: String,
    items: Vec<I>,
    id_of: fn(&I) -> Id,
    process: F,
}

impl<I, F> FnTask<I, I, F>
where
    I: ItemId,
    F: FnMut(&I) -> Result<(), ProcessError>,
{
    pub fn new(name: impl Into<String>, items: Vec<I>, process: F) -> Self {
        Self {
            name: name.into(),
            items,
            id_of: I::clone,
            process,
        }
    }
}

impl<I, Id, F> FnTask<I, Id, F> {
    /// Key items by a derived identity instead of the item itself
    pub fn with_id<NewId: ItemId>(self, id_of: fn(&I) -> NewId) -> FnTask<I, NewId, F> {
        FnTask {
            name: self.name,
            items: self.items,
            id_of,
            process: self.process,
        }
    }
}

impl<I, Id, F> Task for FnTask<I, Id, F>
where
    I: Clone + fmt::Debug,
    Id: ItemId,
    F: FnMut(&I) -> Result<(), ProcessError>,
{
    type Item = I;
    type Id = Id;

    fn name(&self) -> &str {
        &self.name
    }

    fn items(&self) -> anyhow::Result<Vec<I>> {
        Ok(self.items.clone())
    }

    fn item_id(&self, item: &I) -> Id {
        (self.id_of)(item)
    }

    fn describe_item(&self, item: &I) -> String {
        format!("{:?}", item)
    }

    fn process_item(&mut self, item: &I) -> Result<(), ProcessError> {
        (self.process)(item)
    }
}
