//! Grouped record of item failures.
//!
//! Failures are grouped first by [`ErrorClass`] and then by traceback, so a
//! report can tell "same kind of error, different cause sites" apart. The
//! ledger is also what drives selective re-runs: every identity in it is a
//! candidate for `--errors`.

mod failure;

pub use failure::{Classify, ErrorClass, ItemFailure, ProcessError};

use crate::task::ItemId;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// One (class, traceback) group and how many identities it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureGroup {
    pub class: ErrorClass,
    pub traceback: String,
    pub count: usize,
}

/// `class -> traceback -> identities`, ordered so it serializes the same way
/// every time.
///
/// On load, class names are mapped through [`ErrorClass::from`]. Several
/// unknown names collapse into `Other`, so their groups are merged rather
/// than overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent, bound(serialize = "Id: Serialize"))]
pub struct ErrorLedger<Id> {
    groups: BTreeMap<ErrorClass, BTreeMap<String, BTreeSet<Id>>>,
}

impl<Id> Default for ErrorLedger<Id> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }
}

impl<'de, Id> Deserialize<'de> for ErrorLedger<Id>
where
    Id: Deserialize<'de> + Ord,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, BTreeMap<String, BTreeSet<Id>>>::deserialize(deserializer)?;

        let mut groups: BTreeMap<ErrorClass, BTreeMap<String, BTreeSet<Id>>> = BTreeMap::new();
        for (name, traces) in raw {
            let merged = groups.entry(ErrorClass::from(name.as_str())).or_default();
            for (traceback, ids) in traces {
                merged.entry(traceback).or_default().extend(ids);
            }
            merged.retain(|_, ids| !ids.is_empty());
        }
        groups.retain(|_, traces| !traces.is_empty());
        Ok(Self { groups })
    }
}

impl<Id> ErrorLedger<Id> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of recorded identities
    pub fn len(&self) -> usize {
        self.groups
            .values()
            .flat_map(|traces| traces.values())
            .map(BTreeSet::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

impl<Id: ItemId> ErrorLedger<Id> {
    /// Record a failure for `id`.
    ///
    /// An identity lives in at most one group, so any earlier entry for it
    /// is dropped first.
    pub fn record(&mut self, id: Id, failure: &ItemFailure) {
        self.record_raw(id, failure.class(), failure.traceback());
    }

    pub fn record_raw(&mut self, id: Id, class: ErrorClass, traceback: &str) {
        self.forgive(&id);
        self.groups
            .entry(class)
            .or_default()
            .entry(traceback.to_string())
            .or_default()
            .insert(id);
    }

    /// Remove `id` from every group, pruning groups left empty.
    ///
    /// Returns whether the identity was present.
    pub fn forgive(&mut self, id: &Id) -> bool {
        let mut removed = false;
        for traces in self.groups.values_mut() {
            for ids in traces.values_mut() {
                removed |= ids.remove(id);
            }
            traces.retain(|_, ids| !ids.is_empty());
        }
        self.groups.retain(|_, traces| !traces.is_empty());
        removed
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.groups
            .values()
            .flat_map(|traces| traces.values())
            .any(|ids| ids.contains(id))
    }

    /// Union of all identities across all groups
    pub fn identities(&self) -> HashSet<Id> {
        self.groups
            .values()
            .flat_map(|traces| traces.values())
            .flat_map(|ids| ids.iter().cloned())
            .collect()
    }

    /// Groups of one class, keyed by traceback
    pub fn class(&self, class: ErrorClass) -> Option<&BTreeMap<String, BTreeSet<Id>>> {
        self.groups.get(&class)
    }

    /// Every group with its identity count, in class then traceback order
    pub fn groups(&self) -> Vec<FailureGroup> {
        self.groups
            .iter()
            .flat_map(|(class, traces)| {
                traces.iter().map(move |(traceback, ids)| FailureGroup {
                    class: *class,
                    traceback: traceback.clone(),
                    count: ids.len(),
                })
            })
            .collect()
    }
}
