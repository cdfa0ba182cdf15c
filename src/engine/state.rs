//! Counters and ledger owned by one engine

use super::decision::{self, Reconciliation};
use crate::checkpoint::Checkpoint;
use crate::ledger::{ErrorLedger, ItemFailure};
use crate::task::ItemId;
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug)]
pub(crate) struct RunState<Id> {
    pub processed: usize,
    pub items_len: usize,
    pub errors: ErrorLedger<Id>,
    /// Identities known to have failed. Survives the ledger being cleared
    /// for an error re-run so the engine still knows what to force.
    pub errored_items: HashSet<Id>,
}

impl<Id: ItemId> RunState<Id> {
    pub fn empty(live_len: usize) -> Self {
        Self {
            processed: 0,
            items_len: live_len,
            errors: ErrorLedger::new(),
            errored_items: HashSet::new(),
        }
    }

    pub fn from_checkpoint(checkpoint: Checkpoint<Id>, live_len: usize, rerun_errors: bool) -> Self {
        let errored_items = checkpoint.errors.identities();
        let mut errors = checkpoint.errors;
        if rerun_errors {
            errors.clear();
        }

        let mut state = Self {
            processed: checkpoint.processed,
            items_len: checkpoint.items_len.unwrap_or(live_len),
            errors,
            errored_items,
        };
        state.reconcile(live_len);
        state
    }

    /// Line the counters up with the live item count.
    ///
    /// Index-based progress is meaningless once the collection changed
    /// length, so `processed` restarts from zero. The ledger is keyed by
    /// identity and is kept.
    pub fn reconcile(&mut self, live_len: usize) -> bool {
        let outcome = decision::reconcile(self.processed, self.items_len, live_len);
        if !outcome.requires_restart() {
            return false;
        }
        match outcome {
            Reconciliation::Consistent => {}
            Reconciliation::LengthChanged { recorded, live } => warn!(
                recorded,
                live, "Item count changed since the checkpoint, restarting from the first item"
            ),
            Reconciliation::ProcessedOutOfRange {
                processed,
                items_len,
            } => warn!(
                processed,
                items_len, "Checkpoint processed count is out of range, restarting from the first item"
            ),
        }
        self.processed = 0;
        self.items_len = live_len;
        true
    }

    /// Forget everything and start a new pass over `live_len` items
    pub fn reset(&mut self, live_len: usize) {
        *self = Self::empty(live_len);
    }

    /// A success erases any earlier failure of the same identity
    pub fn record_success(&mut self, id: &Id) -> bool {
        let was_errored = self.errored_items.remove(id);
        self.errors.forgive(id) || was_errored
    }

    pub fn record_failure(&mut self, id: Id, failure: &ItemFailure) {
        self.errors.record(id.clone(), failure);
        self.errored_items.insert(id);
    }

    /// Attempted counts as processed, whatever the outcome
    pub fn advance(&mut self, index: usize) {
        debug_assert!(index <= self.items_len);
        if index > self.processed {
            self.processed = index;
        }
    }

    pub fn snapshot(&self) -> Checkpoint<Id> {
        Checkpoint {
            processed: self.processed,
            items_len: Some(self.items_len),
            errors: self.errors.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ErrorClass;

    fn failed_checkpoint() -> Checkpoint<u32> {
        let mut cp = Checkpoint {
            processed: 10,
            items_len: Some(10),
            ..Default::default()
        };
        cp.errors.record_raw(2, ErrorClass::Other, "site");
        cp.errors.record_raw(5, ErrorClass::Other, "site");
        cp
    }

    #[test]
    fn test_rerun_clears_ledger_but_remembers_identities() {
        let state = RunState::from_checkpoint(failed_checkpoint(), 10, true);
        assert!(state.errors.is_empty());
        assert_eq!(state.errored_items, HashSet::from([2, 5]));
        assert_eq!(state.processed, 10);
    }

    #[test]
    fn test_missing_items_len_uses_live_count() {
        let cp = Checkpoint {
            processed: 3,
            ..Default::default()
        };
        let state: RunState<u32> = RunState::from_checkpoint(cp, 8, false);
        assert_eq!(state.items_len, 8);
        assert_eq!(state.processed, 3);
    }

    #[test]
    fn test_length_change_restarts_but_keeps_ledger() {
        let state = RunState::from_checkpoint(failed_checkpoint(), 12, false);
        assert_eq!(state.processed, 0);
        assert_eq!(state.items_len, 12);
        assert_eq!(state.errors.len(), 2);
    }

    #[test]
    fn test_success_heals_ledger() {
        let mut state = RunState::from_checkpoint(failed_checkpoint(), 10, false);
        assert!(state.record_success(&2));
        assert!(!state.record_success(&3));
        assert!(!state.errored_items.contains(&2));
        assert!(!state.errors.contains(&2));
        assert!(state.errors.contains(&5));
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut state: RunState<u32> = RunState::empty(10);
        state.advance(4);
        state.advance(2);
        assert_eq!(state.processed, 4);
    }
}
