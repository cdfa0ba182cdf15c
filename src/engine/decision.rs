//! Pure decision rules for a run
//! Following functional programming principles with no side effects

use super::RunOptions;

/// Whether the item at 1-based `index` should be processed.
///
/// A known failure is always re-attempted when error re-run is requested,
/// even inside the range a previous run already covered.
pub fn should_process(index: usize, processed: usize, in_error: bool, options: &RunOptions) -> bool {
    if options.rerun_errors && in_error {
        return true;
    }
    if options.continue_run && index <= processed {
        return false;
    }
    true
}

/// Whether the state describes a finished run.
///
/// When both continuation and error re-run are requested, outstanding
/// errors keep the run unfinished so they get another attempt.
pub fn is_finished(processed: usize, items_len: usize, errored: usize, options: &RunOptions) -> bool {
    if processed != items_len {
        return false;
    }
    !(options.continue_run && options.rerun_errors && errored > 0)
}

/// Outcome of comparing persisted counters with the live item collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Consistent,
    /// The collection grew or shrank since the checkpoint was taken
    LengthChanged { recorded: usize, live: usize },
    /// `processed` points past the recorded item count
    ProcessedOutOfRange { processed: usize, items_len: usize },
}

impl Reconciliation {
    pub fn requires_restart(&self) -> bool {
        !matches!(self, Self::Consistent)
    }
}

pub fn reconcile(processed: usize, items_len: usize, live_len: usize) -> Reconciliation {
    if items_len != live_len {
        Reconciliation::LengthChanged {
            recorded: items_len,
            live: live_len,
        }
    } else if processed > items_len {
        Reconciliation::ProcessedOutOfRange {
            processed,
            items_len,
        }
    } else {
        Reconciliation::Consistent
    }
}

/// Share of `count` in `total` as a percentage; 0 for an empty run
pub fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}
