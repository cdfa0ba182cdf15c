//! End-of-run report

use super::decision::percent;
use crate::ledger::FailureGroup;
use serde::Serialize;
use std::fmt;

/// What one call to [`Engine::run`](super::Engine::run) did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub task: String,
    /// Item count the run was measured against
    pub items_len: usize,
    /// Highest attempted index after the run, across runs
    pub processed: usize,
    /// Items whose processor was invoked and completed or failed this run
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items skipped because a previous run already covered them
    pub skipped: usize,
    /// Identities still recorded as failed after the run
    pub errored: usize,
    /// The run ended early on a stop request
    pub interrupted: bool,
    /// Recorded failure groups, with counts
    pub groups: Vec<FailureGroup>,
}

impl RunSummary {
    pub fn new(task: impl Into<String>, items_len: usize) -> Self {
        Self {
            task: task.into(),
            items_len,
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errored == 0 && !self.interrupted
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.items_len;
        writeln!(f, "\n\n{} stats:", self.task)?;
        writeln!(
            f,
            " - processed: {}/{} ({:.1}%)",
            self.processed,
            total,
            percent(self.processed, total)
        )?;
        writeln!(f, " - attempted: {}", self.attempted)?;
        writeln!(f, " - skipped: {}", self.skipped)?;
        writeln!(
            f,
            " - successes: {} ({:.1}%)",
            self.succeeded,
            percent(self.succeeded, total)
        )?;
        writeln!(
            f,
            " - errors: {} ({:.1}%)",
            self.failed,
            percent(self.failed, total)
        )?;
        if self.errored != self.failed {
            writeln!(f, " - outstanding errors: {}", self.errored)?;
        }
        if self.interrupted {
            writeln!(f, " - interrupted: progress saved, resume with --continue")?;
        }

        if !self.groups.is_empty() {
            writeln!(f, "\nFailures:")?;
            for group in &self.groups {
                writeln!(f, " - {} x{}", group.class, group.count)?;
                for line in group.traceback.lines() {
                    writeln!(f, "     {}", line)?;
                }
            }
        }
        Ok(())
    }
}
