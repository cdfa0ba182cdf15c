//! Resumable sequential execution
//!
//! The [`Engine`] walks a task's items in order and decides, item by item,
//! whether to process or skip. It records failures in an
//! [`ErrorLedger`], and persists a [`Checkpoint`] once at the end of every
//! run, including runs ended early by a stop request.
//!
//! # Resume rules
//!
//! - `continue_run`: items at indices `1..=processed` from the checkpoint are
//!   skipped. A checkpoint that is already finished is not continued; the
//!   run starts a fresh pass instead.
//! - `rerun_errors`: items recorded as failed are processed again whatever
//!   their index. The loaded ledger is cleared up front, so only failures
//!   that happen again end up in the next checkpoint.
//! - `processed` tracks the highest attempted index; a failed attempt
//!   counts as processed.

pub mod decision;
mod state;
mod summary;
mod unwind;

pub use summary::RunSummary;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::{ErrorCode, LongtaskError, Result};
use crate::ledger::{ErrorLedger, ItemFailure, ProcessError};
use crate::progress::ProgressReporter;
use crate::signal::StopSignal;
use crate::task::Task;
use state::RunState;
use std::collections::HashSet;
use std::io::{self, Write};
use tracing::{debug, info, trace, warn};

/// Switches for one engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Resume from the saved checkpoint
    pub continue_run: bool,
    /// Force previously failed items to run again
    pub rerun_errors: bool,
    /// Print each failure as it happens
    pub verbose: bool,
    /// No progress bar, no output
    pub quiet: bool,
}

/// Runs a [`Task`] against a [`CheckpointStore`].
pub struct Engine<T: Task, S> {
    task: T,
    store: S,
    options: RunOptions,
    state: RunState<T::Id>,
    stop: StopSignal,
    output: Box<dyn Write + Send>,
}

impl<T, S> Engine<T, S>
where
    T: Task,
    S: CheckpointStore<T::Id>,
{
    /// Build an engine, loading the checkpoint when continuing.
    ///
    /// Fails only if the task cannot enumerate its items.
    pub fn new(task: T, store: S, options: RunOptions) -> Result<Self> {
        let live_len = enumerate(&task)?.len();

        let checkpoint = if options.continue_run {
            let checkpoint = store.load();
            if !checkpoint.is_empty() {
                info!(
                    task = task.name(),
                    processed = checkpoint.processed,
                    items_len = ?checkpoint.items_len,
                    errors = checkpoint.errors.len(),
                    "Resuming from checkpoint"
                );
            }
            checkpoint
        } else {
            Checkpoint::default()
        };
        let state = RunState::from_checkpoint(checkpoint, live_len, options.rerun_errors);

        let output: Box<dyn Write + Send> = if options.quiet {
            Box::new(io::sink())
        } else {
            Box::new(io::stdout())
        };

        Ok(Self {
            task,
            store,
            options,
            state,
            stop: StopSignal::new(),
            output,
        })
    }

    /// Send failure reports and the summary somewhere other than stdout
    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Share a stop flag with a signal handler or another thread
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn processed(&self) -> usize {
        self.state.processed
    }

    pub fn items_len(&self) -> usize {
        self.state.items_len
    }

    pub fn errored_items(&self) -> &HashSet<T::Id> {
        &self.state.errored_items
    }

    pub fn errors(&self) -> &ErrorLedger<T::Id> {
        &self.state.errors
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn task_mut(&mut self) -> &mut T {
        &mut self.task
    }

    pub fn into_parts(self) -> (T, S) {
        (self.task, self.store)
    }

    /// The state that would be saved right now
    pub fn snapshot(&self) -> Checkpoint<T::Id> {
        self.state.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        decision::is_finished(
            self.state.processed,
            self.state.items_len,
            self.state.errored_items.len(),
            &self.options,
        )
    }

    /// Decide whether the item at 1-based `index` gets processed
    pub fn should_process_item(&self, index: usize, item: &T::Item) -> bool {
        let in_error = self.options.rerun_errors
            && self
                .state
                .errored_items
                .contains(&self.task.item_id(item));
        decision::should_process(index, self.state.processed, in_error, &self.options)
    }

    /// Visit every item once, then save the checkpoint and report.
    ///
    /// Item failures are recorded and never end the run. A stop request
    /// ends it at the current item boundary; the item being processed when
    /// the stop arrived is not counted, and state is saved as usual.
    pub fn run(&mut self) -> Result<RunSummary> {
        let items = enumerate(&self.task)?;
        self.state.reconcile(items.len());

        if self.options.continue_run && self.is_finished() {
            info!(
                task = self.task.name(),
                "Previous run already finished, starting a new pass"
            );
            self.state.reset(items.len());
        }

        let name = self.task.name().to_string();
        let progress = ProgressReporter::new(&name, self.state.items_len, !self.options.quiet);
        let mut summary = RunSummary::new(&name, self.state.items_len);
        info!(
            task = %name,
            items = items.len(),
            processed = self.state.processed,
            continue_run = self.options.continue_run,
            rerun_errors = self.options.rerun_errors,
            "Starting run"
        );

        for (offset, item) in items.iter().enumerate() {
            let index = offset + 1;

            if self.stop.is_requested() {
                info!(index, "Stop requested, ending run");
                summary.interrupted = true;
                break;
            }

            if !self.should_process_item(index, item) {
                trace!(index, "Skipping item covered by a previous run");
                summary.skipped += 1;
                progress.update(index, self.state.errored_items.len());
                continue;
            }

            let id = self.task.item_id(item);
            debug!(index, id = ?id, "Processing item");
            let failure = match self.attempt(item) {
                Err(ProcessError::Stop) => {
                    info!(index, "Processor requested stop, ending run");
                    summary.interrupted = true;
                    break;
                }
                _ if self.stop.is_requested() => {
                    info!(index, "Stop requested, discarding the current item");
                    summary.interrupted = true;
                    break;
                }
                Ok(()) => None,
                Err(ProcessError::Failed(failure)) => Some(failure),
            };

            summary.attempted += 1;
            match failure {
                None => {
                    if self.state.record_success(&id) {
                        debug!(index, id = ?id, "Previously failed item succeeded");
                    }
                    summary.succeeded += 1;
                }
                Some(failure) => {
                    self.report_failure(&progress, item, &failure);
                    self.state.record_failure(id, &failure);
                    summary.failed += 1;
                }
            }

            self.state.advance(index);
            progress.update(index, self.state.errored_items.len());
        }

        progress.finish();

        summary.processed = self.state.processed;
        summary.errored = self.state.errored_items.len();
        summary.groups = self.state.errors.groups();

        self.store.save(&self.state.snapshot())?;
        info!(
            task = %name,
            processed = summary.processed,
            attempted = summary.attempted,
            failed = summary.failed,
            interrupted = summary.interrupted,
            "Run finished, checkpoint saved"
        );

        if !self.options.quiet {
            if let Err(e) = write!(self.output, "{}", summary).and_then(|_| self.output.flush()) {
                warn!(error = %e, "Failed to write run summary");
            }
        }

        Ok(summary)
    }

    /// Invoke the processor, turning a panic into a recorded failure
    fn attempt(&mut self, item: &T::Item) -> std::result::Result<(), ProcessError> {
        let task = &mut self.task;
        match unwind::catch(|| task.process_item(item)) {
            Ok(result) => result,
            Err(failure) => Err(ProcessError::Failed(failure)),
        }
    }

    fn report_failure(&mut self, progress: &ProgressReporter, item: &T::Item, failure: &ItemFailure) {
        debug!(class = %failure.class(), message = failure.message(), "Item failed");
        if !self.options.verbose || self.options.quiet {
            return;
        }

        let description = self.task.describe_item(item);
        let output = &mut self.output;
        let written = progress.suspend(|| {
            writeln!(
                output,
                "\n\nERROR\n{}\n{}\n{}",
                description,
                failure,
                failure.traceback()
            )
        });
        if let Err(e) = written {
            warn!(error = %e, "Failed to write failure report");
        }
    }
}

fn enumerate<T: Task>(task: &T) -> Result<Vec<T::Item>> {
    task.items().map_err(|e| {
        LongtaskError::config_with_code(
            ErrorCode::CONFIG_ITEMS_UNAVAILABLE,
            format!("task '{}' could not enumerate its items", task.name()),
        )
        .with_source(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryStore;
    use crate::ledger::ErrorClass;
    use crate::task::FnTask;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn quiet() -> RunOptions {
        RunOptions {
            quiet: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_run_processes_everything() {
        let store = MemoryStore::new();
        let task = FnTask::new("clean", (1u32..=10).collect(), |_| Ok(()));
        let mut engine = Engine::new(task, store.clone(), quiet()).unwrap();

        let summary = engine.run().unwrap();

        assert_eq!(engine.processed(), engine.items_len());
        assert!(engine.errored_items().is_empty());
        assert_eq!(summary.succeeded, 10);
        assert!(summary.is_clean());
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn test_stop_on_first_item_keeps_state() {
        let store = MemoryStore::new();
        let task = FnTask::new("stop", (1u32..=10).collect(), |_| Err(ProcessError::Stop));
        let mut engine = Engine::new(task, store.clone(), quiet()).unwrap();

        let summary = engine.run().unwrap();

        assert_eq!(engine.processed(), 0);
        assert!(engine.errors().is_empty());
        assert!(summary.interrupted);
        assert_eq!(summary.attempted, 0);
        assert_eq!(store.saves(), 1);
    }

    #[test]
    fn test_stop_signal_discards_current_item() {
        let stop = StopSignal::new();
        let trigger = stop.clone();
        let task = FnTask::new("signal", (1u32..=5).collect(), move |item: &u32| {
            if *item == 3 {
                trigger.request();
            }
            Ok(())
        });
        let mut engine = Engine::new(task, MemoryStore::new(), quiet())
            .unwrap()
            .with_stop_signal(stop);

        let summary = engine.run().unwrap();

        assert_eq!(engine.processed(), 2);
        assert_eq!(summary.succeeded, 2);
        assert!(summary.interrupted);
    }

    #[test]
    fn test_panics_are_recorded_as_failures() {
        let task = FnTask::new("panic", vec![1u32, 2, 3], |item: &u32| {
            if *item == 2 {
                panic!("cannot handle two");
            }
            Ok(())
        });
        let mut engine = Engine::new(task, MemoryStore::new(), quiet()).unwrap();

        let summary = engine.run().unwrap();

        assert_eq!(engine.processed(), 3);
        assert_eq!(summary.failed, 1);
        assert!(engine.errors().class(ErrorClass::Panic).is_some());
        assert!(engine.errored_items().contains(&2));
    }

    #[test]
    fn test_panics_group_by_site() {
        let out = SharedBuf::default();
        let task = FnTask::new("panic sites", vec![1u32, 2, 3], |item: &u32| {
            if *item == 1 {
                panic!("first site");
            }
            panic!("second site");
        });
        let mut engine = Engine::new(task, MemoryStore::new(), quiet())
            .unwrap()
            .with_output(out.clone());

        let summary = engine.run().unwrap();

        assert_eq!(summary.failed, 3);
        let groups = engine.errors().class(ErrorClass::Panic).unwrap();
        assert_eq!(groups.len(), 2);
        let counts: Vec<usize> = groups.values().map(|ids| ids.len()).collect();
        assert!(counts.contains(&1) && counts.contains(&2));
        for traceback in groups.keys() {
            assert!(traceback.starts_with("Panic at "));
            assert!(traceback.contains("mod.rs:"));
        }
        assert!(out.text().is_empty());
    }

    #[test]
    fn test_verbose_prints_failures_and_summary() {
        let out = SharedBuf::default();
        let task = FnTask::new("verbose", vec![1u32, 2], |item: &u32| {
            if *item == 2 {
                return Err(ProcessError::failed(ErrorClass::Validation, "two is odd"));
            }
            Ok(())
        });
        let options = RunOptions {
            verbose: true,
            ..Default::default()
        };
        let mut engine = Engine::new(task, MemoryStore::new(), options)
            .unwrap()
            .with_output(out.clone());

        engine.run().unwrap();

        let text = out.text();
        assert!(text.contains("ERROR\n2\nValidation: two is odd"));
        assert!(text.contains(" - errors: 1 (50.0%)"));
        assert!(text.contains(" - Validation x1"));
    }

    #[test]
    fn test_quiet_writes_nothing() {
        let out = SharedBuf::default();
        let task = FnTask::new("quiet", vec![1u32], |_| {
            Err(ProcessError::failed(ErrorClass::Other, "nope"))
        });
        let options = RunOptions {
            quiet: true,
            verbose: true,
            ..Default::default()
        };
        let mut engine = Engine::new(task, MemoryStore::new(), options)
            .unwrap()
            .with_output(out.clone());

        engine.run().unwrap();

        assert!(out.text().is_empty());
    }

    #[test]
    fn test_enumeration_failure_is_config_error() {
        struct Broken;

        impl Task for Broken {
            type Item = u32;
            type Id = u32;

            fn name(&self) -> &str {
                "broken"
            }

            fn items(&self) -> anyhow::Result<Vec<u32>> {
                anyhow::bail!("no item source configured")
            }

            fn item_id(&self, item: &u32) -> u32 {
                *item
            }

            fn process_item(&mut self, _item: &u32) -> std::result::Result<(), ProcessError> {
                Ok(())
            }
        }

        let err = Engine::new(Broken, MemoryStore::new(), quiet())
            .err()
            .expect("construction should fail");
        assert_eq!(err.code(), ErrorCode::CONFIG_ITEMS_UNAVAILABLE);
    }

    #[test]
    fn test_checkpoint_not_loaded_without_continue() {
        let mut cp: Checkpoint<u32> = Checkpoint {
            processed: 3,
            items_len: Some(5),
            ..Default::default()
        };
        cp.errors.record_raw(1, ErrorClass::Other, "site");
        let store = MemoryStore::with_checkpoint(&cp).unwrap();

        let task = FnTask::new("fresh", (1u32..=5).collect(), |_| Ok(()));
        let engine = Engine::new(task, store, quiet()).unwrap();

        assert_eq!(engine.processed(), 0);
        assert!(engine.errored_items().is_empty());
    }
}
