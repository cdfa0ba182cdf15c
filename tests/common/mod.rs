//! Common test utilities and helpers

#![allow(dead_code)]

use longtask::{
    Checkpoint, CheckpointStore, Engine, ErrorClass, FileStore, FnTask, ProcessError, RunOptions,
    RunSummary,
};
use std::collections::HashSet;
use tempfile::TempDir;

pub const TASK_NAME: &str = "Number Crunch";

/// A checkpoint directory that lives for the duration of a test
pub struct TestContext {
    pub temp_dir: TempDir,
}

impl TestContext {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    pub fn store(&self) -> FileStore {
        FileStore::new(self.temp_dir.path(), TASK_NAME)
    }

    /// Read back what the last run saved
    pub fn checkpoint(&self) -> Checkpoint<u32> {
        self.store().load()
    }

    /// Run items `1..=count`, failing every item listed in `failing`
    pub fn run(&self, count: u32, failing: &[u32], options: RunOptions) -> RunSummary {
        let task = failing_task(count, failing);
        let mut engine = Engine::new(task, self.store(), options).unwrap();
        engine.run().unwrap()
    }
}

pub fn failing_task(
    count: u32,
    failing: &[u32],
) -> FnTask<u32, u32, impl FnMut(&u32) -> Result<(), ProcessError>> {
    let failing: HashSet<u32> = failing.iter().copied().collect();
    FnTask::new(TASK_NAME, (1..=count).collect(), move |item: &u32| {
        if failing.contains(item) {
            return Err(ProcessError::failed(
                ErrorClass::Validation,
                format!("item {} rejected", item),
            ));
        }
        Ok(())
    })
}

pub fn options(continue_run: bool, rerun_errors: bool) -> RunOptions {
    RunOptions {
        continue_run,
        rerun_errors,
        quiet: true,
        ..Default::default()
    }
}
