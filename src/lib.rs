//! # longtask
//!
//! Run long, failure-prone batch jobs that can be interrupted and resumed.
//!
//! A [`Task`] enumerates its items and processes them one at a time. The
//! [`Engine`] tracks progress in a checkpoint, groups failures in an
//! [`ErrorLedger`] by error class and origin, and can later continue where a
//! run stopped or retry only the items that failed.
//!
//! ## Usage
//!
//! ```bash
//! my-task           # fresh run
//! my-task -c        # continue from the checkpoint
//! my-task -c -e     # continue and retry previous failures
//! ```
//!
//! ## Modules
//!
//! - `checkpoint` - Persisted resume state and its storage backends
//! - `cli` - Standard switches, logging setup and the binary entry point
//! - `config` - Runner configuration from `longtask.toml` and the environment
//! - `engine` - The sequential execution loop and its decision functions
//! - `error` - Crate error type with stable error codes
//! - `ledger` - Failure classification and grouping
//! - `progress` - Progress bar with a running error rate
//! - `signal` - Cooperative stop on SIGINT/SIGTERM
//! - `task` - The trait user tasks implement
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod progress;
pub mod signal;
pub mod task;

pub use checkpoint::{Checkpoint, CheckpointFormat, CheckpointStore, FileStore, MemoryStore};
pub use cli::{exit_code, run_cli, run_cli_from, TaskArgs};
pub use config::RunnerConfig;
pub use engine::{Engine, RunOptions, RunSummary};
pub use error::{LongtaskError, Result};
pub use ledger::{Classify, ErrorClass, ErrorLedger, FailureGroup, ItemFailure, ProcessError};
pub use signal::StopSignal;
pub use task::{FnTask, ItemId, Task};
