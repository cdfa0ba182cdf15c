//! CLI argument structures
//!
//! Every task binary gets the same four switches. [`TaskArgs`] can also be
//! flattened into a larger clap parser.

use crate::engine::RunOptions;
use clap::{Args, Parser};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Args)]
pub struct TaskArgs {
    /// Quiet mode: no progress bar, no summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Continue the previous run from its checkpoint
    #[arg(short = 'c', long = "continue")]
    pub continue_run: bool,

    /// Print every failure with its traceback as it happens
    #[arg(short, long)]
    pub verbose: bool,

    /// Re-run items that failed in the previous run
    #[arg(short = 'e', long = "errors")]
    pub rerun_errors: bool,
}

impl From<TaskArgs> for RunOptions {
    fn from(args: TaskArgs) -> Self {
        Self {
            continue_run: args.continue_run,
            rerun_errors: args.rerun_errors,
            verbose: args.verbose,
            quiet: args.quiet,
        }
    }
}

/// Standalone parser used by [`run_cli`](super::run_cli)
#[derive(Debug, Parser)]
#[command(about = "Task runner", long_about = None)]
pub struct TaskCli {
    #[command(flatten)]
    pub args: TaskArgs,
}
