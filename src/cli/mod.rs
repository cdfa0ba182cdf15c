//! Command-line entry point for task binaries
//!
//! A task binary's `main` hands its task to [`run_cli`], which parses the
//! standard switches, sets up logging and interrupt handling, and runs the
//! engine against the task's checkpoint file.

pub mod args;

pub use args::{TaskArgs, TaskCli};

use crate::config::RunnerConfig;
use crate::engine::{Engine, RunSummary};
use crate::error::LongtaskError;
use crate::signal::StopSignal;
use crate::task::Task;
use anyhow::Context;
use clap::{CommandFactory, FromArgMatches};
use std::ffi::OsString;
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

/// Pick the log level: config value first, then the switches
pub fn log_level<'a>(args: &TaskArgs, config_level: Option<&'a str>) -> &'a str {
    if let Some(level) = config_level {
        return level;
    }
    if args.verbose {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    }
}

/// Initialise the global tracing subscriber on stderr.
///
/// `RUST_LOG` wins over everything else. Does nothing if a subscriber is
/// already installed.
pub fn init_tracing(args: &TaskArgs, config_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(args, config_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(args.verbose)
        .try_init();
}

/// Parse the standard switches for a task named `task_name`.
///
/// Exits the process on `--help` or a parse error, like any clap binary.
pub fn parse_args<I, A>(task_name: &str, args: I) -> TaskArgs
where
    I: IntoIterator<Item = A>,
    A: Into<OsString> + Clone,
{
    let matches = TaskCli::command()
        .about(format!("{} task runner.", task_name))
        .get_matches_from(args);
    match TaskCli::from_arg_matches(&matches) {
        Ok(cli) => cli.args,
        Err(e) => e.exit(),
    }
}

/// Run `task` with arguments from the process command line
pub fn run_cli<T: Task>(task: T) -> anyhow::Result<RunSummary> {
    run_cli_from(task, std::env::args_os())
}

/// Run `task` with explicit command-line arguments
pub fn run_cli_from<T, I, A>(task: T, args: I) -> anyhow::Result<RunSummary>
where
    T: Task,
    I: IntoIterator<Item = A>,
    A: Into<OsString> + Clone,
{
    let args = parse_args(task.name(), args);
    let config = RunnerConfig::load()?;
    init_tracing(&args, config.log_level.as_deref());

    debug!(task = task.name(), ?args, "longtask started");
    trace!(?config, "Runner configuration");

    let stop = StopSignal::new();
    stop.install_handlers()
        .context("Failed to install interrupt handlers")?;

    let store = config.store_for(task.name());
    debug!(path = %store.path().display(), "Using checkpoint file");

    let mut engine = Engine::new(task, store, args.into())?.with_stop_signal(stop);
    let summary = engine.run()?;
    Ok(summary)
}

/// Process exit code for an error returned by [`run_cli`]
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<LongtaskError>()
        .map(LongtaskError::exit_code)
        .unwrap_or(1)
}
