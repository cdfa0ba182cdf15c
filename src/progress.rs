//! Terminal progress for a run: position, error count and error rate.

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str =
    "{prefix}: {percent:>3}% ({pos}/{len}) {msg} [{wide_bar:.cyan/blue}] {elapsed_precise} ETA {eta}";

/// Render the error widgets: `errors: <pct>% (<n>/<len>)`
pub fn errors_message(errored: usize, len: usize) -> String {
    let percent = if len == 0 { 0 } else { 100 * errored / len };
    format!("errors: {:>3}% ({}/{})", percent, errored, len)
}

/// Progress bar for one run.
///
/// Hidden in quiet mode. Writes to stderr so it never mixes with the
/// run's own output sink.
pub struct ProgressReporter {
    bar: ProgressBar,
    len: usize,
}

impl ProgressReporter {
    pub fn new(task_name: &str, len: usize, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(len as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_length(len as u64);
        bar.set_style(
            ProgressStyle::with_template(TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_prefix(task_name.to_string());
        bar.set_message(errors_message(0, len));

        Self { bar, len }
    }

    /// Move to `index` (1-based) and refresh the error widgets
    pub fn update(&self, index: usize, errored: usize) {
        self.bar.set_position(index as u64);
        self.bar.set_message(errors_message(errored, self.len));
    }

    /// Run `f` with the bar cleared, for output that must not tear it
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn finish(&self) {
        self.bar.finish();
    }
}
