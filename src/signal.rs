//! Operator stop requests.
//!
//! A [`StopSignal`] is a shared flag. The engine checks it before each item
//! and after each attempt; once set, the run ends at that item boundary and
//! goes through the normal save-and-report path.

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the run to stop at the next item boundary
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Route SIGINT and SIGTERM to this flag.
    ///
    /// The first signal sets the flag. A second one while the flag is still
    /// set exits immediately with the conventional `128 + signal` status.
    pub fn install_handlers(&self) -> io::Result<()> {
        for signal in [SIGINT, SIGTERM] {
            flag::register_conditional_shutdown(signal, 128 + signal, Arc::clone(&self.flag))?;
            flag::register(signal, Arc::clone(&self.flag))?;
        }
        debug!("Interrupt handlers installed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let signal = StopSignal::new();
        let handle = signal.clone();
        assert!(!signal.is_requested());
        handle.request();
        assert!(signal.is_requested());
    }
}
