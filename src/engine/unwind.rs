//! Panic capture for item processors
//!
//! A process-wide hook is installed once. On a thread that is inside
//! [`catch`], it records where the panic happened instead of printing it;
//! everywhere else it defers to the hook that was installed before.

use crate::ledger::ItemFailure;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

static INSTALL: Once = Once::new();

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static LAST_SITE: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn install_hook() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !CAPTURING.with(Cell::get) {
                previous(info);
                return;
            }
            let mut site = match info.location() {
                Some(loc) => format!("{}:{}:{}", loc.file(), loc.line(), loc.column()),
                None => "unknown location".to_string(),
            };
            let backtrace = Backtrace::capture();
            if backtrace.status() == BacktraceStatus::Captured {
                site.push('\n');
                site.push_str(&backtrace.to_string());
            }
            LAST_SITE.with(|last| *last.borrow_mut() = Some(site));
        }));
    });
}

/// Run `f`, turning a panic into an [`ItemFailure`] keyed by its panic site
pub(crate) fn catch<R>(f: impl FnOnce() -> R) -> Result<R, ItemFailure> {
    install_hook();
    LAST_SITE.with(|last| last.borrow_mut().take());
    let was_capturing = CAPTURING.with(|c| c.replace(true));

    let result = panic::catch_unwind(AssertUnwindSafe(f));

    CAPTURING.with(|c| c.set(was_capturing));
    result.map_err(|payload| {
        let site = LAST_SITE.with(|last| last.borrow_mut().take());
        ItemFailure::from_panic(payload, site)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ErrorClass;

    #[test]
    fn test_panic_site_becomes_traceback() {
        let failure = catch(|| panic!("bad item")).unwrap_err();

        assert_eq!(failure.class(), ErrorClass::Panic);
        assert_eq!(failure.message(), "bad item");
        assert!(failure.traceback().starts_with("Panic at "));
        assert!(failure.traceback().contains("unwind.rs:"));
    }

    #[test]
    fn test_distinct_sites_distinct_tracebacks() {
        let first = catch(|| panic!("one")).unwrap_err();
        let second = catch(|| panic!("two")).unwrap_err();

        assert_ne!(first.traceback(), second.traceback());
    }

    #[test]
    fn test_value_passes_through() {
        assert_eq!(catch(|| 7).unwrap(), 7);
    }
}
