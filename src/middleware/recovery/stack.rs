//! Stack traces of the panic itself.
//!
//! By the time `catch_unwind` returns, the frames that panicked are gone. A
//! panic hook runs before unwinding starts, so it captures the trace and
//! parks it in a thread-local; the caller picks it up on the same thread
//! right after the unwind is caught.

use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic;
use std::sync::Once;

thread_local! {
    static LAST: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Installs the capturing hook once per process. The hook that was in place
/// before keeps running after it.
pub(crate) fn install() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            let _ = LAST.try_with(|last| *last.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

/// Takes the trace of the latest panic on this thread. Falls back to the
/// current stack when another hook has replaced ours.
pub(crate) fn take() -> String {
    LAST.with(|last| last.borrow_mut().take())
        .unwrap_or_else(|| Backtrace::force_capture().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_comes_from_the_panicking_thread() {
        install();
        let caught = panic::catch_unwind(|| {
            panic!("stack test");
        });
        assert!(caught.is_err());

        let trace = take();
        assert!(!trace.is_empty());
        // Consumed.
        assert!(LAST.with(|last| last.borrow().is_none()));
    }
}
