//! Panic-site backtraces for the recovery middleware.
//!
//! By the time `catch_unwind` hands back a payload the panicking frames are
//! gone. The hook installed here runs before unwinding starts, so it records
//! the backtrace into a thread-local slot that the recovery layer drains on
//! the same thread, within the same poll.
//!
//! Panics raised while a [`RecoveryScope`] is active are not printed by the
//! default hook; the recovery layer logs them instead. Every other panic is
//! passed to the hook that was installed before ours.

use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, PanicHookInfo};
use std::sync::Once;

static INSTALL: Once = Once::new();

thread_local! {
    /// `Some(capture)` while a recovery layer is polling on this thread.
    static SCOPE: Cell<Option<bool>> = const { Cell::new(None) };
    static PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Install the process-wide hook. Later calls are no-ops.
pub fn install() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
            match SCOPE.with(Cell::get) {
                Some(capture) => {
                    let trace = capture.then(|| Backtrace::force_capture().to_string());
                    PANIC_TRACE.with(|slot| *slot.borrow_mut() = trace);
                }
                None => previous(info),
            }
        }));
    });
}

/// Take the backtrace recorded by the last in-scope panic on this thread.
pub fn take_trace() -> Option<String> {
    PANIC_TRACE.with(|slot| slot.borrow_mut().take())
}

/// Marks the current thread as running under a recovery layer.
///
/// Scopes nest; dropping one restores the enclosing scope. Hold it only for
/// the duration of a single poll, since the task may move threads between
/// polls.
#[must_use]
pub struct RecoveryScope {
    enclosing: Option<bool>,
}

impl RecoveryScope {
    /// Enter a scope. `capture` decides whether the hook records a
    /// backtrace for panics raised inside it.
    pub fn enter(capture: bool) -> Self {
        let enclosing = SCOPE.with(|scope| scope.replace(Some(capture)));
        Self { enclosing }
    }
}

impl Drop for RecoveryScope {
    fn drop(&mut self) {
        SCOPE.with(|scope| scope.set(self.enclosing));
    }
}
