//! The deferred-drop pool is process-wide; the tests in this binary take `SERIAL` so that
//! queue lengths are deterministic.

#![cfg(all(feature = "python", not(Py_GIL_DISABLED)))]

use pygil::{
    ffi, pending_deferred, this_thread_has_the_gil, AcquireGil, DeferredGilBox, Gil, ReleaseGil,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

mod common;

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    let lock = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
    common::prepare();
    // Start from an empty pool.
    pygil::with_gil(|_| {});
    assert_eq!(pending_deferred(), 0);
    lock
}

#[test]
fn test_queued_until_the_gil_is_acquired() {
    let _serial = serial();
    let (probe, result) = common::probe();

    drop(DeferredGilBox::new(probe));
    assert_eq!(pending_deferred(), 1);
    assert_eq!(result.dropped_with_gil(), None);

    let _guard = AcquireGil::new();
    assert_eq!(pending_deferred(), 0);
    assert_eq!(result.dropped_with_gil(), Some(true));
}

#[test]
fn test_stale_token_does_not_drain() {
    let _serial = serial();
    let (probe, result) = common::probe();

    let guard = AcquireGil::new();
    let gil = guard.gil();
    {
        let _released = ReleaseGil::new();
        drop(DeferredGilBox::new(probe));

        // The token outlived the lock; nothing may be dropped here.
        gil.drop_deferred();
        assert_eq!(result.dropped_with_gil(), None);
        assert_eq!(pending_deferred(), 1);
    }

    // Restoring the GIL drains the pool.
    assert_eq!(pending_deferred(), 0);
    assert_eq!(result.dropped_with_gil(), Some(true));
}

#[test]
fn test_drop_deferred_under_a_foreign_gil() {
    let _serial = serial();
    let (probe, result) = common::probe();

    drop(DeferredGilBox::new(probe));
    assert_eq!(pending_deferred(), 1);

    // As if the interpreter had called into this thread: no pygil guard drains the pool.
    let gstate = unsafe { ffi::PyGILState_Ensure() };
    assert_eq!(pending_deferred(), 1);

    // SAFETY: the GIL is held until `PyGILState_Release` below.
    let gil = unsafe { Gil::assume_held() };
    gil.drop_deferred();
    assert_eq!(pending_deferred(), 0);
    assert_eq!(result.dropped_with_gil(), Some(true));

    unsafe { ffi::PyGILState_Release(gstate) };
}

/// Takes the GIL again and defers another value from its own `Drop`.
struct Reentrant(Option<common::DropProbe>);

impl Drop for Reentrant {
    fn drop(&mut self) {
        let nested_guard = AcquireGil::new();
        assert!(!nested_guard.is_outermost());
        drop(nested_guard);

        let nested = self.0.take();
        pygil::without_gil(move || drop(DeferredGilBox::new(nested)));
    }
}

#[test]
fn test_reentrant_drop_does_not_deadlock() {
    let _serial = serial();
    let (probe, result) = common::probe();

    drop(DeferredGilBox::new(Reentrant(Some(probe))));
    assert_eq!(pending_deferred(), 1);

    let _guard = AcquireGil::new();
    assert_eq!(pending_deferred(), 0);
    assert_eq!(result.dropped_with_gil(), Some(true));
    assert!(this_thread_has_the_gil());
}

struct PanicOnDrop;

impl Drop for PanicOnDrop {
    fn drop(&mut self) {
        panic!("deferred drop failed");
    }
}

#[test]
fn test_unwinding_release_leaves_values_queued() {
    let _serial = serial();

    pygil::with_gil(|gil| {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            gil.without_gil(|| -> u8 {
                drop(DeferredGilBox::new(PanicOnDrop));
                panic!("closure failed");
            })
        }));

        // Reaching this point means the process did not abort on a double panic.
        assert!(result.is_err());
        assert!(this_thread_has_the_gil());
        assert_eq!(pending_deferred(), 1);

        let result = panic::catch_unwind(AssertUnwindSafe(|| gil.drop_deferred()));
        assert!(result.is_err());
        assert_eq!(pending_deferred(), 0);
    });
}
