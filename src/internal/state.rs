//! Per-thread bookkeeping of GIL ownership and the pool of deferred drops.

use crate::Gil;

use std::cell::Cell;
use std::mem;
use std::sync::{Mutex, OnceLock, PoisonError};

std::thread_local! {
    /// Number of live `AcquireGil` guards on this thread.
    ///
    /// It is incremented whenever an `AcquireGil` is created and decremented when it is
    /// dropped. A `ReleaseGil` stashes the value and zeroes it until the GIL is restored.
    ///
    /// As a result, if this thread holds the GIL through pygil, HOLD_COUNT is greater than zero.
    static HOLD_COUNT: Cell<isize> = const { Cell::new(0) };
}

/// Checks whether a pygil guard on this thread currently holds the GIL.
///
/// This does not see a GIL taken by other code (e.g. the interpreter calling into an
/// extension function); `this_thread_has_the_gil` falls back to `PyGILState_Check` for that.
#[inline(always)]
pub(crate) fn thread_holds_gil() -> bool {
    HOLD_COUNT.try_with(|c| c.get() > 0).unwrap_or(false)
}

/// Increments the hold count - to be called whenever an `AcquireGil` is created.
#[inline(always)]
pub(crate) fn increment_hold_count() {
    // Ignores the error in case this function is called from a TLS destructor.
    let _ = HOLD_COUNT.try_with(|c| c.set(c.get() + 1));
}

/// Decrements the hold count - to be called whenever an `AcquireGil` is dropped.
#[inline(always)]
pub(crate) fn decrement_hold_count() {
    // Ignores the error in case this function is called from a TLS destructor.
    let _ = HOLD_COUNT.try_with(|c| {
        let current = c.get();
        debug_assert!(current > 0, "negative GIL hold count detected");
        c.set(current - 1);
    });
}

/// Zeroes the hold count and returns the previous value, for `ReleaseGil`.
pub(crate) fn suspend_hold_count() -> isize {
    HOLD_COUNT.try_with(|c| c.replace(0)).unwrap_or(0)
}

/// Restores a count previously returned by `suspend_hold_count`.
pub(crate) fn restore_hold_count(count: isize) {
    let _ = HOLD_COUNT.try_with(|c| c.set(count));
}

#[cfg(test)]
pub(crate) fn hold_count() -> isize {
    HOLD_COUNT.with(|c| c.get())
}

type DeferredVec = Vec<Box<dyn Send>>;

/// Thread-safe storage for values whose destruction must wait until the GIL is held.
struct DeferredPool {
    pending: Mutex<DeferredVec>,
}

impl DeferredPool {
    const fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeferredVec> {
        // Values are never dropped while the lock is held, so a poisoned pool is still consistent.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, value: Box<dyn Send>) {
        self.lock().push(value);
    }

    fn drop_deferred(&self, _gil: Gil<'_>) {
        let mut pending = self.lock();
        if pending.is_empty() {
            return;
        }

        let values = mem::take(&mut *pending);
        drop(pending);

        log::debug!("dropping {} deferred value(s) with the GIL held", values.len());
        // Dropping may run arbitrary code, including acquiring the GIL again or
        // deferring more values, so the lock must already be released here.
        drop(values);
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

static POOL: OnceLock<DeferredPool> = OnceLock::new();

fn get_pool() -> &'static DeferredPool {
    POOL.get_or_init(DeferredPool::new)
}

/// Queues `value` to be dropped the next time a thread acquires the GIL through pygil.
pub(crate) fn register_deferred(value: Box<dyn Send>) {
    get_pool().register(value);
}

/// Drops every queued value on the current thread.
#[inline]
pub(crate) fn drop_deferred(gil: Gil<'_>) {
    if let Some(pool) = POOL.get() {
        pool.drop_deferred(gil);
    }
}

/// Number of values waiting in the pool.
pub(crate) fn pending_deferred() -> usize {
    POOL.get().map_or(0, DeferredPool::len)
}
