//! Scoped acquisition and release of the global interpreter lock.
//!
//! Two guards cover the two directions a native boundary can be crossed in:
//!
//! - [`AcquireGil`] takes the GIL on construction and gives it back on drop. Use it before
//!   calling into Python from a thread the interpreter does not know about.
//! - [`ReleaseGil`] gives the GIL up on construction and takes it back on drop. Use it around
//!   blocking I/O or long computations so other Python threads can run.
//!
//! Both restore the previous state on every exit path, including `?` and panics, because the
//! restoring half lives in `Drop`.

#[cfg(feature = "python")]
use crate::{ffi, internal::state};
use crate::impl_::not_send::{NotSend, NOT_SEND};
use crate::marker::{Gil, Ungil};
use crate::{GilError, GilResult};

use std::fmt;

/// Checks whether the current thread holds the GIL.
///
/// Guards created by this crate are tracked in a thread-local counter, so the common case does
/// not call into the interpreter. Otherwise this falls back to `PyGILState_Check`, which also
/// sees a GIL taken by other code, e.g. when the interpreter itself called into this thread.
///
/// Returns `false` if the interpreter is not initialized, and always `false` without the
/// `python` feature.
#[inline]
pub fn this_thread_has_the_gil() -> bool {
    #[cfg(feature = "python")]
    {
        if state::thread_holds_gil() {
            return true;
        }

        // `PyGILState_Check` reports 1 before the runtime is initialized.
        // SAFETY: always safe to call this
        if unsafe { ffi::Py_IsInitialized() } == 0 {
            return false;
        }

        // SAFETY: the interpreter is initialized.
        unsafe { ffi::PyGILState_Check() != 0 }
    }
    #[cfg(not(feature = "python"))]
    {
        false
    }
}

#[cfg(feature = "python")]
enum AcquireState {
    /// The thread already held the GIL through another `AcquireGil`.
    Assumed,
    /// `PyGILState_Ensure` was called and its state must be handed back.
    Ensured { gstate: ffi::PyGILState_STATE },
}

/// RAII guard that holds the GIL for its lifetime.
///
/// Acquiring is reentrant: a thread that already holds the GIL, through this crate or
/// otherwise, can create further guards, and only the outermost one really releases the lock.
///
/// The guard is `!Send`, as the GIL must be released by the thread that acquired it.
/// Guards must be dropped in the reverse order of their creation.
///
/// # Examples
///
/// ```
/// use pygil::AcquireGil;
/// # pygil::initialize();
///
/// std::thread::spawn(|| {
///     let guard = AcquireGil::new();
///     assert!(pygil::this_thread_has_the_gil());
///     drop(guard);
///     assert!(!pygil::this_thread_has_the_gil());
/// })
/// .join()
/// .unwrap();
/// ```
#[must_use = "the GIL is released as soon as the guard is dropped"]
pub struct AcquireGil {
    #[cfg(feature = "python")]
    state: AcquireState,
    _not_send: NotSend,
}

#[cfg(feature = "python")]
impl AcquireGil {
    /// Acquires the GIL for the current thread.
    ///
    /// If the `auto-initialize` feature is enabled and the interpreter is not running yet, it
    /// is initialized first, see [`initialize`](crate::initialize).
    ///
    /// # Panics
    ///
    /// - If the interpreter is not initialized and `auto-initialize` is not enabled.
    /// - If the interpreter is finalizing (detected on Python 3.13 and newer).
    pub fn new() -> Self {
        match Self::try_new() {
            Ok(guard) => guard,
            Err(GilError::NotInitialized) => {
                // try to initialize the interpreter and try again
                crate::interpreter_lifecycle::ensure_initialized();
                // SAFETY: the interpreter is initialized now.
                unsafe { Self::do_acquire_unchecked() }
            }
            Err(err) => panic!("{err}"),
        }
    }

    /// Variant of [`AcquireGil::new`] which returns an error if the GIL cannot be acquired.
    ///
    /// This never initializes the interpreter.
    pub fn try_new() -> GilResult<Self> {
        if state::thread_holds_gil() {
            // SAFETY: We just checked that the thread already holds the GIL.
            return Ok(unsafe { Self::assume() });
        }

        // SAFETY: always safe to call this
        if unsafe { ffi::Py_IsInitialized() } == 0 {
            return Err(GilError::NotInitialized);
        }

        // Calling `PyGILState_Ensure` while finalizing may crash CPython in unpredictable
        // ways. There's a time of check to time of use gap, but this catches most cases.
        if crate::is_finalizing() {
            return Err(GilError::Finalizing);
        }

        // SAFETY: We have done everything reasonable to ensure we're in a safe state to
        // acquire the GIL.
        Ok(unsafe { Self::do_acquire_unchecked() })
    }

    /// Acquires the GIL without checking the interpreter state.
    ///
    /// This can be called in contexts where the checks performed by [`AcquireGil::try_new`]
    /// would fail, such as during multi-phase interpreter initialization.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the Python interpreter is sufficiently initialized for a
    /// thread to acquire the GIL.
    pub unsafe fn new_unchecked() -> Self {
        if state::thread_holds_gil() {
            return unsafe { Self::assume() };
        }

        unsafe { Self::do_acquire_unchecked() }
    }

    /// Acquire the GIL, without a fast-path for a thread that already holds it.
    #[cold]
    unsafe fn do_acquire_unchecked() -> Self {
        // SAFETY: interpreter is sufficiently initialized to acquire the GIL.
        let gstate = unsafe { ffi::PyGILState_Ensure() };
        state::increment_hold_count();
        log::trace!("acquired the GIL ({gstate:?})");
        Self::finish(AcquireState::Ensured { gstate })
    }

    /// Creates a guard assuming that a guard on this thread already holds the GIL.
    unsafe fn assume() -> Self {
        state::increment_hold_count();
        Self::finish(AcquireState::Assumed)
    }

    fn finish(acquired: AcquireState) -> Self {
        let guard = AcquireGil {
            state: acquired,
            _not_send: NOT_SEND,
        };
        // Deferred values may panic on drop; the guard already exists so the GIL is
        // still released during unwinding.
        state::drop_deferred(guard.gil());
        guard
    }

    /// Returns `true` if this guard took the GIL itself rather than nesting inside another
    /// guard on the same thread.
    #[inline]
    pub fn is_outermost(&self) -> bool {
        matches!(self.state, AcquireState::Ensured { .. })
    }
}

#[cfg(not(feature = "python"))]
impl AcquireGil {
    /// Without the `python` feature there is no GIL; the guard does nothing.
    #[inline]
    pub fn new() -> Self {
        AcquireGil {
            _not_send: NOT_SEND,
        }
    }

    /// Always succeeds without the `python` feature.
    #[inline]
    pub fn try_new() -> GilResult<Self> {
        Ok(Self::new())
    }

    /// Same as [`AcquireGil::new`] without the `python` feature.
    ///
    /// # Safety
    ///
    /// Always safe to call without the `python` feature.
    #[inline]
    pub unsafe fn new_unchecked() -> Self {
        Self::new()
    }

    /// Always `false` without the `python` feature.
    #[inline]
    pub fn is_outermost(&self) -> bool {
        false
    }
}

impl AcquireGil {
    /// Gets the [`Gil`] token associated with this guard.
    #[inline]
    pub fn gil(&self) -> Gil<'_> {
        // SAFETY: this guard guarantees the GIL is held
        unsafe { Gil::assume_held() }
    }
}

impl Default for AcquireGil {
    fn default() -> Self {
        Self::new()
    }
}

/// The Drop implementation for `AcquireGil` will release the GIL if this guard took it.
#[cfg(feature = "python")]
impl Drop for AcquireGil {
    fn drop(&mut self) {
        match self.state {
            AcquireState::Assumed => {}
            AcquireState::Ensured { gstate } => {
                // SAFETY: `gstate` came from the matching `PyGILState_Ensure` on this thread.
                unsafe { ffi::PyGILState_Release(gstate) };
                log::trace!("released the GIL ({gstate:?})");
            }
        }
        state::decrement_hold_count();
    }
}

impl fmt::Debug for AcquireGil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquireGil")
            .field("outermost", &self.is_outermost())
            .finish()
    }
}

/// RAII guard that gives up the GIL for its lifetime and takes it back on drop.
///
/// Use it when performing blocking I/O or other long operations that do not touch the
/// interpreter. Prefer [`Gil::without_gil`] when a [`Gil`] token is at hand: its closure bound
/// statically keeps Python-bound values out of the released region.
///
/// The guard is `!Send`, as the GIL must be taken back by the thread that released it.
///
/// # Examples
///
/// ```
/// use pygil::{AcquireGil, ReleaseGil};
/// # pygil::initialize();
///
/// let _held = AcquireGil::new();
/// {
///     let _released = ReleaseGil::new();
///     assert!(!pygil::this_thread_has_the_gil());
///     // ... blocking work ...
/// }
/// assert!(pygil::this_thread_has_the_gil());
/// ```
#[must_use = "the GIL is taken back as soon as the guard is dropped"]
pub struct ReleaseGil {
    #[cfg(feature = "python")]
    count: isize,
    #[cfg(feature = "python")]
    tstate: *mut ffi::PyThreadState,
    _not_send: NotSend,
}

impl ReleaseGil {
    /// Releases the GIL held by the current thread.
    ///
    /// # Panics
    ///
    /// If the current thread does not hold the GIL (never, without the `python` feature).
    pub fn new() -> Self {
        match Self::try_new() {
            Ok(guard) => guard,
            Err(err) => panic!("{err}"),
        }
    }

    /// Variant of [`ReleaseGil::new`] which returns [`GilError::NotHeld`] if the current thread
    /// does not hold the GIL.
    pub fn try_new() -> GilResult<Self> {
        if cfg!(feature = "python") && !this_thread_has_the_gil() {
            return Err(GilError::NotHeld);
        }
        // SAFETY: just checked that the GIL is held.
        Ok(unsafe { Self::new_unchecked() })
    }

    /// Releases the GIL without checking that the current thread holds it.
    ///
    /// # Safety
    ///
    /// The current thread must hold the GIL.
    pub unsafe fn new_unchecked() -> Self {
        #[cfg(feature = "python")]
        {
            let count = state::suspend_hold_count();
            // SAFETY: the caller guarantees the GIL is held.
            let tstate = unsafe { ffi::PyEval_SaveThread() };
            log::trace!("suspended the GIL");

            ReleaseGil {
                count,
                tstate,
                _not_send: NOT_SEND,
            }
        }
        #[cfg(not(feature = "python"))]
        {
            ReleaseGil {
                _not_send: NOT_SEND,
            }
        }
    }
}

impl Default for ReleaseGil {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "python")]
impl Drop for ReleaseGil {
    fn drop(&mut self) {
        // SAFETY: `tstate` came from the matching `PyEval_SaveThread` on this thread.
        unsafe { ffi::PyEval_RestoreThread(self.tstate) };
        state::restore_hold_count(self.count);
        log::trace!("restored the GIL");

        // Values deferred while the GIL was released can go now. While unwinding, a panic
        // from one of them would abort the process; they stay queued for the next acquisition.
        if std::thread::panicking() {
            return;
        }
        // SAFETY: the GIL was just restored.
        state::drop_deferred(unsafe { Gil::assume_held() });
    }
}

impl fmt::Debug for ReleaseGil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseGil").finish_non_exhaustive()
    }
}

/// Acquires the GIL and runs `f` with a [`Gil`] token, releasing the GIL afterwards.
///
/// The GIL is released even if `f` panics. See [`AcquireGil::new`] for the panics raised
/// when the interpreter is not available.
///
/// # Examples
///
/// ```
/// # pygil::initialize();
/// let answer = pygil::with_gil(|_gil| {
///     assert!(pygil::this_thread_has_the_gil());
///     42
/// });
/// assert_eq!(answer, 42);
/// ```
#[inline]
pub fn with_gil<F, R>(f: F) -> R
where
    F: for<'py> FnOnce(Gil<'py>) -> R,
{
    let guard = AcquireGil::new();
    f(guard.gil())
}

/// Releases the GIL held by the current thread while `f` runs.
///
/// This is [`Gil::without_gil`] for callers that have no token, e.g. native code invoked by
/// the interpreter.
///
/// # Panics
///
/// If the current thread does not hold the GIL (never, without the `python` feature).
pub fn without_gil<T, F>(f: F) -> T
where
    F: Ungil + FnOnce() -> T,
    T: Ungil,
{
    let _guard = ReleaseGil::new();
    f()
}
