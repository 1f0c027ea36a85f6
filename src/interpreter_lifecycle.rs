//! Starting the embedded interpreter and querying its state.

#[cfg(feature = "python")]
use crate::ffi;

#[cfg(feature = "python")]
static START: std::sync::Once = std::sync::Once::new();

/// Prepares the embedded Python interpreter so that any thread can acquire the GIL.
///
/// If the interpreter is not yet running, this initializes it without registering signal
/// handlers and then releases the GIL from the calling thread. If it is already running
/// (e.g. because this code was loaded as an extension module), nothing happens.
///
/// Calling this more than once, or from several threads at the same time, is fine.
/// It does not protect against concurrent initialization by other users of the C API.
///
/// Without the `python` feature this is a no-op.
///
/// # Examples
///
/// ```
/// pygil::initialize();
/// assert!(pygil::is_initialized());
/// pygil::with_gil(|_gil| assert!(pygil::this_thread_has_the_gil()));
/// ```
pub fn initialize() {
    #[cfg(feature = "python")]
    START.call_once_force(|_| unsafe {
        // Use call_once_force because if initialization panics, it's okay to try again.
        if ffi::Py_IsInitialized() == 0 {
            ffi::Py_InitializeEx(0);

            // Release the GIL.
            ffi::PyEval_SaveThread();
            log::debug!("initialized the embedded Python interpreter");
        }
    });
}

/// Returns `true` once the Python interpreter is running.
#[inline]
pub fn is_initialized() -> bool {
    #[cfg(feature = "python")]
    {
        // SAFETY: always safe to call this
        unsafe { ffi::Py_IsInitialized() != 0 }
    }
    #[cfg(not(feature = "python"))]
    {
        false
    }
}

/// Returns `true` while the Python interpreter is shutting down.
///
/// Only Python 3.13 and newer expose this; older versions always report `false`.
#[inline]
pub fn is_finalizing() -> bool {
    #[cfg(all(feature = "python", Py_3_13))]
    {
        // SAFETY: always safe to call this
        unsafe { ffi::Py_IsFinalizing() != 0 }
    }
    #[cfg(not(all(feature = "python", Py_3_13)))]
    {
        false
    }
}

/// Makes sure the interpreter is running before `AcquireGil::new` calls into it.
#[cfg(feature = "python")]
pub(crate) fn ensure_initialized() {
    // Maybe auto-initialize the interpreter:
    //  - If the auto-initialize feature is set, initialize the interpreter.
    //  - Otherwise, just check the interpreter is initialized.
    #[cfg(feature = "auto-initialize")]
    {
        initialize();
    }
    #[cfg(not(feature = "auto-initialize"))]
    {
        // Running `cargo test` on this crate should not require `--features auto-initialize`;
        // cargo gives no way to declare required features for unit tests and doctests.
        if option_env!("CARGO_PRIMARY_PACKAGE").is_some() {
            initialize();
        }

        START.call_once_force(|_| {
            // Use call_once_force because if there is a panic because the interpreter is
            // not initialized, it's fine for the user to initialize the interpreter and
            // retry.
            assert!(is_initialized(), "{}", crate::GilError::NotInitialized);
        });
    }
}
