//! Errors reported when the interpreter lock cannot be taken or given up.

/// Reasons a GIL guard could not be created.
///
/// Returned by the fallible constructors [`AcquireGil::try_new`] and [`ReleaseGil::try_new`].
/// Their infallible counterparts panic with the same message instead.
///
/// [`AcquireGil::try_new`]: crate::AcquireGil::try_new
/// [`ReleaseGil::try_new`]: crate::ReleaseGil::try_new
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum GilError {
    /// The Python interpreter has not been initialized yet.
    #[error(
        "the Python interpreter is not initialized; consider calling `pygil::initialize()` \
         or enabling the `auto-initialize` feature"
    )]
    NotInitialized,
    /// The Python interpreter is shutting down and threads can no longer attach to it.
    #[error("cannot acquire the GIL while the Python interpreter is finalizing")]
    Finalizing,
    /// The current thread does not hold the GIL, so there is nothing to release.
    #[error("cannot release the GIL: the current thread does not hold it")]
    NotHeld,
}

/// Result type for fallible GIL operations.
pub type GilResult<T> = Result<T, GilError>;
