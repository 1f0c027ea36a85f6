//! The token that proves the current thread holds the GIL.
//!
//! The Python interpreter is not threadsafe. To protect it in multithreaded scenarios there is a
//! global lock, the *global interpreter lock* (hereafter referred to as *GIL*), that native code
//! must hold before touching interpreter state. When pygil acquires the GIL for you, you get a
//! [`Gil`] marker token that carries the *lifetime* of holding the lock.
//!
//! The token also supports the pattern that many extension modules employ:
//! - Drop the GIL, so that other Python threads can acquire it and make progress themselves
//! - Do something independently of the Python interpreter, like IO or a long running calculation
//! - Once that is done, reacquire the GIL
//!
//! That API is provided by [`Gil::without_gil`] and enforced via the [`Ungil`] bound on the
//! closure and the return type. `Ungil` piggy-backs off the [`Send`] auto trait, because it is
//! not possible to implement custom auto traits on stable Rust:
//!
//! ```rust
//! pub unsafe trait Ungil {}
//!
//! unsafe impl<T: Send> Ungil for T {}
//! ```
//!
//! `Gil` is `!Send`, so it cannot be captured by a closure passed to `without_gil`:
//!
//! ```rust, compile_fail
//! pygil::with_gil(|gil| {
//!     gil.without_gil(|| {
//!         // The token cannot cross into a region where the GIL is released.
//!         let _inner = gil;
//!     });
//! });
//! ```
//!
//! Because `Send` is used for something it is not quite meant for, `!Send` types such as `Rc`
//! are rejected too, even though nothing leaves the current thread. Move such values out of
//! the closure, or wrap them, if they do not touch the interpreter.

use std::fmt;
use std::marker::PhantomData;

use crate::impl_::not_send::NotSend;
use crate::AcquireGil;

/// Types that are safe to access while the GIL is not held.
///
/// # Safety
///
/// The type must not carry a [`Gil`] token or anything borrowed from one.
///
/// This is implemented for every `Send` type.
pub unsafe trait Ungil {}

unsafe impl<T: Send> Ungil for T {}

/// A marker token that represents holding the GIL.
///
/// It serves three main purposes:
/// - It provides a global API for the Python interpreter, such as [`Gil::without_gil`].
/// - It can be passed to functions that require a proof of holding the GIL.
/// - Its lifetime represents the scope of holding the GIL, which is bounded by the guard or
///   closure it came from.
///
/// Obtain one with [`with_gil`](crate::with_gil) or [`AcquireGil::gil`].
#[derive(Copy, Clone)]
pub struct Gil<'py>(PhantomData<(&'py AcquireGil, NotSend)>);

impl Gil<'_> {
    /// Creates a token without checking that the GIL is held.
    ///
    /// Use this when the interpreter has called into native code and the GIL is known to be
    /// held by the caller, e.g. in the body of an extension function.
    ///
    /// # Safety
    ///
    /// The current thread must hold the GIL for the whole lifetime `'py` the token is used with.
    #[inline]
    pub unsafe fn assume_held() -> Self {
        Gil(PhantomData)
    }
}

impl<'py> Gil<'py> {
    /// Temporarily releases the GIL, thus allowing other Python threads to run. The GIL will be
    /// reacquired when `f`'s scope ends, including when `f` panics.
    ///
    /// Only types that implement [`Ungil`] can cross the closure. See the
    /// [module level documentation](self) for more information.
    ///
    /// # Examples
    ///
    /// ```
    /// # pygil::initialize();
    /// pygil::with_gil(|gil| {
    ///     let sum: u64 = gil.without_gil(|| {
    ///         assert!(!pygil::this_thread_has_the_gil());
    ///         (1..=100).sum()
    ///     });
    ///     assert_eq!(sum, 5050);
    ///     assert!(pygil::this_thread_has_the_gil());
    /// });
    /// ```
    pub fn without_gil<T, F>(self, f: F) -> T
    where
        F: Ungil + FnOnce() -> T,
        T: Ungil,
    {
        // Use a guard pattern to handle reacquiring the GIL,
        // so that the GIL will be reacquired even if `f` panics.
        // The token outlives a manually created `ReleaseGil`, so the state is still checked.
        let _guard = crate::ReleaseGil::new();
        f()
    }

    /// Drops every value queued by [`DeferredGilDeleter`](crate::DeferredGilDeleter) now.
    ///
    /// This happens automatically whenever pygil acquires the GIL; calling it explicitly is
    /// only useful when the GIL was taken by other code.
    ///
    /// A token can outlive the lock (a [`ReleaseGil`](crate::ReleaseGil) created after it), so
    /// nothing is dropped unless the current thread actually holds the GIL.
    pub fn drop_deferred(self) {
        #[cfg(feature = "python")]
        if crate::this_thread_has_the_gil() {
            crate::internal::state::drop_deferred(self);
        }
    }
}

impl fmt::Debug for Gil<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Gil")
    }
}
