//! Destruction with the right GIL discipline.
//!
//! Some values must only be destroyed while the GIL is held (they release Python objects in
//! their `Drop`), others must only be destroyed while it is *not* held (their `Drop` joins a
//! thread or blocks on a lock that a Python thread may be waiting to take). A [`Deleter`]
//! encodes that requirement, and [`GilBox`] runs a deleter when it goes out of scope, so the
//! requirement holds no matter which thread ends up dropping the value.
//!
//! Shared ownership is `Arc<GilBox<T, D>>`: the deleter runs on whichever thread drops the
//! last reference.

use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};

use crate::gil::{this_thread_has_the_gil, AcquireGil, ReleaseGil};

/// Destroys a boxed value.
pub trait Deleter<T: ?Sized> {
    /// Consumes and drops `value`.
    fn delete(&self, value: Box<T>);
}

/// Drops values with the GIL held, acquiring it for the duration of the drop if needed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AcquireGilDeleter;

impl<T: ?Sized> Deleter<T> for AcquireGilDeleter {
    fn delete(&self, value: Box<T>) {
        if this_thread_has_the_gil() {
            drop(value);
        } else {
            let _guard = AcquireGil::new();
            drop(value);
        }
    }
}

/// Drops values with the GIL released, giving it up for the duration of the drop if needed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReleaseGilDeleter;

impl<T: ?Sized> Deleter<T> for ReleaseGilDeleter {
    fn delete(&self, value: Box<T>) {
        if this_thread_has_the_gil() {
            // SAFETY: just checked that the GIL is held.
            let _guard = unsafe { ReleaseGil::new_unchecked() };
            drop(value);
        } else {
            drop(value);
        }
    }
}

/// Drops values with the GIL held, without ever blocking to acquire it.
///
/// If the current thread holds the GIL the value is dropped immediately. Otherwise it is
/// queued and dropped the next time any thread acquires the GIL through this crate (or calls
/// [`Gil::drop_deferred`](crate::Gil::drop_deferred)). This suits destructors that run on
/// threads which must not wait for the GIL, e.g. while the interpreter is busy.
///
/// Without the `python` feature values are dropped immediately.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeferredGilDeleter;

impl<T: ?Sized + Send + 'static> Deleter<T> for DeferredGilDeleter {
    fn delete(&self, value: Box<T>) {
        #[cfg(feature = "python")]
        if !this_thread_has_the_gil() {
            crate::internal::state::register_deferred(Box::new(value));
            return;
        }
        drop(value);
    }
}

/// Number of values queued by [`DeferredGilDeleter`] and not dropped yet.
pub fn pending_deferred() -> usize {
    #[cfg(feature = "python")]
    {
        crate::internal::state::pending_deferred()
    }
    #[cfg(not(feature = "python"))]
    {
        0
    }
}

/// An owning pointer that hands its value to a [`Deleter`] when dropped.
///
/// This is `Box<T>` with a custom deleter, in the manner of a C++ `unique_ptr<T, D>`.
///
/// # Examples
///
/// ```
/// use pygil::AcquireGilBox;
/// # pygil::initialize();
///
/// struct NeedsGil;
///
/// impl Drop for NeedsGil {
///     fn drop(&mut self) {
///         assert!(pygil::this_thread_has_the_gil());
///     }
/// }
///
/// let value = AcquireGilBox::new(NeedsGil);
/// // Dropped on a thread without the GIL; the deleter acquires it first.
/// std::thread::spawn(move || drop(value)).join().unwrap();
/// ```
pub struct GilBox<T: ?Sized, D: Deleter<T>> {
    value: ManuallyDrop<Box<T>>,
    deleter: D,
}

/// A [`GilBox`] that drops its value with the GIL held.
pub type AcquireGilBox<T> = GilBox<T, AcquireGilDeleter>;

/// A [`GilBox`] that drops its value with the GIL released.
pub type ReleaseGilBox<T> = GilBox<T, ReleaseGilDeleter>;

/// A [`GilBox`] that drops its value once the GIL is held, without waiting for it.
pub type DeferredGilBox<T> = GilBox<T, DeferredGilDeleter>;

impl<T, D: Deleter<T> + Default> GilBox<T, D> {
    /// Boxes `value` with a default-constructed deleter.
    pub fn new(value: T) -> Self {
        Self::with_deleter(value, D::default())
    }
}

impl<T, D: Deleter<T>> GilBox<T, D> {
    /// Boxes `value` with the given deleter.
    pub fn with_deleter(value: T, deleter: D) -> Self {
        Self::from_box(Box::new(value), deleter)
    }
}

impl<T: ?Sized, D: Deleter<T>> GilBox<T, D> {
    /// Takes ownership of an existing box.
    pub fn from_box(value: Box<T>, deleter: D) -> Self {
        GilBox {
            value: ManuallyDrop::new(value),
            deleter,
        }
    }

    /// Gives up ownership of the value without running the deleter.
    pub fn into_inner(this: Self) -> Box<T> {
        let mut this = ManuallyDrop::new(this);
        // SAFETY: `this` is never dropped, so the value is taken exactly once, and the
        // deleter is read out exactly once.
        let (value, deleter) = unsafe {
            (
                ManuallyDrop::take(&mut this.value),
                std::ptr::read(&this.deleter),
            )
        };
        drop(deleter);
        value
    }

    /// Returns the deleter that will destroy the value.
    pub fn deleter(this: &Self) -> &D {
        &this.deleter
    }
}

impl<T: ?Sized, D: Deleter<T>> Drop for GilBox<T, D> {
    fn drop(&mut self) {
        // SAFETY: self.value will not be used anymore.
        let value = unsafe { ManuallyDrop::take(&mut self.value) };
        self.deleter.delete(value);
    }
}

impl<T: ?Sized, D: Deleter<T>> Deref for GilBox<T, D> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: ?Sized, D: Deleter<T>> DerefMut for GilBox<T, D> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: ?Sized, D: Deleter<T>> AsRef<T> for GilBox<T, D> {
    fn as_ref(&self) -> &T {
        self
    }
}

impl<T: ?Sized, D: Deleter<T>> AsMut<T> for GilBox<T, D> {
    fn as_mut(&mut self) -> &mut T {
        self
    }
}

impl<T: ?Sized + fmt::Debug, D: Deleter<T>> fmt::Debug for GilBox<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GilBox").field(&&**self).finish()
    }
}
