#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Scoped handling of the Python global interpreter lock (GIL) at native-code boundaries.
//!
//! Native code that calls into an embedded Python interpreter, or that is called by it, has
//! to get the GIL discipline right on every path: take the lock before touching interpreter
//! state from a foreign thread, give it up around blocking work, and hand it back exactly once.
//! This crate turns those rules into types:
//!
//! - [`this_thread_has_the_gil`] tells whether the calling thread holds the lock.
//! - [`AcquireGil`] holds the GIL for its lifetime; [`with_gil`] is its closure form.
//! - [`ReleaseGil`] gives the GIL up for its lifetime; [`Gil::without_gil`] and [`without_gil`]
//!   are its closure forms.
//! - [`AcquireGilDeleter`], [`ReleaseGilDeleter`] and [`DeferredGilDeleter`] destroy values
//!   with the right lock state, and [`GilBox`] runs them automatically.
//!
//! # Feature flags
//!
//! - `python` (default): link against libpython through `pyo3-ffi`. Without it the crate
//!   still compiles with the same API, but every guard is a no-op and
//!   [`this_thread_has_the_gil`] always returns `false`, so code can be written once for
//!   builds with and without Python support.
//! - `auto-initialize`: make [`AcquireGil::new`] initialize the interpreter if it is not
//!   running yet.
//!
//! The interpreter that is linked is chosen at build time by `pyo3-build-config`; set
//! `PYO3_PYTHON` to pick a specific one.
//!
//! # Example
//!
//! ```
//! use pygil::{AcquireGil, ReleaseGil};
//!
//! pygil::initialize();
//!
//! let worker = std::thread::spawn(|| {
//!     // A thread the interpreter has never seen.
//!     assert!(!pygil::this_thread_has_the_gil());
//!
//!     let _gil = AcquireGil::new();
//!     assert!(pygil::this_thread_has_the_gil());
//!
//!     {
//!         let _released = ReleaseGil::new();
//!         // blocking I/O here lets Python threads run
//!         assert!(!pygil::this_thread_has_the_gil());
//!     }
//!
//!     assert!(pygil::this_thread_has_the_gil());
//! });
//! worker.join().unwrap();
//! ```

#[cfg(feature = "python")]
#[doc(inline)]
pub use pyo3_ffi as ffi;

pub use crate::deleter::{
    pending_deferred, AcquireGilBox, AcquireGilDeleter, DeferredGilBox, DeferredGilDeleter,
    Deleter, GilBox, ReleaseGilBox, ReleaseGilDeleter,
};
pub use crate::err::{GilError, GilResult};
pub use crate::gil::{this_thread_has_the_gil, with_gil, without_gil, AcquireGil, ReleaseGil};
pub use crate::interpreter_lifecycle::{initialize, is_finalizing, is_initialized};
pub use crate::marker::{Gil, Ungil};

pub mod deleter;
mod err;
pub mod gil;
mod impl_;
mod internal;
mod interpreter_lifecycle;
pub mod marker;
