//! Runs in its own process so that nothing has started the interpreter beforehand.

#![cfg(feature = "python")]

use pygil::{this_thread_has_the_gil, AcquireGil, GilError};

#[test]
fn test_acquire_starts_the_interpreter_on_demand() {
    assert!(!pygil::is_initialized());
    assert!(!this_thread_has_the_gil());
    assert_eq!(AcquireGil::try_new().unwrap_err(), GilError::NotInitialized);

    // `new` falls back to initializing (through `auto-initialize`, or because this crate is
    // the package under test).
    let guard = AcquireGil::new();
    assert!(pygil::is_initialized());
    assert!(guard.is_outermost());
    assert!(this_thread_has_the_gil());

    drop(guard);
    assert!(!this_thread_has_the_gil());
    assert!(AcquireGil::try_new().is_ok());
}
