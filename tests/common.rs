//! Useful tips for writing tests:
//!  - Tests are run in parallel, each on a thread the interpreter has never seen
//!  - Call `prepare()` before touching the GIL; the interpreter is started once per process

#![allow(dead_code)]

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Once};

pub fn prepare() {
    static LOGGING: Once = Once::new();
    LOGGING.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
    pygil::initialize();
}

const ALIVE: u8 = 0;
const DROPPED_WITH_GIL: u8 = 1;
const DROPPED_WITHOUT_GIL: u8 = 2;

/// Records whether the GIL was held at the moment it was dropped.
pub struct DropProbe(Arc<AtomicU8>);

impl Drop for DropProbe {
    fn drop(&mut self) {
        let observed = if pygil::this_thread_has_the_gil() {
            DROPPED_WITH_GIL
        } else {
            DROPPED_WITHOUT_GIL
        };
        self.0.store(observed, Ordering::SeqCst);
    }
}

/// Reads what a `DropProbe` observed.
#[derive(Clone)]
pub struct ProbeResult(Arc<AtomicU8>);

impl ProbeResult {
    /// `None` while the probe is alive, otherwise whether it was dropped with the GIL held.
    pub fn dropped_with_gil(&self) -> Option<bool> {
        match self.0.load(Ordering::SeqCst) {
            ALIVE => None,
            DROPPED_WITH_GIL => Some(true),
            _ => Some(false),
        }
    }
}

pub fn probe() -> (DropProbe, ProbeResult) {
    let state = Arc::new(AtomicU8::new(ALIVE));
    (DropProbe(state.clone()), ProbeResult(state))
}
