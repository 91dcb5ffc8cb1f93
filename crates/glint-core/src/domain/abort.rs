//! Cooperative cancellation and the single-flight gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-request cancellation flag.
///
/// A fresh token is created for every request and never reset; once set it
/// stays set.  Workers poll it at checkpoints (before committing an inference
/// result, before each emitted keystroke) rather than being interrupted.
#[derive(Debug, Clone, Default)]
pub struct AbortToken {
    flag: Arc<AtomicBool>,
}

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Process-wide "a request exists" flag.
///
/// Entry into a new request is a compare-and-swap from `false` to `true`, so
/// two gestures racing for the gate can never both win.
#[derive(Debug, Clone, Default)]
pub struct InFlightGate {
    busy: Arc<AtomicBool>,
}

impl InFlightGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the caller acquired the gate.
    pub fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}
