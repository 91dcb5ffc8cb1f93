//! Thread-safe set of physically pressed keys.
//!
//! Written only by the keyboard tap (from inside the OS hook callback) and
//! read by the modifier reducer.  Every operation takes the lock for a single
//! set operation and releases it immediately; the lock is never held across
//! any other call.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::events::KeyDirection;
use crate::keymap::KeyCode;

#[derive(Debug, Clone, Default)]
pub struct SharedKeyState {
    inner: Arc<Mutex<HashSet<KeyCode>>>,
}

impl SharedKeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one physical transition.
    ///
    /// Returns `true` when the set changed, i.e. `false` for an auto-repeat
    /// key-down or an up for a key that was never seen going down.
    pub fn record(&self, code: KeyCode, direction: KeyDirection) -> bool {
        let mut keys = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match direction {
            KeyDirection::Down => keys.insert(code),
            KeyDirection::Up => keys.remove(&code),
        }
    }

    pub fn is_pressed(&self, code: KeyCode) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&code)
    }

    pub fn snapshot(&self) -> Vec<KeyCode> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }
}
