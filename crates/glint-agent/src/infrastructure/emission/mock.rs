//! Mock keystroke injector for unit testing.
//!
//! # Why a mock emitter?
//!
//! The real injector calls `SendInput`, which types into whatever window has
//! focus on the test machine and cannot be observed from Rust.  The mock
//! records every action in a `Mutex<Vec<...>>` so assertions can inspect
//! exactly what was typed and in what order.
//!
//! # `should_fail` flag
//!
//! Set `should_fail = true` to make every call return
//! [`EmissionError::Platform`], for testing error paths.

use std::sync::{Mutex, PoisonError};

use glint_core::{ControlKey, EmissionAction};

use crate::application::replay_text::{EmissionError, EmissionTarget};

#[derive(Default)]
pub struct MockEmissionTarget {
    pub actions: Mutex<Vec<EmissionAction>>,
    pub should_fail: bool,
}

impl MockEmissionTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything typed so far.
    pub fn actions(&self) -> Vec<EmissionAction> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The typed text with Backspace applied and Enter as `'\n'`.
    pub fn typed_text(&self) -> String {
        let mut text = String::new();
        for action in self.actions() {
            match action {
                EmissionAction::Char(c) => text.push(c),
                EmissionAction::Control(ControlKey::Enter) => text.push('\n'),
                EmissionAction::Control(ControlKey::Backspace) => {
                    text.pop();
                }
            }
        }
        text
    }

    fn record(&self, action: EmissionAction) -> Result<(), EmissionError> {
        if self.should_fail {
            return Err(EmissionError::Platform("mock failure".to_string()));
        }
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action);
        Ok(())
    }
}

impl EmissionTarget for MockEmissionTarget {
    fn emit(&self, ch: char) -> Result<(), EmissionError> {
        self.record(EmissionAction::Char(ch))
    }

    fn emit_control(&self, key: ControlKey) -> Result<(), EmissionError> {
        self.record(EmissionAction::Control(key))
    }
}
