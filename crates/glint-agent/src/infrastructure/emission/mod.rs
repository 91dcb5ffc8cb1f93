//! Keystroke injection implementations.
//!
//! The correct implementation is selected at compile time via
//! `#[cfg(target_os = ...)]`; [`platform_emitter`] hands main the right one.

use std::sync::Arc;

use glint_core::ControlKey;

use crate::application::replay_text::{EmissionError, EmissionTarget};

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Stand-in for platforms without an injection backend.
pub struct UnsupportedEmitter;

impl EmissionTarget for UnsupportedEmitter {
    fn emit(&self, _ch: char) -> Result<(), EmissionError> {
        Err(EmissionError::UnsupportedPlatform)
    }

    fn emit_control(&self, _key: ControlKey) -> Result<(), EmissionError> {
        Err(EmissionError::UnsupportedPlatform)
    }
}

/// Returns the keystroke injector for the current OS.
pub fn platform_emitter() -> Arc<dyn EmissionTarget> {
    #[cfg(target_os = "windows")]
    {
        Arc::new(windows::SendInputEmitter::new())
    }
    #[cfg(not(target_os = "windows"))]
    {
        Arc::new(UnsupportedEmitter)
    }
}
