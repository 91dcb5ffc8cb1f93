//! Infrastructure layer for the agent.
//!
//! Contains OS-facing adapters: the low-level input hooks, GDI screen
//! capture, keystroke injection, the Gemini HTTP client, the console
//! presentation surface, and file-system configuration.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `glint_core`, but MUST NOT be imported by the `application` layer except
//! through the traits that layer defines.

pub mod emission;
pub mod inference;
pub mod input_capture;
pub mod presentation;
pub mod screen_capture;
pub mod storage;
