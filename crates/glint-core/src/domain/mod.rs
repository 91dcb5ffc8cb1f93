//! Domain entities for Glint.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies.  Nothing in here talks to the OS, spawns threads, or sleeps;
//! time is always passed in as an [`std::time::Instant`] so that every rule
//! can be exercised deterministically from tests.
//!
//! # How the pieces fit together (for beginners)
//!
//! - [`key_state::SharedKeyState`] is the only structure written from the OS
//!   hook callback.  It is a small lock-protected set of pressed keys.
//! - [`modifiers::ModifierStateMachine`] reduces the ordered stream of key
//!   transitions into level-triggered Alt/Shift state plus the Alt+Tab cooldown.
//! - [`gesture::GestureDetector`] combines that state with pointer events to
//!   recognise the user's gestures.
//! - [`lifecycle::RequestLifecycle`] owns the single in-flight request and
//!   decides what each gesture or worker completion means right now.

pub mod abort;
pub mod events;
pub mod gesture;
pub mod history;
pub mod key_state;
pub mod lifecycle;
pub mod modifiers;
