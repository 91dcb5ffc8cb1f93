//! # glint-core
//!
//! Platform-independent heart of Glint: key classification, the modifier and
//! gesture state machines, the single-flight request lifecycle, and the
//! humanized typing schedule used to replay answers.
//!
//! This crate has zero dependencies on OS APIs, network clients, or UI
//! frameworks, so every rule in here can be unit-tested on any platform.
//!
//! # Architecture overview (for beginners)
//!
//! Glint watches the keyboard and mouse system-wide.  When the user Alt+Clicks
//! a window (or Alt+Shift drags a region) the agent captures that part of the
//! screen, asks a vision model about it, shows the answer, and on request
//! types the answer back out with human-looking timing.
//!
//! Data flows one way through this crate:
//!
//! ```text
//!  KeyTransition ──► ModifierStateMachine ──► GestureDetector ──► RequestLifecycle
//!  PointerEvent  ─────────────────────────────────┘                     │
//!                                                                        ▼
//!                                              LifecycleEffect (capture, replay, present)
//! ```
//!
//! - **`keymap`** – Windows virtual-key constants and the classification of the
//!   handful of keys the agent cares about.
//! - **`domain`** – Event types, shared pressed-key set, modifier reducer,
//!   gesture detector, cancellation tokens, history, and the lifecycle itself.
//! - **`typing`** – Converts answer text into a timed keystroke schedule with
//!   occasional typo-and-correct sequences.

pub mod domain;
pub mod keymap;
pub mod typing;

pub use domain::abort::{AbortToken, InFlightGate};
pub use domain::events::{
    AgentEvent, KeyDirection, KeyTransition, PointerEvent, PointerKind,
};
pub use domain::gesture::{Detection, Gesture, GestureContext, GestureDetector, SelectionRect};
pub use domain::history::ResponseHistory;
pub use domain::key_state::SharedKeyState;
pub use domain::lifecycle::{
    CaptureTarget, InferenceOutcome, LifecycleEffect, LifecycleEvent, PresentationUpdate,
    RequestId, RequestLifecycle, RequestState, RequestTicket,
};
pub use domain::modifiers::{KeyEdge, ModifierState, ModifierStateMachine};
pub use keymap::{KeyClass, KeyCode, KeySide};
pub use typing::{ControlKey, EmissionAction, EmitterConfig, Keystroke, KeystrokeSchedule};
