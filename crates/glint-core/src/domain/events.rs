//! Normalized input events and the single event type consumed by the
//! dispatcher.

use std::time::Instant;

use crate::domain::lifecycle::LifecycleEvent;
use crate::keymap::{KeyClass, KeyCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Down,
    Up,
}

/// One physical key transition of an interesting key.
///
/// `synthetic` marks events generated by this process's own emitter; they are
/// normally filtered at the tap but the reducer ignores them as well.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyTransition {
    pub code: KeyCode,
    pub class: KeyClass,
    pub direction: KeyDirection,
    pub synthetic: bool,
    pub timestamp: Instant,
}

impl KeyTransition {
    pub fn down(code: KeyCode, class: KeyClass, timestamp: Instant) -> Self {
        Self {
            code,
            class,
            direction: KeyDirection::Down,
            synthetic: false,
            timestamp,
        }
    }

    pub fn up(code: KeyCode, class: KeyClass, timestamp: Instant) -> Self {
        Self {
            code,
            class,
            direction: KeyDirection::Up,
            synthetic: false,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Move,
    LeftDown,
    LeftUp,
}

/// A pointer event in global screen coordinates (device pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub x: i32,
    pub y: i32,
    pub timestamp: Instant,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, x: i32, y: i32, timestamp: Instant) -> Self {
        Self {
            kind,
            x,
            y,
            timestamp,
        }
    }
}

/// Everything that flows through the agent's single ordered event queue.
///
/// Producers are the keyboard tap, the pointer listener, and per-request
/// worker tasks; the only consumer is the dispatcher.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Key(KeyTransition),
    Pointer(PointerEvent),
    Lifecycle(LifecycleEvent),
}
