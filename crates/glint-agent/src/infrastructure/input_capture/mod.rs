//! Input capture infrastructure.
//!
//! On Windows, this installs low-level keyboard and mouse hooks
//! (`WH_KEYBOARD_LL`, `WH_MOUSE_LL`), each on its own Win32 message-loop
//! thread.  The hook procedures do almost nothing themselves: they hand the
//! raw event to [`KeyboardTap::process`] or [`PointerListener::process`],
//! which update the pressed-key set, push a normalized event into the
//! bounded agent queue with a non-blocking `try_send`, and return a
//! forward/suppress verdict.  Both hook procedures run that call through
//! [`guarded`], so a panic in the handler turns into "forward".
//!
//! # Why so little work in the callback? (for beginners)
//!
//! Windows calls a low-level hook synchronously for *every* key press in the
//! whole system.  If the callback is slow, typing lags everywhere; if it is
//! very slow, Windows silently removes the hook.  So the callback never
//! blocks, never waits for the dispatcher, and never lets a panic escape.
//! All gesture logic runs later on the dispatcher task.
//!
//! # Testability
//!
//! [`KeyboardTap`] and [`PointerListener`] are plain structs, so tests feed
//! them [`RawKeyEvent`]s and [`RawPointerEvent`]s directly.  The
//! [`InputHook`] trait abstracts installing them into the OS; see
//! [`mock::MockInputHook`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use glint_core::{
    AgentEvent, KeyClass, KeyCode, KeyDirection, KeyTransition, PointerEvent, PointerKind,
    SharedKeyState,
};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Capacity of the queue between the hooks and the dispatcher.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Errors that can occur when installing the input hooks.
#[derive(Debug, Error)]
pub enum TapError {
    #[error("failed to install keyboard hook: {0}")]
    KeyboardHookInstallFailed(String),
    #[error("failed to install mouse hook: {0}")]
    MouseHookInstallFailed(String),
    #[error("input hooks are already installed")]
    AlreadyInstalled,
    #[error("low-level input hooks are not supported on this platform")]
    UnsupportedPlatform,
}

/// A keyboard event as reported by the OS hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    /// Windows Virtual Key code.
    pub vk_code: u32,
    pub direction: KeyDirection,
    /// Set for events injected by `SendInput` (ours or anyone else's).
    pub injected: bool,
}

/// A pointer event as reported by the OS hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPointerEvent {
    pub kind: PointerKind,
    pub x: i32,
    pub y: i32,
    pub injected: bool,
}

/// What the hook procedure should do with the event it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapVerdict {
    /// Pass the event to the next hook in the chain.
    Forward,
    /// Swallow the event so no other application sees it.
    Suppress,
}

/// Runs a hook handler and returns its verdict, or `Forward` if it panics.
///
/// A panic must not unwind across the `extern "system"` hook boundary, and a
/// faulty handler must never leave input swallowed.
pub fn guarded(handler: impl FnOnce() -> TapVerdict) -> TapVerdict {
    panic::catch_unwind(AssertUnwindSafe(handler)).unwrap_or_else(|_| {
        tracing::error!("input hook handler panicked, forwarding event");
        TapVerdict::Forward
    })
}

/// Installs and removes the OS-level hooks.
pub trait InputHook: Send + Sync {
    /// Installs both hooks.  Fails if either cannot be installed.
    fn install(
        &self,
        keyboard: Arc<KeyboardTap>,
        pointer: Arc<PointerListener>,
    ) -> Result<(), TapError>;

    /// Removes the hooks.  Safe to call more than once.
    fn uninstall(&self);
}

/// Non-blocking handle onto the agent's bounded event queue.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: mpsc::Sender<AgentEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventSink {
    pub fn new(sender: mpsc::Sender<AgentEvent>) -> Self {
        Self {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queues `event` without waiting.  A full queue drops the event and
    /// counts it; a closed queue (shutdown) drops it silently.
    pub fn push(&self, event: AgentEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Total events dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// The keyboard half of the input capture.
pub struct KeyboardTap {
    pressed: SharedKeyState,
    sink: EventSink,
    replay_trigger: KeyCode,
}

impl KeyboardTap {
    pub fn new(pressed: SharedKeyState, sink: EventSink, replay_trigger: KeyCode) -> Self {
        Self {
            pressed,
            sink,
            replay_trigger,
        }
    }

    /// Handles one raw keyboard event.  Called from inside the hook
    /// procedure, so this must stay cheap and must not block.
    pub fn process(&self, raw: RawKeyEvent) -> TapVerdict {
        // Our own keystrokes must never feed back into gesture detection or
        // the pressed-key set.
        if raw.injected {
            return TapVerdict::Forward;
        }

        let code = KeyCode(raw.vk_code);
        self.pressed.record(code, raw.direction);

        let Some(class) = KeyClass::classify(code, self.replay_trigger) else {
            return TapVerdict::Forward;
        };
        self.sink.push(AgentEvent::Key(KeyTransition {
            code,
            class,
            direction: raw.direction,
            synthetic: false,
            timestamp: Instant::now(),
        }));

        if class == KeyClass::ReplayTrigger {
            TapVerdict::Suppress
        } else {
            TapVerdict::Forward
        }
    }
}

/// The pointer half of the input capture.
pub struct PointerListener {
    sink: EventSink,
    select_mode: Arc<AtomicBool>,
}

impl PointerListener {
    /// `select_mode` is raised by the dispatcher while a region selection is
    /// in progress.
    pub fn new(sink: EventSink, select_mode: Arc<AtomicBool>) -> Self {
        Self { sink, select_mode }
    }

    /// Handles one raw pointer event.  Called from inside the hook procedure.
    pub fn process(&self, raw: RawPointerEvent) -> TapVerdict {
        if raw.injected {
            return TapVerdict::Forward;
        }
        // Gestures only read button edges.
        if raw.kind == PointerKind::Move {
            return TapVerdict::Forward;
        }
        let selecting = self.select_mode.load(Ordering::Acquire);
        self.sink.push(AgentEvent::Pointer(PointerEvent::new(
            raw.kind,
            raw.x,
            raw.y,
            Instant::now(),
        )));

        match raw.kind {
            PointerKind::LeftDown | PointerKind::LeftUp if selecting => TapVerdict::Suppress,
            _ => TapVerdict::Forward,
        }
    }
}

// ── Platform selection ────────────────────────────────────────────────────────

/// Hook for platforms without a low-level input API binding.
pub struct UnsupportedInputHook;

impl InputHook for UnsupportedInputHook {
    fn install(
        &self,
        _keyboard: Arc<KeyboardTap>,
        _pointer: Arc<PointerListener>,
    ) -> Result<(), TapError> {
        Err(TapError::UnsupportedPlatform)
    }

    fn uninstall(&self) {}
}

/// Returns the input hook for the current OS.
pub fn platform_hook() -> Arc<dyn InputHook> {
    #[cfg(target_os = "windows")]
    {
        Arc::new(windows::WindowsInputHook::new())
    }
    #[cfg(not(target_os = "windows"))]
    {
        Arc::new(UnsupportedInputHook)
    }
}
