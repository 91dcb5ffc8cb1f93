//! Mock input hook for unit and integration testing.
//!
//! Stands in for the Windows hooks: `install` keeps the tap and listener,
//! and [`MockInputHook::press`] / [`MockInputHook::click`] drive them exactly
//! as the hook procedures would, returning the verdict the OS would see.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use glint_core::{KeyDirection, PointerKind};

use super::{
    InputHook, KeyboardTap, PointerListener, RawKeyEvent, RawPointerEvent, TapError, TapVerdict,
};

type Installed = (Arc<KeyboardTap>, Arc<PointerListener>);

/// A mock implementation of [`InputHook`] that lets tests inject events.
#[derive(Default)]
pub struct MockInputHook {
    installed: Mutex<Option<Installed>>,
    uninstall_calls: AtomicU32,
    /// When `true`, `install` fails like a hook the OS refused.
    pub should_fail: bool,
}

impl MockInputHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_installed(&self) -> bool {
        self.lock().is_some()
    }

    pub fn uninstall_calls(&self) -> u32 {
        self.uninstall_calls.load(Ordering::SeqCst)
    }

    /// Feeds a raw keyboard event, as if captured from hardware.
    ///
    /// Events arriving while not installed are forwarded untouched.
    pub fn key(&self, vk_code: u32, direction: KeyDirection) -> TapVerdict {
        match self.lock().as_ref() {
            Some((tap, _)) => tap.process(RawKeyEvent {
                vk_code,
                direction,
                injected: false,
            }),
            None => TapVerdict::Forward,
        }
    }

    /// Presses and releases `vk_code`, returning the key-down verdict.
    pub fn press(&self, vk_code: u32) -> TapVerdict {
        let verdict = self.key(vk_code, KeyDirection::Down);
        self.key(vk_code, KeyDirection::Up);
        verdict
    }

    /// Feeds a raw pointer event.
    pub fn pointer(&self, kind: PointerKind, x: i32, y: i32) -> TapVerdict {
        match self.lock().as_ref() {
            Some((_, listener)) => listener.process(RawPointerEvent {
                kind,
                x,
                y,
                injected: false,
            }),
            None => TapVerdict::Forward,
        }
    }

    /// Left button down then up at the same point.
    pub fn click(&self, x: i32, y: i32) -> TapVerdict {
        let verdict = self.pointer(PointerKind::LeftDown, x, y);
        self.pointer(PointerKind::LeftUp, x, y);
        verdict
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Installed>> {
        self.installed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl InputHook for MockInputHook {
    fn install(
        &self,
        keyboard: Arc<KeyboardTap>,
        pointer: Arc<PointerListener>,
    ) -> Result<(), TapError> {
        if self.should_fail {
            return Err(TapError::KeyboardHookInstallFailed(
                "mock refused".to_string(),
            ));
        }
        let mut installed = self.lock();
        if installed.is_some() {
            return Err(TapError::AlreadyInstalled);
        }
        *installed = Some((keyboard, pointer));
        Ok(())
    }

    fn uninstall(&self) {
        self.uninstall_calls.fetch_add(1, Ordering::SeqCst);
        *self.lock() = None;
    }
}
