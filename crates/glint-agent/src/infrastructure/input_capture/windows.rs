//! Windows low-level keyboard and mouse hook implementation.
//!
//! This module installs `WH_KEYBOARD_LL` and `WH_MOUSE_LL` hooks using the
//! Windows API.  Each hook gets its own Win32 message-loop thread so that a
//! burst of mouse moves can never delay keyboard delivery and vice versa.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread;

use glint_core::{KeyDirection, PointerKind};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PostThreadMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, HC_ACTION, HOOKPROC, KBDLLHOOKSTRUCT, LLKHF_INJECTED, MSG,
    MSLLHOOKSTRUCT, WH_KEYBOARD_LL, WH_MOUSE_LL, WINDOWS_HOOK_ID, WM_KEYDOWN, WM_KEYUP,
    WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MOUSEMOVE, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
};

use super::{
    guarded, InputHook, KeyboardTap, PointerListener, RawKeyEvent, RawPointerEvent, TapError,
    TapVerdict,
};

/// `LLMHF_INJECTED` bit of `MSLLHOOKSTRUCT::flags`.
const LLMHF_INJECTED_BIT: u32 = 0x01;

/// Keyboard tap used by [`keyboard_hook_proc`].  Set once per process.
static KEYBOARD_TAP: OnceLock<Arc<KeyboardTap>> = OnceLock::new();

/// Pointer listener used by [`mouse_hook_proc`].  Set once per process.
static POINTER_LISTENER: OnceLock<Arc<PointerListener>> = OnceLock::new();

/// Windows low-level input hooks.
#[derive(Default)]
pub struct WindowsInputHook {
    /// Thread ids of the running message loops, used to post `WM_QUIT`.
    loop_threads: Mutex<Vec<u32>>,
    uninstalled: AtomicBool,
}

impl WindowsInputHook {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputHook for WindowsInputHook {
    fn install(
        &self,
        keyboard: Arc<KeyboardTap>,
        pointer: Arc<PointerListener>,
    ) -> Result<(), TapError> {
        KEYBOARD_TAP
            .set(keyboard)
            .map_err(|_| TapError::AlreadyInstalled)?;
        POINTER_LISTENER
            .set(pointer)
            .map_err(|_| TapError::AlreadyInstalled)?;

        let keyboard_thread = spawn_hook_loop(
            "glint-keyboard-hook",
            WH_KEYBOARD_LL,
            Some(keyboard_hook_proc),
        )
        .map_err(TapError::KeyboardHookInstallFailed)?;
        self.loop_threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(keyboard_thread);

        let mouse_thread =
            spawn_hook_loop("glint-pointer-hook", WH_MOUSE_LL, Some(mouse_hook_proc))
                .map_err(TapError::MouseHookInstallFailed)?;
        self.loop_threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(mouse_thread);

        tracing::info!("low-level keyboard and mouse hooks installed");
        Ok(())
    }

    fn uninstall(&self) {
        if self.uninstalled.swap(true, Ordering::SeqCst) {
            return;
        }
        let threads = std::mem::take(
            &mut *self
                .loop_threads
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for thread_id in threads {
            // SAFETY: Posting WM_QUIT to a thread id we created; the loop
            // exits and unhooks on its own thread.
            if let Err(e) =
                unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) }
            {
                tracing::warn!(thread_id, error = %e, "failed to stop hook loop");
            }
        }
        tracing::info!("input hooks uninstalled");
    }
}

/// Spawns a thread that installs one hook and pumps messages until
/// `WM_QUIT`.  Returns the thread id once the hook is in place.
fn spawn_hook_loop(name: &str, id: WINDOWS_HOOK_ID, proc: HOOKPROC) -> Result<u32, String> {
    let (ready_tx, ready_rx) = std_mpsc::channel::<Result<u32, String>>();

    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            // SAFETY: The hook must be installed on the thread that runs the
            // message loop; both happen here.
            let hook = unsafe {
                let module = GetModuleHandleW(None).ok();
                SetWindowsHookExW(id, proc, module.map(Into::into), 0)
            };
            let hook = match hook {
                Ok(hook) => hook,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                    return;
                }
            };
            // SAFETY: Always safe to call.
            let _ = ready_tx.send(Ok(unsafe { GetCurrentThreadId() }));

            let mut msg = MSG::default();
            // SAFETY: Standard Win32 GetMessage/DispatchMessage loop pattern.
            unsafe {
                while GetMessageW(&mut msg, None, 0, 0).as_bool() {
                    DispatchMessageW(&msg);
                }
                let _ = UnhookWindowsHookEx(hook);
            }
        })
        .map_err(|e| e.to_string())?;

    ready_rx
        .recv()
        .map_err(|_| "hook thread exited before reporting".to_string())?
}

/// Low-level keyboard hook callback.
///
/// # Safety
///
/// Called by Windows on the keyboard hook thread.  It must return quickly and
/// must always chain to the next hook unless the event is suppressed.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        let direction = match w_param.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(KeyDirection::Down),
            WM_KEYUP | WM_SYSKEYUP => Some(KeyDirection::Up),
            _ => None,
        };
        if let (Some(direction), Some(tap)) = (direction, KEYBOARD_TAP.get()) {
            // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
            let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
            let raw = RawKeyEvent {
                vk_code: kbs.vkCode,
                direction,
                injected: kbs.flags.0 & LLKHF_INJECTED.0 != 0,
            };
            let verdict = guarded(|| tap.process(raw));
            if verdict == TapVerdict::Suppress {
                return LRESULT(1);
            }
        }
    }
    // SAFETY: Forward the event to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

/// Low-level mouse hook callback.
///
/// # Safety
///
/// Called by Windows on the pointer hook thread; must return quickly.
unsafe extern "system" fn mouse_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        let kind = match w_param.0 as u32 {
            WM_MOUSEMOVE => Some(PointerKind::Move),
            WM_LBUTTONDOWN => Some(PointerKind::LeftDown),
            WM_LBUTTONUP => Some(PointerKind::LeftUp),
            _ => None,
        };
        if let (Some(kind), Some(listener)) = (kind, POINTER_LISTENER.get()) {
            // SAFETY: l_param points to a MSLLHOOKSTRUCT when n_code == HC_ACTION.
            let mhs = &*(l_param.0 as *const MSLLHOOKSTRUCT);
            let raw = RawPointerEvent {
                kind,
                x: mhs.pt.x,
                y: mhs.pt.y,
                injected: mhs.flags & LLMHF_INJECTED_BIT != 0,
            };
            let verdict = guarded(|| listener.process(raw));
            if verdict == TapVerdict::Suppress {
                return LRESULT(1);
            }
        }
    }
    // SAFETY: Forward to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}
