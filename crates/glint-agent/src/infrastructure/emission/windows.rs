//! Windows keystroke injection via the SendInput API.
//!
//! Characters are sent as `KEYEVENTF_UNICODE` key-down/up pairs so they come
//! out right regardless of the active keyboard layout; characters outside
//! the Basic Multilingual Plane are sent as a UTF-16 surrogate pair.  Control
//! keys use their virtual-key codes.  Everything injected here carries the
//! `LLKHF_INJECTED` flag, which is how the keyboard tap recognizes and
//! ignores it.

#![cfg(target_os = "windows")]

use glint_core::keymap::windows_vk::{VK_BACK, VK_RETURN};
use glint_core::ControlKey;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
    KEYEVENTF_UNICODE, VIRTUAL_KEY,
};

use crate::application::replay_text::{EmissionError, EmissionTarget};

/// Windows implementation of [`EmissionTarget`] using SendInput.
#[derive(Default)]
pub struct SendInputEmitter;

impl SendInputEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl EmissionTarget for SendInputEmitter {
    fn emit(&self, ch: char) -> Result<(), EmissionError> {
        let mut units = [0u16; 2];
        let mut inputs = Vec::with_capacity(4);
        for &unit in ch.encode_utf16(&mut units).iter() {
            inputs.push(key_input(0, unit, KEYEVENTF_UNICODE));
        }
        for &unit in ch.encode_utf16(&mut units).iter() {
            inputs.push(key_input(0, unit, KEYEVENTF_UNICODE | KEYEVENTF_KEYUP));
        }
        send(&inputs)
    }

    fn emit_control(&self, key: ControlKey) -> Result<(), EmissionError> {
        let vk = match key {
            ControlKey::Enter => VK_RETURN,
            ControlKey::Backspace => VK_BACK,
        } as u16;
        send(&[
            key_input(vk, 0, KEYBD_EVENT_FLAGS(0)),
            key_input(vk, 0, KEYEVENTF_KEYUP),
        ])
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn key_input(vk: u16, scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk),
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn send(inputs: &[INPUT]) -> Result<(), EmissionError> {
    // SAFETY: every element is a fully initialized KEYBDINPUT on the stack
    // or heap, and cbsize matches the struct size.
    let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
    if sent as usize == inputs.len() {
        Ok(())
    } else {
        Err(EmissionError::Platform(format!(
            "SendInput injected {sent} of {} events",
            inputs.len()
        )))
    }
}
