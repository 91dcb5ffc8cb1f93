//! Key codes and the classification of keys the agent reacts to.
//!
//! The agent only needs to know about a handful of keys: the Alt and Shift
//! modifiers (either side), Tab (for Alt+Tab detection), Escape (to cancel a
//! region selection), and the configurable replay-trigger key.  Everything
//! else is forwarded untouched and never enters the event queue.

pub mod windows_vk;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a physical key (a Windows virtual-key code).
///
/// Only equality is meaningful; no ordering semantics are relied upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Which physical copy of a modifier produced an event.
///
/// The generic `VK_MENU` / `VK_SHIFT` codes are folded into [`KeySide::Left`]
/// so that a down on the generic code and an up on the sided code cancel out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySide {
    Left,
    Right,
}

/// The set of "interesting" keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyClass {
    Alt(KeySide),
    Shift(KeySide),
    Tab,
    Escape,
    ReplayTrigger,
}

impl KeyClass {
    /// Classifies `code`, returning `None` for keys the agent ignores.
    ///
    /// The replay trigger is checked first so that a user may bind it to any
    /// key, including one that would otherwise be ignored.
    pub fn classify(code: KeyCode, replay_trigger: KeyCode) -> Option<KeyClass> {
        use windows_vk::*;

        if code == replay_trigger {
            return Some(KeyClass::ReplayTrigger);
        }
        match code.raw() {
            VK_MENU | VK_LMENU => Some(KeyClass::Alt(KeySide::Left)),
            VK_RMENU => Some(KeyClass::Alt(KeySide::Right)),
            VK_SHIFT | VK_LSHIFT => Some(KeyClass::Shift(KeySide::Left)),
            VK_RSHIFT => Some(KeyClass::Shift(KeySide::Right)),
            VK_TAB => Some(KeyClass::Tab),
            VK_ESCAPE => Some(KeyClass::Escape),
            _ => None,
        }
    }
}
