//! Modifier state reducer.
//!
//! Turns the ordered stream of [`KeyTransition`]s into level-triggered Alt and
//! Shift state, filters out auto-repeat, and tracks the Alt+Tab cooldown.
//!
//! # Why an Alt+Tab cooldown? (for beginners)
//!
//! Alt is both this app's main modifier and the first half of the Windows
//! app-switch shortcut.  Without protection, a user who Alt+Tabs and then
//! clicks the window they switched to would trigger a capture.  Whenever Tab
//! goes down while Alt is held, every gesture is suppressed for
//! [`ALT_TAB_COOLDOWN`].  Each further Tab press extends the window; when it
//! runs out, recognition silently resumes.

use std::time::{Duration, Instant};

use crate::domain::events::{KeyDirection, KeyTransition};
use crate::domain::key_state::SharedKeyState;
use crate::keymap::windows_vk::VK_TAB;
use crate::keymap::{KeyClass, KeyCode, KeySide};

/// How long gesture recognition stays suppressed after Alt+Tab.
pub const ALT_TAB_COOLDOWN: Duration = Duration::from_millis(800);

const LEFT: u8 = 0b01;
const RIGHT: u8 = 0b10;

fn side_bit(side: KeySide) -> u8 {
    match side {
        KeySide::Left => LEFT,
        KeySide::Right => RIGHT,
    }
}

/// Logical state of the keys the gesture detector cares about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    alt: u8,
    shift: u8,
    tab_down: bool,
    escape_down: bool,
    trigger_down: bool,
    alt_tab_cooldown_until: Option<Instant>,
}

impl ModifierState {
    /// True while either Alt key is physically held.
    pub fn alt_down(&self) -> bool {
        self.alt != 0
    }

    /// True while either Shift key is physically held.
    pub fn shift_down(&self) -> bool {
        self.shift != 0
    }

    pub fn alt_tab_cooldown_until(&self) -> Option<Instant> {
        self.alt_tab_cooldown_until
    }

    /// Whether the Alt+Tab cooldown is still running at `now`.
    pub fn cooldown_active(&self, now: Instant) -> bool {
        self.alt_tab_cooldown_until
            .is_some_and(|until| now < until)
    }
}

/// A real (non-repeat) transition of an interesting key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEdge {
    pub class: KeyClass,
    pub direction: KeyDirection,
}

/// Pure reducer from key transitions to [`ModifierState`].
pub struct ModifierStateMachine {
    state: ModifierState,
    pressed: SharedKeyState,
}

impl ModifierStateMachine {
    /// Creates a reducer that consults `pressed` for keys held before the
    /// first event arrived.
    pub fn new(pressed: SharedKeyState) -> Self {
        Self {
            state: ModifierState::default(),
            pressed,
        }
    }

    pub fn state(&self) -> &ModifierState {
        &self.state
    }

    /// Folds one transition into the state.
    ///
    /// Returns the edge when the logical state of the key's class actually
    /// changed; auto-repeat downs and synthetic events return `None`.
    pub fn apply(&mut self, transition: &KeyTransition) -> Option<KeyEdge> {
        if transition.synthetic {
            return None;
        }
        let down = transition.direction == KeyDirection::Down;

        let changed = match transition.class {
            KeyClass::Alt(side) => {
                let was = self.state.alt_down();
                set_bit(&mut self.state.alt, side_bit(side), down);
                let now = self.state.alt_down();
                if now && !was && self.tab_held() {
                    self.arm_cooldown(transition.timestamp);
                }
                was != now
            }
            KeyClass::Shift(side) => {
                let was = self.state.shift_down();
                set_bit(&mut self.state.shift, side_bit(side), down);
                was != self.state.shift_down()
            }
            KeyClass::Tab => {
                let was = self.state.tab_down;
                self.state.tab_down = down;
                // Repeats re-arm too: holding Tab keeps the switcher cycling.
                if down && self.state.alt_down() {
                    self.arm_cooldown(transition.timestamp);
                }
                was != down
            }
            KeyClass::Escape => flip(&mut self.state.escape_down, down),
            KeyClass::ReplayTrigger => flip(&mut self.state.trigger_down, down),
        };

        changed.then_some(KeyEdge {
            class: transition.class,
            direction: transition.direction,
        })
    }

    fn tab_held(&self) -> bool {
        self.state.tab_down || self.pressed.is_pressed(KeyCode(VK_TAB))
    }

    fn arm_cooldown(&mut self, at: Instant) {
        let until = at + ALT_TAB_COOLDOWN;
        tracing::debug!(?until, "alt+tab detected, suppressing gestures");
        self.state.alt_tab_cooldown_until = Some(until);
    }
}

fn set_bit(mask: &mut u8, bit: u8, on: bool) {
    if on {
        *mask |= bit;
    } else {
        *mask &= !bit;
    }
}

fn flip(flag: &mut bool, down: bool) -> bool {
    let changed = *flag != down;
    *flag = down;
    changed
}
