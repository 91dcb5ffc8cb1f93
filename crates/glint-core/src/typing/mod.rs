//! Humanized typing.
//!
//! Replaying an answer should look like a person typing it: a rate that
//! drifts around a base words-per-minute value, longer pauses after
//! punctuation, and the occasional typo that gets corrected with Backspace.
//! [`KeystrokeSchedule`] produces that sequence lazily; the agent walks it,
//! sleeping for each keystroke's delay and checking its abort token before
//! every action.

pub mod adjacency;
pub mod schedule;

pub use schedule::KeystrokeSchedule;

use std::time::Duration;

/// Default typing speed in words per minute (one word = five characters).
pub const BASE_WPM: f64 = 170.0;
/// The current rate is drawn from `base ± WPM_JITTER`.
pub const WPM_JITTER: f64 = 25.0;
/// Fixed slow-down applied to every character delay.
pub const SPEED_MULTIPLIER: f64 = 1.3;
/// Chance of a typo before each eligible character.
pub const MISTAKE_PROBABILITY: f64 = 0.025;
/// The current rate is resampled every this many characters.
pub const RATE_RESAMPLE_INTERVAL: usize = 10;

/// Non-character keys the emitter presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    Enter,
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionAction {
    Char(char),
    Control(ControlKey),
}

/// One scheduled action, to be performed after waiting `delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keystroke {
    pub delay: Duration,
    pub action: EmissionAction,
}

/// Delay multipliers by character class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMultipliers {
    /// `' '`
    pub space: f64,
    /// `,` and `;`
    pub pause: f64,
    /// `.`, `!`, `?` and newline
    pub terminator: f64,
    /// Uppercase letters and symbols other than the apostrophe.
    pub other: f64,
}

impl Default for ClassMultipliers {
    fn default() -> Self {
        Self {
            space: 1.5,
            pause: 2.5,
            terminator: 4.0,
            other: 1.8,
        }
    }
}

impl ClassMultipliers {
    pub fn for_char(&self, c: char) -> f64 {
        match c {
            ' ' => self.space,
            ',' | ';' => self.pause,
            '.' | '!' | '?' | '\n' => self.terminator,
            c if c.is_uppercase() || (!c.is_alphanumeric() && c != '\'') => self.other,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitterConfig {
    pub base_wpm: f64,
    pub wpm_jitter: f64,
    pub mistake_probability: f64,
    pub speed_multiplier: f64,
    pub multipliers: ClassMultipliers,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            base_wpm: BASE_WPM,
            wpm_jitter: WPM_JITTER,
            mistake_probability: MISTAKE_PROBABILITY,
            speed_multiplier: SPEED_MULTIPLIER,
            multipliers: ClassMultipliers::default(),
        }
    }
}

impl EmitterConfig {
    pub fn with_base_wpm(base_wpm: f64) -> Self {
        Self {
            base_wpm,
            ..Self::default()
        }
    }
}
