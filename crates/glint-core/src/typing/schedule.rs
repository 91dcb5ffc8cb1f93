use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::time::Duration;

use rand::Rng;

use super::adjacency::neighbors;
use super::{ControlKey, EmissionAction, EmitterConfig, Keystroke, RATE_RESAMPLE_INTERVAL};

/// Pause between a typo and its Backspace, in seconds.
const TYPO_NOTICE_SECS: RangeInclusive<f64> = 0.09..=0.16;
/// Pause between the Backspace and the retyped character, in seconds.
const CORRECTION_SECS: RangeInclusive<f64> = 0.05..=0.10;
const DELAY_JITTER: RangeInclusive<f64> = 0.8..=1.2;
/// Lower bound for a sampled rate, so a tiny base never divides by zero.
const MIN_WPM: f64 = 1.0;

/// Lazily generated keystroke sequence for one piece of text.
///
/// Each input character yields one keystroke, or three when a typo is
/// injected (wrong key, Backspace, intended key).  Newlines become
/// [`ControlKey::Enter`]; carriage returns are dropped.
pub struct KeystrokeSchedule<R: Rng> {
    chars: Vec<char>,
    index: usize,
    pending: VecDeque<Keystroke>,
    current_wpm: f64,
    config: EmitterConfig,
    rng: R,
}

impl<R: Rng> KeystrokeSchedule<R> {
    pub fn new(text: &str, config: EmitterConfig, rng: R) -> Self {
        Self {
            chars: text.chars().filter(|&c| c != '\r').collect(),
            index: 0,
            pending: VecDeque::new(),
            current_wpm: config.base_wpm,
            config,
            rng,
        }
    }

    #[cfg(test)]
    fn remaining_chars(&self) -> usize {
        self.chars.len() - self.index
    }

    fn resample_rate(&mut self) {
        let base = self.config.base_wpm;
        let jitter = self.config.wpm_jitter.abs();
        let low = (base - jitter).max(MIN_WPM);
        let high = (base + jitter).max(low);
        self.current_wpm = self.rng.random_range(low..=high);
    }

    fn char_delay(&mut self, c: char) -> Duration {
        let chars_per_second = self.current_wpm * 5.0 / 60.0;
        let base = (1.0 / chars_per_second) * self.config.speed_multiplier;
        let jitter = self.rng.random_range(DELAY_JITTER);
        secs(base * jitter * self.config.multipliers.for_char(c))
    }

    fn pick_typo(&mut self, c: char) -> Option<char> {
        if !(c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return None;
        }
        let candidates = neighbors(c)?;
        if self.rng.random::<f64>() >= self.config.mistake_probability {
            return None;
        }
        let count = candidates.chars().count();
        candidates.chars().nth(self.rng.random_range(0..count))
    }
}

impl<R: Rng> Iterator for KeystrokeSchedule<R> {
    type Item = Keystroke;

    fn next(&mut self) -> Option<Keystroke> {
        if let Some(queued) = self.pending.pop_front() {
            return Some(queued);
        }

        let c = *self.chars.get(self.index)?;
        if self.index % RATE_RESAMPLE_INTERVAL == 0 {
            self.resample_rate();
        }
        self.index += 1;

        let delay = self.char_delay(c);
        let action = match c {
            '\n' => EmissionAction::Control(ControlKey::Enter),
            c => EmissionAction::Char(c),
        };

        match self.pick_typo(c) {
            Some(typo) => {
                let notice = secs(self.rng.random_range(TYPO_NOTICE_SECS));
                let correction = secs(self.rng.random_range(CORRECTION_SECS));
                self.pending.push_back(Keystroke {
                    delay: notice,
                    action: EmissionAction::Control(ControlKey::Backspace),
                });
                self.pending.push_back(Keystroke {
                    delay: correction + delay,
                    action,
                });
                Some(Keystroke {
                    delay: Duration::ZERO,
                    action: EmissionAction::Char(typo),
                })
            }
            None => Some(Keystroke { delay, action }),
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}
