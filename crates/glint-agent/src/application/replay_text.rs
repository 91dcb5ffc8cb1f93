//! ReplayTextUseCase: types an answer out as humanized keystrokes.
//!
//! Walks a [`KeystrokeSchedule`], sleeping for each keystroke's delay and
//! handing the action to an [`EmissionTarget`].  The abort token is checked
//! before and after every sleep, so an abort stops the replay before the next
//! keystroke reaches the OS.

use std::sync::Arc;

use glint_core::{AbortToken, ControlKey, EmissionAction, EmitterConfig, KeystrokeSchedule};
use rand::Rng;
use thiserror::Error;

/// Error type for keystroke injection.
#[derive(Debug, Error)]
pub enum EmissionError {
    #[error("platform error: {0}")]
    Platform(String),
    #[error("keystroke injection is not supported on this platform")]
    UnsupportedPlatform,
}

/// Simulated keystroke injection.
///
/// Each supported OS provides an implementation in the infrastructure layer.
pub trait EmissionTarget: Send + Sync {
    /// Types one character, independent of keyboard layout.
    fn emit(&self, ch: char) -> Result<(), EmissionError>;

    /// Presses and releases a control key.
    fn emit_control(&self, key: ControlKey) -> Result<(), EmissionError>;
}

/// How a replay ended.  Counts are keystrokes actually injected, including
/// typos and Backspaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayOutcome {
    Completed { keystrokes: usize },
    Aborted { keystrokes: usize },
    Failed { keystrokes: usize, reason: String },
}

pub struct ReplayTextUseCase {
    target: Arc<dyn EmissionTarget>,
    config: EmitterConfig,
}

impl ReplayTextUseCase {
    pub fn new(target: Arc<dyn EmissionTarget>, config: EmitterConfig) -> Self {
        Self { target, config }
    }

    /// Types `text`, stopping early if `abort` is set or injection fails.
    pub async fn run<R: Rng + Send>(
        &self,
        text: &str,
        abort: &AbortToken,
        rng: R,
    ) -> ReplayOutcome {
        let mut keystrokes = 0;

        for keystroke in KeystrokeSchedule::new(text, self.config, rng) {
            if abort.is_aborted() {
                return ReplayOutcome::Aborted { keystrokes };
            }
            if !keystroke.delay.is_zero() {
                tokio::time::sleep(keystroke.delay).await;
                if abort.is_aborted() {
                    return ReplayOutcome::Aborted { keystrokes };
                }
            }

            let result = match keystroke.action {
                EmissionAction::Char(c) => self.target.emit(c),
                EmissionAction::Control(key) => self.target.emit_control(key),
            };
            if let Err(e) = result {
                tracing::warn!(error = %e, keystrokes, "keystroke injection failed");
                return ReplayOutcome::Failed {
                    keystrokes,
                    reason: e.to_string(),
                };
            }
            keystrokes += 1;
        }

        ReplayOutcome::Completed { keystrokes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::emission::mock::MockEmissionTarget;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Mutex;

    fn no_mistakes() -> EmitterConfig {
        EmitterConfig {
            mistake_probability: 0.0,
            ..EmitterConfig::default()
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    /// Sets the abort token once `after` keystrokes have been injected.
    struct AbortingTarget {
        typed: Mutex<Vec<char>>,
        abort: AbortToken,
        after: usize,
    }

    impl EmissionTarget for AbortingTarget {
        fn emit(&self, ch: char) -> Result<(), EmissionError> {
            let mut typed = self.typed.lock().unwrap();
            typed.push(ch);
            if typed.len() == self.after {
                self.abort.abort();
            }
            Ok(())
        }

        fn emit_control(&self, _key: ControlKey) -> Result<(), EmissionError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cat_types_three_characters() {
        // Arrange
        let target = Arc::new(MockEmissionTarget::new());
        let use_case = ReplayTextUseCase::new(target.clone(), no_mistakes());

        // Act
        let outcome = use_case.run("cat", &AbortToken::new(), rng()).await;

        // Assert
        assert_eq!(outcome, ReplayOutcome::Completed { keystrokes: 3 });
        assert_eq!(
            target.actions(),
            vec![
                EmissionAction::Char('c'),
                EmissionAction::Char('a'),
                EmissionAction::Char('t'),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_newline_is_sent_as_enter() {
        let target = Arc::new(MockEmissionTarget::new());
        let use_case = ReplayTextUseCase::new(target.clone(), no_mistakes());

        use_case.run("a\nb", &AbortToken::new(), rng()).await;

        assert_eq!(
            target.actions()[1],
            EmissionAction::Control(ControlKey::Enter)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pre_aborted_token_emits_nothing() {
        let target = Arc::new(MockEmissionTarget::new());
        let use_case = ReplayTextUseCase::new(target.clone(), no_mistakes());
        let abort = AbortToken::new();
        abort.abort();

        let outcome = use_case.run("hello", &abort, rng()).await;

        assert_eq!(outcome, ReplayOutcome::Aborted { keystrokes: 0 });
        assert!(target.actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_mid_stream_stops_at_next_checkpoint() {
        let abort = AbortToken::new();
        let target = Arc::new(AbortingTarget {
            typed: Mutex::new(Vec::new()),
            abort: abort.clone(),
            after: 2,
        });
        let use_case = ReplayTextUseCase::new(target.clone(), no_mistakes());

        let outcome = use_case.run("abcdef", &abort, rng()).await;

        assert_eq!(outcome, ReplayOutcome::Aborted { keystrokes: 2 });
        assert_eq!(*target.typed.lock().unwrap(), vec!['a', 'b']);
    }

    #[tokio::test(start_paused = true)]
    async fn test_injection_failure_ends_replay() {
        let target = Arc::new(MockEmissionTarget {
            should_fail: true,
            ..MockEmissionTarget::default()
        });
        let use_case = ReplayTextUseCase::new(target, no_mistakes());

        let outcome = use_case.run("xyz", &AbortToken::new(), rng()).await;

        assert!(matches!(
            outcome,
            ReplayOutcome::Failed { keystrokes: 0, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_mistakes_are_corrected() {
        let target = Arc::new(MockEmissionTarget::new());
        let config = EmitterConfig {
            mistake_probability: 1.0,
            ..EmitterConfig::default()
        };
        let use_case = ReplayTextUseCase::new(target.clone(), config);

        let outcome = use_case.run("ok", &AbortToken::new(), rng()).await;

        assert_eq!(outcome, ReplayOutcome::Completed { keystrokes: 6 });
        let actions = target.actions();
        assert_eq!(actions[1], EmissionAction::Control(ControlKey::Backspace));
        assert_eq!(actions[2], EmissionAction::Char('o'));
        assert_eq!(actions[5], EmissionAction::Char('k'));
    }
}
