//! Console presentation surface.
//!
//! The shipped binary has no overlay window; it prints each presentation
//! update as one line on stdout.  The presenter is generic over
//! [`std::io::Write`] so tests can render into a `Vec<u8>`.

use std::io::Write;

use glint_core::domain::lifecycle::PLACEHOLDER_TEXT;
use glint_core::PresentationUpdate;

use crate::application::present_results::PresentationSurface;

pub struct ConsolePresenter<W: Write + Send> {
    out: W,
    showing: bool,
}

impl<W: Write + Send> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            showing: false,
        }
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write to console");
        }
    }
}

impl<W: Write + Send> PresentationSurface for ConsolePresenter<W> {
    fn apply(&mut self, update: &PresentationUpdate) {
        match update {
            PresentationUpdate::ShowPlaceholder => {
                self.showing = true;
                self.line(&format!("[glint] {PLACEHOLDER_TEXT}"));
            }
            PresentationUpdate::ShowResult(text) => {
                self.showing = true;
                self.line(&format!("[glint] {text}"));
            }
            PresentationUpdate::Dismiss => {
                if self.showing {
                    self.showing = false;
                    self.line("[glint] (dismissed)");
                }
            }
            PresentationUpdate::EnterSelectMode => {
                self.line("[glint] Select mode: drag to select, Esc to cancel.");
            }
            PresentationUpdate::CancelSelectMode => self.line("[glint] Selection cancelled."),
            PresentationUpdate::SelectionCompleted(rect) => self.line(&format!(
                "[glint] Selected {}x{} at ({}, {}).",
                rect.width, rect.height, rect.x, rect.y
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use glint_core::SelectionRect;

    use super::*;

    fn render(updates: &[PresentationUpdate]) -> String {
        let mut presenter = ConsolePresenter::new(Vec::new());
        for update in updates {
            presenter.apply(update);
        }
        String::from_utf8(presenter.out).unwrap()
    }

    #[test]
    fn test_placeholder_then_answer() {
        let out = render(&[
            PresentationUpdate::ShowPlaceholder,
            PresentationUpdate::ShowResult("Paris".to_string()),
        ]);

        assert_eq!(out, "[glint] ...\n[glint] Paris\n");
    }

    #[test]
    fn test_dismiss_without_anything_shown_prints_nothing() {
        assert_eq!(render(&[PresentationUpdate::Dismiss]), "");
    }

    #[test]
    fn test_dismiss_clears_showing() {
        let mut presenter = ConsolePresenter::new(Vec::new());
        presenter.apply(&PresentationUpdate::ShowPlaceholder);
        assert!(presenter.showing);

        presenter.apply(&PresentationUpdate::Dismiss);

        assert!(!presenter.showing);
    }

    #[test]
    fn test_selection_completed_reports_geometry() {
        let rect = SelectionRect::from_corners((10, 20), (14, 24));

        let out = render(&[PresentationUpdate::SelectionCompleted(rect)]);

        assert_eq!(out, "[glint] Selected 4x4 at (10, 20).\n");
    }
}
