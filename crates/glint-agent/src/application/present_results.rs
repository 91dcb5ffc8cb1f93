//! PresentResultsUseCase: drains presentation updates into a surface.
//!
//! The dispatcher never blocks on output.  It sends [`PresentationUpdate`]s
//! down an unbounded channel and this loop, running on its own task, hands
//! them to whatever [`PresentationSurface`] is installed (the console in the
//! shipped binary, a recorder in tests).

use glint_core::PresentationUpdate;
use tokio::sync::mpsc;

/// Something that can show the placeholder, answers and selection state.
pub trait PresentationSurface: Send {
    fn apply(&mut self, update: &PresentationUpdate);
}

pub struct PresentResultsUseCase<S: PresentationSurface> {
    surface: S,
}

impl<S: PresentationSurface> PresentResultsUseCase<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    /// Applies updates until every sender is dropped, then returns the
    /// surface.
    pub async fn run(mut self, mut updates: mpsc::UnboundedReceiver<PresentationUpdate>) -> S {
        while let Some(update) = updates.recv().await {
            tracing::trace!(?update, "presenting");
            self.surface.apply(&update);
        }
        tracing::debug!("presentation channel closed");
        self.surface
    }
}
