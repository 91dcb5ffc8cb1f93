//! Single-flight request lifecycle.
//!
//! [`RequestLifecycle`] owns the one request that may exist at any time and
//! is the single source of truth for "is something in flight".  It is a pure
//! transition function: callers feed it [`LifecycleEvent`]s together with the
//! current time and carry out the [`LifecycleEffect`]s it returns (spawn a
//! capture worker, start a replay, update the presentation surface).
//!
//! # States
//!
//! ```text
//!            CaptureWindowAt / RegionSelected
//!   Idle ─────────────────────────────────────► Capturing ──(image)──► AwaitingInference
//!    ▲                                              │ capture failed          │ answer / failure
//!    │                                              ▼                         ▼
//!    ├──────────────── Alt (dismiss) ◄──────── Displaying ◄──────────────────┘
//!    │                                              │ replay trigger (answers only)
//!    └──── finished / Alt (abort typing) ◄──── Replaying
//! ```
//!
//! While Capturing or AwaitingInference the presentation shows the
//! placeholder.  Alt during that phase aborts the request, but only once
//! [`LOADING_GRACE_PERIOD`] has passed since the placeholder appeared.
//! An aborted request's token stays set; any late completion for it is
//! discarded without touching the history.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::domain::abort::{AbortToken, InFlightGate};
use crate::domain::gesture::{Gesture, SelectionRect};
use crate::domain::history::ResponseHistory;

/// Alt is ignored for this long after the placeholder appears.
pub const LOADING_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Text shown while a request is being captured and answered.
pub const PLACEHOLDER_TEXT: &str = "...";
pub const CAPTURE_FAILED_MESSAGE: &str = "Capture failed.";
pub const CREDENTIALS_EXHAUSTED_MESSAGE: &str = "All API keys failed.";
pub const EMPTY_RESPONSE_MESSAGE: &str = "Empty response from model.";

pub type RequestId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Capturing,
    AwaitingInference,
    Displaying,
    Replaying,
}

/// What the capture worker should grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureTarget {
    WindowAt { x: i32, y: i32 },
    Region(SelectionRect),
}

/// Everything a worker needs to run one request.
#[derive(Debug, Clone)]
pub struct RequestTicket {
    pub id: RequestId,
    pub target: CaptureTarget,
    pub abort: AbortToken,
    /// Oldest-first answers at the moment the request started.
    pub history: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceOutcome {
    /// A non-empty model answer.
    Answer(String),
    /// A user-visible failure string (credentials exhausted, empty answer).
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    Gesture(Gesture),
    CaptureCompleted {
        request: RequestId,
    },
    CaptureFailed {
        request: RequestId,
        reason: String,
    },
    InferenceCompleted {
        request: RequestId,
        outcome: InferenceOutcome,
    },
    ReplayFinished {
        request: RequestId,
    },
}

/// Notifications for the presentation surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationUpdate {
    ShowPlaceholder,
    ShowResult(String),
    Dismiss,
    EnterSelectMode,
    CancelSelectMode,
    SelectionCompleted(SelectionRect),
}

#[derive(Debug, Clone)]
pub enum LifecycleEffect {
    BeginRequest(RequestTicket),
    BeginReplay {
        request: RequestId,
        text: String,
        abort: AbortToken,
    },
    Present(PresentationUpdate),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Shown {
    Placeholder,
    Answer(String),
    Failure,
}

#[derive(Debug)]
struct ActiveRequest {
    id: RequestId,
    abort: AbortToken,
    state: RequestState,
    placeholder_since: Instant,
    shown: Shown,
}

pub struct RequestLifecycle {
    active: Option<ActiveRequest>,
    gate: InFlightGate,
    history: ResponseHistory,
}

impl Default for RequestLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestLifecycle {
    pub fn new() -> Self {
        Self {
            active: None,
            gate: InFlightGate::new(),
            history: ResponseHistory::new(),
        }
    }

    pub fn state(&self) -> RequestState {
        self.active
            .as_ref()
            .map_or(RequestState::Idle, |active| active.state)
    }

    /// True while a capture, inference, or replay is running.  An answer
    /// that is merely on screen does not count.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state(),
            RequestState::Capturing | RequestState::AwaitingInference | RequestState::Replaying
        )
    }

    pub fn current_request(&self) -> Option<RequestId> {
        self.active.as_ref().map(|active| active.id)
    }

    #[cfg(test)]
    fn gate(&self) -> &InFlightGate {
        &self.gate
    }

    pub fn history(&self) -> &ResponseHistory {
        &self.history
    }

    /// Resolves a generic Alt press into the gesture it means right now.
    pub fn resolve_alt(&self) -> Option<Gesture> {
        match self.state() {
            RequestState::Idle => None,
            RequestState::Capturing | RequestState::AwaitingInference => {
                Some(Gesture::AbortLoading)
            }
            RequestState::Displaying => Some(Gesture::Dismiss),
            RequestState::Replaying => Some(Gesture::AbortTyping),
        }
    }

    /// The transition function.
    pub fn handle(&mut self, event: LifecycleEvent, now: Instant) -> Vec<LifecycleEffect> {
        match event {
            LifecycleEvent::Gesture(gesture) => self.on_gesture(gesture, now),
            LifecycleEvent::CaptureCompleted { request } => {
                let capturing = &[RequestState::Capturing];
                if let Some(active) = matching(&mut self.active, request, capturing) {
                    active.state = RequestState::AwaitingInference;
                }
                Vec::new()
            }
            LifecycleEvent::CaptureFailed { request, reason } => {
                self.on_capture_failed(request, &reason)
            }
            LifecycleEvent::InferenceCompleted { request, outcome } => {
                self.on_inference_completed(request, outcome)
            }
            LifecycleEvent::ReplayFinished { request } => {
                if matching(&mut self.active, request, &[RequestState::Replaying]).is_some() {
                    tracing::info!(request = %request, "replay finished");
                    self.finish();
                    vec![present(PresentationUpdate::Dismiss)]
                } else {
                    Vec::new()
                }
            }
        }
    }

    // ── Gesture handling ─────────────────────────────────────────────────────

    fn on_gesture(&mut self, gesture: Gesture, now: Instant) -> Vec<LifecycleEffect> {
        match gesture {
            Gesture::AltPressed => match self.resolve_alt() {
                Some(resolved) => self.on_gesture(resolved, now),
                None => Vec::new(),
            },
            Gesture::CaptureWindowAt { x, y } => self.begin(CaptureTarget::WindowAt { x, y }, now),
            Gesture::RegionSelected(rect) => self.begin(CaptureTarget::Region(rect), now),
            Gesture::AbortLoading => self.abort_loading(now),
            Gesture::Dismiss => {
                if self.state() == RequestState::Displaying {
                    self.finish();
                    vec![present(PresentationUpdate::Dismiss)]
                } else {
                    Vec::new()
                }
            }
            Gesture::AbortTyping => match self.active.as_ref() {
                Some(active) if active.state == RequestState::Replaying => {
                    tracing::info!(request = %active.id, "typing aborted");
                    active.abort.abort();
                    self.finish();
                    vec![present(PresentationUpdate::Dismiss)]
                }
                _ => Vec::new(),
            },
            Gesture::ReplayTrigger => self.begin_replay(),
            Gesture::EnterRegionSelect | Gesture::CancelRegionSelect => Vec::new(),
        }
    }

    fn begin(&mut self, target: CaptureTarget, now: Instant) -> Vec<LifecycleEffect> {
        if !self.gate.try_acquire() {
            tracing::info!(?target, state = ?self.state(), "request already in flight, ignoring");
            return Vec::new();
        }

        let ticket = RequestTicket {
            id: Uuid::new_v4(),
            target,
            abort: AbortToken::new(),
            history: self.history.snapshot(),
        };
        tracing::info!(request = %ticket.id, ?target, "request started");
        self.active = Some(ActiveRequest {
            id: ticket.id,
            abort: ticket.abort.clone(),
            state: RequestState::Capturing,
            placeholder_since: now,
            shown: Shown::Placeholder,
        });
        vec![
            present(PresentationUpdate::ShowPlaceholder),
            LifecycleEffect::BeginRequest(ticket),
        ]
    }

    fn abort_loading(&mut self, now: Instant) -> Vec<LifecycleEffect> {
        let Some(active) = self.active.as_ref() else {
            return Vec::new();
        };
        if active.shown != Shown::Placeholder {
            return Vec::new();
        }
        let elapsed = now.saturating_duration_since(active.placeholder_since);
        if elapsed < LOADING_GRACE_PERIOD {
            tracing::debug!(request = %active.id, ?elapsed, "abort ignored during grace period");
            return Vec::new();
        }
        tracing::info!(request = %active.id, "loading aborted");
        active.abort.abort();
        self.finish();
        vec![present(PresentationUpdate::Dismiss)]
    }

    fn begin_replay(&mut self) -> Vec<LifecycleEffect> {
        let Some(active) = self.active.as_mut() else {
            tracing::debug!("replay trigger with nothing to replay");
            return Vec::new();
        };
        let text = match (&active.state, &active.shown) {
            (RequestState::Displaying, Shown::Answer(text)) => text.clone(),
            _ => {
                tracing::debug!(state = ?active.state, "replay trigger ignored");
                return Vec::new();
            }
        };
        active.state = RequestState::Replaying;
        tracing::info!(request = %active.id, chars = text.chars().count(), "replay started");
        vec![LifecycleEffect::BeginReplay {
            request: active.id,
            text,
            abort: active.abort.clone(),
        }]
    }

    // ── Worker completions ───────────────────────────────────────────────────

    fn on_capture_failed(&mut self, request: RequestId, reason: &str) -> Vec<LifecycleEffect> {
        let capturing = &[RequestState::Capturing];
        let Some(active) = matching(&mut self.active, request, capturing) else {
            return Vec::new();
        };
        if active.abort.is_aborted() {
            self.finish();
            return Vec::new();
        }
        tracing::warn!(request = %request, reason, "capture failed");
        active.state = RequestState::Displaying;
        active.shown = Shown::Failure;
        vec![present(PresentationUpdate::ShowResult(
            CAPTURE_FAILED_MESSAGE.to_string(),
        ))]
    }

    fn on_inference_completed(
        &mut self,
        request: RequestId,
        outcome: InferenceOutcome,
    ) -> Vec<LifecycleEffect> {
        let Some(active) = matching(
            &mut self.active,
            request,
            &[RequestState::Capturing, RequestState::AwaitingInference],
        ) else {
            tracing::debug!(request = %request, "stale inference result discarded");
            return Vec::new();
        };
        if active.abort.is_aborted() {
            tracing::debug!(request = %request, "aborted request's result discarded");
            self.finish();
            return Vec::new();
        }

        active.state = RequestState::Displaying;
        let text = match outcome {
            InferenceOutcome::Answer(text) => {
                active.shown = Shown::Answer(text.clone());
                self.history.push(text.clone());
                text
            }
            InferenceOutcome::Failed(message) => {
                active.shown = Shown::Failure;
                message
            }
        };
        vec![present(PresentationUpdate::ShowResult(text))]
    }

    fn finish(&mut self) {
        self.active = None;
        self.gate.release();
    }
}

/// The active request if it is `request` and in one of `states`.
fn matching<'a>(
    active: &'a mut Option<ActiveRequest>,
    request: RequestId,
    states: &[RequestState],
) -> Option<&'a mut ActiveRequest> {
    active
        .as_mut()
        .filter(|active| active.id == request && states.contains(&active.state))
}

fn present(update: PresentationUpdate) -> LifecycleEffect {
    LifecycleEffect::Present(update)
}
