//! EventDispatcher: the single consumer of the agent's event queue.
//!
//! Every hook event and every worker report funnels through one bounded
//! queue into this loop.  It owns all the mutable pure-domain state
//! (modifier reducer, gesture detector, request lifecycle), so none of it
//! needs a lock:
//!
//! ```text
//! queue ──► step() ──► Vec<LifecycleEffect> ──► execute()
//!             │                                   ├─ Present      → presentation channel
//!             │                                   ├─ BeginRequest → spawn RunRequestUseCase
//!             │                                   └─ BeginReplay  → spawn ReplayTextUseCase
//!             └─ select_mode flag (read by the pointer hook)
//! ```
//!
//! `step` is synchronous and side-effect free apart from the select-mode
//! flag, which is what the unit tests below drive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use glint_core::{
    AgentEvent, Detection, GestureContext, GestureDetector, LifecycleEffect, LifecycleEvent,
    ModifierStateMachine, PresentationUpdate, RequestLifecycle, SharedKeyState,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;

use crate::application::replay_text::{ReplayOutcome, ReplayTextUseCase};
use crate::application::run_request::RunRequestUseCase;
use crate::infrastructure::input_capture::EventSink;

/// Everything the dispatcher talks to outside its own state.
pub struct DispatcherPorts {
    pub requests: Arc<RunRequestUseCase>,
    pub replay: Arc<ReplayTextUseCase>,
    pub presentation: mpsc::UnboundedSender<PresentationUpdate>,
    /// Loop-back sender handed to workers for their reports.
    pub events: mpsc::Sender<AgentEvent>,
    /// Shared with the pointer hook so clicks are swallowed while selecting.
    pub select_mode: Arc<AtomicBool>,
}

pub struct EventDispatcher {
    modifiers: ModifierStateMachine,
    detector: GestureDetector,
    lifecycle: RequestLifecycle,
    ports: DispatcherPorts,
    drop_monitor: Option<EventSink>,
    last_dropped: u64,
}

impl EventDispatcher {
    pub fn new(pressed: SharedKeyState, ports: DispatcherPorts) -> Self {
        Self {
            modifiers: ModifierStateMachine::new(pressed),
            detector: GestureDetector::new(),
            lifecycle: RequestLifecycle::new(),
            ports,
            drop_monitor: None,
            last_dropped: 0,
        }
    }

    /// Logs a warning whenever `sink` reports newly dropped events.
    pub fn with_drop_monitor(mut self, sink: EventSink) -> Self {
        self.drop_monitor = Some(sink);
        self
    }

    pub fn lifecycle(&self) -> &RequestLifecycle {
        &self.lifecycle
    }

    /// Feeds one event through the reducers and returns the effects to run.
    pub fn step(&mut self, event: AgentEvent) -> Vec<LifecycleEffect> {
        let effects = match event {
            AgentEvent::Key(transition) => {
                let now = transition.timestamp;
                match self.modifiers.apply(&transition) {
                    Some(edge) => {
                        let ctx = self.context(now);
                        let detection = self.detector.on_key(edge, self.modifiers.state(), ctx);
                        self.resolve(detection, now)
                    }
                    None => Vec::new(),
                }
            }
            AgentEvent::Pointer(pointer) => {
                let now = pointer.timestamp;
                let ctx = self.context(now);
                let detection = self
                    .detector
                    .on_pointer(&pointer, self.modifiers.state(), ctx);
                self.resolve(detection, now)
            }
            AgentEvent::Lifecycle(event) => self.lifecycle.handle(event, Instant::now()),
        };

        self.ports
            .select_mode
            .store(self.detector.is_selecting(), Ordering::Release);
        effects
    }

    /// Runs one effect.  Spawned workers report back through `ports.events`.
    pub fn execute(&self, effect: LifecycleEffect) {
        match effect {
            LifecycleEffect::Present(update) => {
                if self.ports.presentation.send(update).is_err() {
                    tracing::debug!("presentation channel closed");
                }
            }
            LifecycleEffect::BeginRequest(ticket) => {
                let requests = Arc::clone(&self.ports.requests);
                let events = self.ports.events.clone();
                tokio::spawn(async move { requests.run(ticket, &events).await });
            }
            LifecycleEffect::BeginReplay {
                request,
                text,
                abort,
            } => {
                let replay = Arc::clone(&self.ports.replay);
                let events = self.ports.events.clone();
                tokio::spawn(async move {
                    let outcome = replay.run(&text, &abort, StdRng::from_os_rng()).await;
                    match &outcome {
                        ReplayOutcome::Completed { keystrokes } => {
                            tracing::info!(%request, keystrokes, "replay completed")
                        }
                        ReplayOutcome::Aborted { keystrokes } => {
                            tracing::info!(%request, keystrokes, "replay aborted")
                        }
                        ReplayOutcome::Failed { keystrokes, reason } => {
                            tracing::warn!(%request, keystrokes, %reason, "replay failed")
                        }
                    }
                    let finished = AgentEvent::Lifecycle(LifecycleEvent::ReplayFinished { request });
                    if events.send(finished).await.is_err() {
                        tracing::debug!("dispatcher gone before replay finished");
                    }
                });
            }
        }
    }

    /// Consumes the queue.  `ports.events` keeps the channel open, so the
    /// loop runs until its task is aborted at shutdown.
    pub async fn run(mut self, mut events: mpsc::Receiver<AgentEvent>) {
        tracing::info!("dispatcher started");
        while let Some(event) = events.recv().await {
            for effect in self.step(event) {
                self.execute(effect);
            }
            self.report_drops();
        }
        tracing::info!("dispatcher stopped");
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn context(&self, now: Instant) -> GestureContext {
        GestureContext {
            request_in_flight: self.lifecycle.is_busy(),
            now,
        }
    }

    fn resolve(&mut self, detection: Detection, now: Instant) -> Vec<LifecycleEffect> {
        let mut effects: Vec<LifecycleEffect> = detection
            .notices
            .into_iter()
            .map(LifecycleEffect::Present)
            .collect();
        for gesture in detection.gestures {
            tracing::debug!(?gesture, "gesture");
            effects.extend(self.lifecycle.handle(LifecycleEvent::Gesture(gesture), now));
        }
        effects
    }

    fn report_drops(&mut self) {
        let Some(sink) = &self.drop_monitor else {
            return;
        };
        let dropped = sink.dropped();
        if dropped > self.last_dropped {
            tracing::warn!(
                newly_dropped = dropped - self.last_dropped,
                total = dropped,
                "event queue full, input events were dropped"
            );
            self.last_dropped = dropped;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use glint_core::keymap::windows_vk::*;
    use glint_core::{
        EmitterConfig, InferenceOutcome, KeyClass, KeyCode, KeySide, KeyTransition, PointerEvent,
        PointerKind, RequestState, SelectionRect,
    };

    use super::*;
    use crate::application::rotate_credentials::{
        Credential, CredentialRotation, InferenceError, InferenceProvider,
    };
    use crate::application::run_request::{
        CaptureError, CaptureProvider, CapturedImage, EncodedImage,
    };
    use crate::infrastructure::emission::mock::MockEmissionTarget;

    struct BlankScreen;

    impl CaptureProvider for BlankScreen {
        fn capture_window_at(&self, _x: i32, _y: i32) -> Result<CapturedImage, CaptureError> {
            Ok(CapturedImage::new(1, 1, vec![0; 4]))
        }

        fn capture_region(&self, rect: SelectionRect) -> Result<CapturedImage, CaptureError> {
            let len = (rect.width * rect.height * 4) as usize;
            Ok(CapturedImage::new(rect.width, rect.height, vec![0; len]))
        }
    }

    struct FixedAnswer;

    #[async_trait]
    impl InferenceProvider for FixedAnswer {
        async fn infer(
            &self,
            _credential: &Credential,
            _image: &EncodedImage,
            _prior: &[String],
        ) -> Result<String, InferenceError> {
            Ok("hi".to_string())
        }
    }

    struct Harness {
        dispatcher: EventDispatcher,
        presentation: mpsc::UnboundedReceiver<PresentationUpdate>,
        events: mpsc::Receiver<AgentEvent>,
        select_mode: Arc<AtomicBool>,
        emitter: Arc<MockEmissionTarget>,
        t0: Instant,
    }

    fn harness() -> Harness {
        let (presentation_tx, presentation) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::channel(64);
        let select_mode = Arc::new(AtomicBool::new(false));
        let emitter = Arc::new(MockEmissionTarget::new());
        let rotation = Arc::new(CredentialRotation::new(
            Arc::new(FixedAnswer),
            vec![Credential::new("k")],
        ));
        let config = EmitterConfig {
            mistake_probability: 0.0,
            ..EmitterConfig::with_base_wpm(60_000.0)
        };
        let ports = DispatcherPorts {
            requests: Arc::new(RunRequestUseCase::new(Arc::new(BlankScreen), rotation)),
            replay: Arc::new(ReplayTextUseCase::new(emitter.clone(), config)),
            presentation: presentation_tx,
            events: events_tx,
            select_mode: select_mode.clone(),
        };
        Harness {
            dispatcher: EventDispatcher::new(SharedKeyState::new(), ports),
            presentation,
            events,
            select_mode,
            emitter,
            t0: Instant::now(),
        }
    }

    impl Harness {
        fn at(&self, ms: u64) -> Instant {
            self.t0 + Duration::from_millis(ms)
        }

        fn key_down(&mut self, code: u32, class: KeyClass, ms: u64) -> Vec<LifecycleEffect> {
            let t = KeyTransition::down(KeyCode(code), class, self.at(ms));
            self.dispatcher.step(AgentEvent::Key(t))
        }

        fn pointer(&mut self, kind: PointerKind, x: i32, y: i32, ms: u64) -> Vec<LifecycleEffect> {
            let p = PointerEvent::new(kind, x, y, self.at(ms));
            self.dispatcher.step(AgentEvent::Pointer(p))
        }
    }

    fn count_requests(effects: &[LifecycleEffect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, LifecycleEffect::BeginRequest(_)))
            .count()
    }

    #[test]
    fn test_alt_click_begins_request_with_placeholder() {
        // Arrange
        let mut h = harness();
        h.key_down(VK_LMENU, KeyClass::Alt(KeySide::Left), 0);

        // Act
        let effects = h.pointer(PointerKind::LeftDown, 50, 60, 10);

        // Assert
        assert_eq!(count_requests(&effects), 1);
        assert!(matches!(
            effects[0],
            LifecycleEffect::Present(PresentationUpdate::ShowPlaceholder)
        ));
        assert_eq!(h.dispatcher.lifecycle().state(), RequestState::Capturing);
    }

    #[test]
    fn test_second_click_while_busy_is_ignored() {
        let mut h = harness();
        h.key_down(VK_LMENU, KeyClass::Alt(KeySide::Left), 0);
        let first = h.pointer(PointerKind::LeftDown, 1, 1, 10);
        h.pointer(PointerKind::LeftUp, 1, 1, 20);
        let second = h.pointer(PointerKind::LeftDown, 2, 2, 30);

        assert_eq!(count_requests(&first), 1);
        assert_eq!(count_requests(&second), 0);
    }

    #[test]
    fn test_region_select_toggles_select_mode_flag() {
        let mut h = harness();
        h.key_down(VK_LMENU, KeyClass::Alt(KeySide::Left), 0);
        let armed = h.key_down(VK_LSHIFT, KeyClass::Shift(KeySide::Left), 5);
        assert!(h.select_mode.load(Ordering::Acquire));
        assert!(matches!(
            armed[..],
            [LifecycleEffect::Present(PresentationUpdate::EnterSelectMode)]
        ));

        h.pointer(PointerKind::LeftDown, 0, 0, 10);
        let effects = h.pointer(PointerKind::LeftUp, 4, 4, 20);

        assert!(!h.select_mode.load(Ordering::Acquire));
        assert_eq!(count_requests(&effects), 1);
    }

    #[test]
    fn test_escape_cancels_select_mode() {
        let mut h = harness();
        h.key_down(VK_LMENU, KeyClass::Alt(KeySide::Left), 0);
        h.key_down(VK_LSHIFT, KeyClass::Shift(KeySide::Left), 5);

        let effects = h.key_down(VK_ESCAPE, KeyClass::Escape, 10);

        assert!(!h.select_mode.load(Ordering::Acquire));
        assert!(matches!(
            effects[..],
            [LifecycleEffect::Present(PresentationUpdate::CancelSelectMode)]
        ));
    }

    #[test]
    fn test_stale_worker_report_is_ignored() {
        let mut h = harness();

        let effects = h.dispatcher.step(AgentEvent::Lifecycle(LifecycleEvent::InferenceCompleted {
            request: uuid::Uuid::new_v4(),
            outcome: InferenceOutcome::Answer("late".to_string()),
        }));

        assert!(effects.is_empty());
        assert!(h.dispatcher.lifecycle().history().is_empty());
    }

    #[tokio::test]
    async fn test_execute_runs_request_and_replay_end_to_end() {
        // Arrange
        let mut h = harness();
        let mut pending = h.key_down(VK_LMENU, KeyClass::Alt(KeySide::Left), 0);
        pending.extend(h.pointer(PointerKind::LeftDown, 5, 5, 10));
        h.pointer(PointerKind::LeftUp, 5, 5, 11);
        for effect in pending {
            h.dispatcher.execute(effect);
        }

        // Act: pump worker reports until the answer is displayed.
        while h.dispatcher.lifecycle().state() != RequestState::Displaying {
            let event = tokio::time::timeout(Duration::from_secs(5), h.events.recv())
                .await
                .expect("worker report")
                .expect("channel open");
            for effect in h.dispatcher.step(event) {
                h.dispatcher.execute(effect);
            }
        }
        let replay = h.key_down(VK_OEM_3, KeyClass::ReplayTrigger, 20);
        for effect in replay {
            h.dispatcher.execute(effect);
        }
        let finished = tokio::time::timeout(Duration::from_secs(5), h.events.recv())
            .await
            .expect("replay report")
            .expect("channel open");
        for effect in h.dispatcher.step(finished) {
            h.dispatcher.execute(effect);
        }

        // Assert
        assert_eq!(h.emitter.typed_text(), "hi");
        assert_eq!(h.dispatcher.lifecycle().state(), RequestState::Idle);
        let mut shown = Vec::new();
        while let Ok(update) = h.presentation.try_recv() {
            shown.push(update);
        }
        assert_eq!(
            shown,
            vec![
                PresentationUpdate::ShowPlaceholder,
                PresentationUpdate::ShowResult("hi".to_string()),
                PresentationUpdate::Dismiss,
            ]
        );
    }
}
