//! Gesture recognition.
//!
//! Combines [`ModifierState`] with key edges and pointer events and decides
//! which user gesture, if any, just happened.  Rules are evaluated in priority
//! order:
//!
//! 1. While the Alt+Tab cooldown runs, no new gesture is recognised.  A
//!    region selection already in progress can still be finished or
//!    cancelled, since the pointer hook keeps swallowing clicks until it ends.
//! 2. Escape during a region selection cancels it.
//! 3. The replay-trigger key produces [`Gesture::ReplayTrigger`].
//! 4. Alt going down produces a generic [`Gesture::AltPressed`]; what it means
//!    (dismiss, abort loading, abort typing) is up to the request lifecycle.
//! 5. Alt+Shift with no request in flight enters region select.
//! 6. Alt alone plus a left click with no request in flight captures the
//!    window under the cursor.
//! 7. In region select a left-button drag defines the rectangle; a release
//!    smaller than [`MIN_SELECTION_SIDE`] on either side cancels.
//!
//! The detector also produces the region-select notifications for the
//! presentation surface, since it is the only component that knows where the
//! drag stands.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::domain::events::{KeyDirection, PointerEvent, PointerKind};
use crate::domain::lifecycle::PresentationUpdate;
use crate::domain::modifiers::{KeyEdge, ModifierState};
use crate::keymap::KeyClass;

/// Smallest accepted selection width and height, in device pixels.
pub const MIN_SELECTION_SIDE: u32 = 3;

/// Axis-aligned screen rectangle in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl SelectionRect {
    /// Builds the normalized rectangle spanned by two drag corners.
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        Self {
            x: a.0.min(b.0),
            y: a.1.min(b.1),
            width: a.0.abs_diff(b.0),
            height: a.1.abs_diff(b.1),
        }
    }

    pub fn is_selectable(&self) -> bool {
        self.width >= MIN_SELECTION_SIDE && self.height >= MIN_SELECTION_SIDE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    /// Alt went down; resolved by the lifecycle into one of the three below.
    AltPressed,
    Dismiss,
    AbortLoading,
    AbortTyping,
    CaptureWindowAt { x: i32, y: i32 },
    EnterRegionSelect,
    CancelRegionSelect,
    RegionSelected(SelectionRect),
    ReplayTrigger,
}

/// Facts about the rest of the system the detector needs per event.
#[derive(Debug, Clone, Copy)]
pub struct GestureContext {
    pub request_in_flight: bool,
    pub now: Instant,
}

/// Output of one detector step.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Detection {
    pub gestures: Vec<Gesture>,
    pub notices: Vec<PresentationUpdate>,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty() && self.notices.is_empty()
    }

    fn gesture(mut self, gesture: Gesture) -> Self {
        self.gestures.push(gesture);
        self
    }

    fn notice(mut self, notice: PresentationUpdate) -> Self {
        self.notices.push(notice);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Inactive,
    Armed,
    Dragging { origin: (i32, i32) },
}

pub struct GestureDetector {
    selection: Selection,
}

impl Default for GestureDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureDetector {
    pub fn new() -> Self {
        Self {
            selection: Selection::Inactive,
        }
    }

    /// True from [`Gesture::EnterRegionSelect`] until the selection completes
    /// or is cancelled.
    pub fn is_selecting(&self) -> bool {
        self.selection != Selection::Inactive
    }

    /// Handles a real key edge.
    pub fn on_key(
        &mut self,
        edge: KeyEdge,
        modifiers: &ModifierState,
        ctx: GestureContext,
    ) -> Detection {
        if edge.direction != KeyDirection::Down {
            return Detection::default();
        }
        if edge.class == KeyClass::Escape && self.is_selecting() {
            self.selection = Selection::Inactive;
            return Detection::default()
                .gesture(Gesture::CancelRegionSelect)
                .notice(PresentationUpdate::CancelSelectMode);
        }
        if modifiers.cooldown_active(ctx.now) {
            return Detection::default();
        }

        match edge.class {
            KeyClass::ReplayTrigger => Detection::default().gesture(Gesture::ReplayTrigger),
            KeyClass::Alt(_) => {
                let detection = Detection::default().gesture(Gesture::AltPressed);
                self.try_enter_region_select(detection, modifiers, ctx)
            }
            KeyClass::Shift(_) => self.try_enter_region_select(Detection::default(), modifiers, ctx),
            _ => Detection::default(),
        }
    }

    /// Handles a pointer event.
    pub fn on_pointer(
        &mut self,
        event: &PointerEvent,
        modifiers: &ModifierState,
        ctx: GestureContext,
    ) -> Detection {
        // Outside a selection, pointer input during the cooldown is dropped.
        if modifiers.cooldown_active(ctx.now) && !self.is_selecting() {
            return Detection::default();
        }

        let point = (event.x, event.y);
        match (event.kind, self.selection) {
            (PointerKind::LeftDown, Selection::Armed | Selection::Dragging { .. }) => {
                self.selection = Selection::Dragging { origin: point };
                Detection::default()
            }
            (PointerKind::LeftUp, Selection::Dragging { origin }) => {
                self.selection = Selection::Inactive;
                let rect = SelectionRect::from_corners(origin, point);
                if rect.is_selectable() {
                    Detection::default()
                        .gesture(Gesture::RegionSelected(rect))
                        .notice(PresentationUpdate::SelectionCompleted(rect))
                } else {
                    tracing::debug!(?rect, "selection too small, cancelled");
                    Detection::default().notice(PresentationUpdate::CancelSelectMode)
                }
            }
            (PointerKind::LeftDown, Selection::Inactive)
                if modifiers.alt_down() && !modifiers.shift_down() && !ctx.request_in_flight =>
            {
                Detection::default().gesture(Gesture::CaptureWindowAt {
                    x: event.x,
                    y: event.y,
                })
            }
            _ => Detection::default(),
        }
    }

    fn try_enter_region_select(
        &mut self,
        detection: Detection,
        modifiers: &ModifierState,
        ctx: GestureContext,
    ) -> Detection {
        if modifiers.alt_down()
            && modifiers.shift_down()
            && !ctx.request_in_flight
            && !self.is_selecting()
        {
            self.selection = Selection::Armed;
            detection
                .gesture(Gesture::EnterRegionSelect)
                .notice(PresentationUpdate::EnterSelectMode)
        } else {
            detection
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::KeyTransition;
    use crate::domain::key_state::SharedKeyState;
    use crate::domain::modifiers::ModifierStateMachine;
    use crate::keymap::windows_vk::*;
    use crate::keymap::{KeyCode, KeySide};
    use std::time::Duration;

    struct Rig {
        modifiers: ModifierStateMachine,
        detector: GestureDetector,
        in_flight: bool,
        t0: Instant,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                modifiers: ModifierStateMachine::new(SharedKeyState::new()),
                detector: GestureDetector::new(),
                in_flight: false,
                t0: Instant::now(),
            }
        }

        fn at(&self, ms: u64) -> Instant {
            self.t0 + Duration::from_millis(ms)
        }

        fn key(&mut self, code: u32, class: KeyClass, down: bool, ms: u64) -> Detection {
            let at = self.at(ms);
            let t = if down {
                KeyTransition::down(KeyCode(code), class, at)
            } else {
                KeyTransition::up(KeyCode(code), class, at)
            };
            match self.modifiers.apply(&t) {
                Some(edge) => self.detector.on_key(
                    edge,
                    self.modifiers.state(),
                    GestureContext {
                        request_in_flight: self.in_flight,
                        now: at,
                    },
                ),
                None => Detection::default(),
            }
        }

        fn alt(&mut self, down: bool, ms: u64) -> Detection {
            self.key(VK_LMENU, KeyClass::Alt(KeySide::Left), down, ms)
        }

        fn shift(&mut self, down: bool, ms: u64) -> Detection {
            self.key(VK_LSHIFT, KeyClass::Shift(KeySide::Left), down, ms)
        }

        fn pointer(&mut self, kind: PointerKind, x: i32, y: i32, ms: u64) -> Detection {
            let at = self.at(ms);
            self.detector.on_pointer(
                &PointerEvent::new(kind, x, y, at),
                self.modifiers.state(),
                GestureContext {
                    request_in_flight: self.in_flight,
                    now: at,
                },
            )
        }
    }

    #[test]
    fn test_alt_down_emits_alt_pressed_once() {
        let mut rig = Rig::new();

        let first = rig.alt(true, 0);
        let repeat = rig.alt(true, 30);

        assert_eq!(first.gestures, vec![Gesture::AltPressed]);
        assert!(repeat.is_empty());
    }

    #[test]
    fn test_alt_shift_enters_region_select() {
        let mut rig = Rig::new();
        rig.alt(true, 0);

        let d = rig.shift(true, 10);

        assert_eq!(d.gestures, vec![Gesture::EnterRegionSelect]);
        assert_eq!(d.notices, vec![PresentationUpdate::EnterSelectMode]);
        assert!(rig.detector.is_selecting());
    }

    #[test]
    fn test_shift_then_alt_reports_alt_pressed_before_region_select() {
        let mut rig = Rig::new();
        rig.shift(true, 0);

        let d = rig.alt(true, 10);

        assert_eq!(
            d.gestures,
            vec![Gesture::AltPressed, Gesture::EnterRegionSelect]
        );
    }

    #[test]
    fn test_region_select_not_entered_while_request_in_flight() {
        let mut rig = Rig::new();
        rig.in_flight = true;
        rig.alt(true, 0);

        let d = rig.shift(true, 10);

        assert!(d.gestures.is_empty());
        assert!(!rig.detector.is_selecting());
    }

    #[test]
    fn test_alt_click_captures_window_at_cursor() {
        let mut rig = Rig::new();
        rig.alt(true, 0);

        let d = rig.pointer(PointerKind::LeftDown, 640, 480, 20);

        assert_eq!(d.gestures, vec![Gesture::CaptureWindowAt { x: 640, y: 480 }]);
    }

    #[test]
    fn test_click_without_alt_is_ignored() {
        let mut rig = Rig::new();

        assert!(rig.pointer(PointerKind::LeftDown, 1, 1, 0).is_empty());
    }

    #[test]
    fn test_alt_shift_click_is_not_a_window_capture() {
        let mut rig = Rig::new();
        rig.shift(true, 0);
        rig.alt(true, 5);
        // Leave region select so only rule 6 could apply.
        rig.key(VK_ESCAPE, KeyClass::Escape, true, 8);

        let d = rig.pointer(PointerKind::LeftDown, 5, 5, 10);

        assert!(d.gestures.is_empty());
    }

    #[test]
    fn test_alt_click_ignored_while_request_in_flight() {
        let mut rig = Rig::new();
        rig.in_flight = true;
        rig.alt(true, 0);

        assert!(rig.pointer(PointerKind::LeftDown, 5, 5, 10).is_empty());
    }

    #[test]
    fn test_drag_of_four_pixels_selects_region() {
        let mut rig = Rig::new();
        rig.alt(true, 0);
        rig.shift(true, 0);

        rig.pointer(PointerKind::LeftDown, 10, 10, 10);
        rig.pointer(PointerKind::Move, 12, 12, 15);
        let d = rig.pointer(PointerKind::LeftUp, 14, 14, 20);

        let rect = SelectionRect {
            x: 10,
            y: 10,
            width: 4,
            height: 4,
        };
        assert_eq!(d.gestures, vec![Gesture::RegionSelected(rect)]);
        assert_eq!(d.notices, vec![PresentationUpdate::SelectionCompleted(rect)]);
        assert!(!rig.detector.is_selecting());
    }

    #[test]
    fn test_zero_size_drag_cancels_without_gesture() {
        let mut rig = Rig::new();
        rig.alt(true, 0);
        rig.shift(true, 0);

        rig.pointer(PointerKind::LeftDown, 10, 10, 10);
        let d = rig.pointer(PointerKind::LeftUp, 10, 10, 20);

        assert!(d.gestures.is_empty());
        assert_eq!(d.notices, vec![PresentationUpdate::CancelSelectMode]);
        assert!(!rig.detector.is_selecting());
    }

    #[test]
    fn test_reverse_drag_is_normalized() {
        let rect = SelectionRect::from_corners((50, 40), (20, 10));

        assert_eq!(
            rect,
            SelectionRect {
                x: 20,
                y: 10,
                width: 30,
                height: 30
            }
        );
    }

    #[test]
    fn test_thin_selection_is_not_selectable() {
        assert!(!SelectionRect::from_corners((0, 0), (100, 2)).is_selectable());
        assert!(SelectionRect::from_corners((0, 0), (3, 3)).is_selectable());
    }

    #[test]
    fn test_escape_cancels_region_select() {
        let mut rig = Rig::new();
        rig.alt(true, 0);
        rig.shift(true, 0);

        let d = rig.key(VK_ESCAPE, KeyClass::Escape, true, 10);

        assert_eq!(d.gestures, vec![Gesture::CancelRegionSelect]);
        assert!(!rig.detector.is_selecting());
    }

    #[test]
    fn test_escape_outside_region_select_does_nothing() {
        let mut rig = Rig::new();

        assert!(rig.key(VK_ESCAPE, KeyClass::Escape, true, 0).is_empty());
    }

    #[test]
    fn test_replay_trigger_ignores_modifiers() {
        let mut rig = Rig::new();
        rig.shift(true, 0);

        let d = rig.key(VK_OEM_3, KeyClass::ReplayTrigger, true, 10);

        assert_eq!(d.gestures, vec![Gesture::ReplayTrigger]);
    }

    #[test]
    fn test_alt_tab_cooldown_suppresses_gestures_then_resumes() {
        let mut rig = Rig::new();
        rig.alt(true, 0);
        rig.key(VK_TAB, KeyClass::Tab, true, 50);
        rig.key(VK_TAB, KeyClass::Tab, false, 100);

        let during_shift = rig.shift(true, 300);
        rig.shift(false, 400);
        let during_click = rig.pointer(PointerKind::LeftDown, 1, 1, 500);
        let after_click = rig.pointer(PointerKind::LeftDown, 1, 1, 900);

        assert!(during_shift.is_empty());
        assert!(during_click.is_empty());
        assert_eq!(
            after_click.gestures,
            vec![Gesture::CaptureWindowAt { x: 1, y: 1 }]
        );
    }

    #[test]
    fn test_selection_completes_when_cooldown_starts_mid_drag() {
        // Arrange
        let mut rig = Rig::new();
        rig.alt(true, 0);
        rig.shift(true, 0);
        rig.pointer(PointerKind::LeftDown, 10, 10, 20);
        rig.key(VK_TAB, KeyClass::Tab, true, 50);

        // Act
        let d = rig.pointer(PointerKind::LeftUp, 30, 30, 100);

        // Assert
        assert!(rig.modifiers.state().cooldown_active(rig.at(100)));
        let rect = SelectionRect::from_corners((10, 10), (30, 30));
        assert_eq!(d.gestures, vec![Gesture::RegionSelected(rect)]);
        assert!(!rig.detector.is_selecting());
    }

    #[test]
    fn test_escape_cancels_selection_during_cooldown() {
        let mut rig = Rig::new();
        rig.alt(true, 0);
        rig.shift(true, 0);
        rig.key(VK_TAB, KeyClass::Tab, true, 50);

        let d = rig.key(VK_ESCAPE, KeyClass::Escape, true, 100);

        assert_eq!(d.gestures, vec![Gesture::CancelRegionSelect]);
        assert_eq!(d.notices, vec![PresentationUpdate::CancelSelectMode]);
        assert!(!rig.detector.is_selecting());
    }

    #[test]
    fn test_cooldown_still_blocks_new_gestures_while_selecting() {
        let mut rig = Rig::new();
        rig.alt(true, 0);
        rig.shift(true, 0);
        rig.key(VK_TAB, KeyClass::Tab, true, 50);

        let trigger = rig.key(VK_OEM_3, KeyClass::ReplayTrigger, true, 100);

        assert!(trigger.is_empty());
        assert!(rig.detector.is_selecting());
    }
}
