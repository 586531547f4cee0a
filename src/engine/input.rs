//! Input adapter: keyboard and pointer events to game intents
//!
//! Platform listeners feed raw events (DOM key codes, pointer positions) into
//! an `InputAdapter`. The game loop drains it once per frame into an
//! `InputFrame` holding "held" flags and edge-triggered presses.
//!
//! Listener lifetime is tied to a `ListenerGuard`: dropping the guard removes
//! the listeners, so every exit path of a run releases them.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::SWIPE_MIN_PX;

/// Discrete things a player can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    Primary,
    Secondary,
    Pause,
    /// Numbered choice (0-based), e.g. Simon pads
    Slot(u8),
}

/// Number of numbered slots tracked
pub const SLOT_COUNT: usize = 4;
const INTENT_COUNT: usize = 7 + SLOT_COUNT;

/// Presses buffered between frames beyond this are dropped
const MAX_PENDING_PRESSES: usize = 32;

impl Intent {
    /// Map a DOM `KeyboardEvent.code` to an intent
    pub fn from_key_code(code: &str) -> Option<Intent> {
        let intent = match code {
            "ArrowLeft" | "KeyA" => Intent::MoveLeft,
            "ArrowRight" | "KeyD" => Intent::MoveRight,
            "ArrowUp" | "KeyW" => Intent::MoveUp,
            "ArrowDown" | "KeyS" => Intent::MoveDown,
            "Space" | "Enter" => Intent::Primary,
            "ShiftLeft" | "ShiftRight" | "KeyX" => Intent::Secondary,
            "Escape" | "KeyP" => Intent::Pause,
            "Digit1" | "Numpad1" => Intent::Slot(0),
            "Digit2" | "Numpad2" => Intent::Slot(1),
            "Digit3" | "Numpad3" => Intent::Slot(2),
            "Digit4" | "Numpad4" => Intent::Slot(3),
            _ => return None,
        };
        Some(intent)
    }

    fn index(&self) -> Option<usize> {
        match *self {
            Intent::MoveLeft => Some(0),
            Intent::MoveRight => Some(1),
            Intent::MoveUp => Some(2),
            Intent::MoveDown => Some(3),
            Intent::Primary => Some(4),
            Intent::Secondary => Some(5),
            Intent::Pause => Some(6),
            Intent::Slot(n) if (n as usize) < SLOT_COUNT => Some(7 + n as usize),
            Intent::Slot(_) => None,
        }
    }

    /// Keys whose default browser action (scrolling) should be suppressed
    pub fn blocks_default(&self) -> bool {
        !matches!(self, Intent::Pause)
    }
}

/// Pointer position and button state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    pub pos: Option<Vec2>,
    pub down: bool,
}

/// Input snapshot consumed by one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputFrame {
    held: [bool; INTENT_COUNT],
    /// Intents that went down since the previous frame, in order
    pub pressed: Vec<Intent>,
    /// Pointer press positions since the previous frame
    pub taps: Vec<Vec2>,
    pub pointer: PointerState,
}

impl InputFrame {
    /// Frame with a single fresh press (tests, scripted demo input)
    pub fn pressed(intent: Intent) -> Self {
        let mut frame = Self::default();
        frame.pressed.push(intent);
        frame
    }

    /// Frame with an intent held down but no fresh presses
    pub fn holding(intent: Intent) -> Self {
        let mut frame = Self::default();
        if let Some(i) = intent.index() {
            frame.held[i] = true;
        }
        frame
    }

    /// Frame with a pointer tap at `pos` (also a Primary press)
    pub fn tap(pos: Vec2) -> Self {
        let mut frame = Self::pressed(Intent::Primary);
        frame.taps.push(pos);
        frame.pointer.pos = Some(pos);
        frame
    }

    pub fn held(&self, intent: Intent) -> bool {
        intent.index().is_some_and(|i| self.held[i])
    }

    pub fn just_pressed(&self, intent: Intent) -> bool {
        self.pressed.contains(&intent)
    }

    /// Any press other than pause (used to leave the start screen)
    pub fn any_pressed(&self) -> bool {
        self.pressed.iter().any(|i| *i != Intent::Pause)
    }

    /// Horizontal axis from held left/right: -1, 0 or 1
    pub fn axis_x(&self) -> f32 {
        let mut dir = 0.0;
        if self.held(Intent::MoveLeft) {
            dir -= 1.0;
        }
        if self.held(Intent::MoveRight) {
            dir += 1.0;
        }
        dir
    }
}

/// Accumulates platform events between frames
#[derive(Debug, Clone, Default)]
pub struct InputAdapter {
    attached: bool,
    held: [bool; INTENT_COUNT],
    pressed: Vec<Intent>,
    taps: Vec<Vec2>,
    pointer: PointerState,
    swipe_start: Option<Vec2>,
}

impl InputAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Start accepting events. Returns false if already attached.
    pub fn attach(&mut self) -> bool {
        if self.attached {
            return false;
        }
        self.attached = true;
        true
    }

    /// Stop accepting events and forget everything pending.
    /// Returns false if already detached.
    pub fn detach(&mut self) -> bool {
        if !self.attached {
            return false;
        }
        *self = Self::default();
        true
    }

    /// Key went down. Returns the intent if this was a fresh press
    /// (auto-repeat of a held key returns `None`).
    pub fn key_down(&mut self, code: &str) -> Option<Intent> {
        let intent = Intent::from_key_code(code)?;
        self.press(intent).then_some(intent)
    }

    pub fn key_up(&mut self, code: &str) {
        if let Some(intent) = Intent::from_key_code(code) {
            self.release(intent);
        }
    }

    /// Mark `intent` held; records an edge if it was not held already
    pub fn press(&mut self, intent: Intent) -> bool {
        if !self.attached {
            return false;
        }
        let Some(i) = intent.index() else {
            return false;
        };
        if self.held[i] {
            return false;
        }
        self.held[i] = true;
        self.push_press(intent);
        true
    }

    pub fn release(&mut self, intent: Intent) {
        if !self.attached {
            return;
        }
        if let Some(i) = intent.index() {
            self.held[i] = false;
        }
    }

    /// Pointer pressed: a Primary press plus a tap at `pos`
    pub fn pointer_down(&mut self, pos: Vec2) {
        if !self.attached {
            return;
        }
        self.pointer = PointerState {
            pos: Some(pos),
            down: true,
        };
        self.swipe_start = Some(pos);
        if self.taps.len() < MAX_PENDING_PRESSES {
            self.taps.push(pos);
        }
        self.push_press(Intent::Primary);
    }

    pub fn pointer_move(&mut self, pos: Vec2) {
        if !self.attached {
            return;
        }
        self.pointer.pos = Some(pos);
    }

    /// Pointer released; a long enough drag becomes a move intent
    pub fn pointer_up(&mut self, pos: Vec2) {
        if !self.attached {
            return;
        }
        self.pointer = PointerState {
            pos: Some(pos),
            down: false,
        };
        let Some(start) = self.swipe_start.take() else {
            return;
        };
        if let Some(dir) = swipe_intent(pos - start) {
            self.push_press(dir);
        }
    }

    /// Pause request from the platform (window blur, tab hidden). Keys held
    /// at that moment never see their keyup, so everything is let go.
    pub fn request_pause(&mut self) {
        if !self.attached {
            return;
        }
        self.release_all();
        if !self.pressed.contains(&Intent::Pause) {
            self.push_press(Intent::Pause);
        }
    }

    /// Drop held flags and any pointer drag in progress; pending edges stay
    pub fn release_all(&mut self) {
        self.held = [false; INTENT_COUNT];
        self.pointer.down = false;
        self.swipe_start = None;
    }

    /// Drain edges into a snapshot; held flags carry over
    pub fn take_frame(&mut self) -> InputFrame {
        InputFrame {
            held: self.held,
            pressed: std::mem::take(&mut self.pressed),
            taps: std::mem::take(&mut self.taps),
            pointer: self.pointer,
        }
    }

    fn push_press(&mut self, intent: Intent) {
        if self.pressed.len() < MAX_PENDING_PRESSES {
            self.pressed.push(intent);
        }
    }
}

/// Dominant-axis direction of a drag, if it is long enough to count
pub fn swipe_intent(delta: Vec2) -> Option<Intent> {
    if delta.x.abs() < SWIPE_MIN_PX && delta.y.abs() < SWIPE_MIN_PX {
        return None;
    }
    let intent = if delta.x.abs() > delta.y.abs() {
        if delta.x > 0.0 {
            Intent::MoveRight
        } else {
            Intent::MoveLeft
        }
    } else if delta.y > 0.0 {
        Intent::MoveDown
    } else {
        Intent::MoveUp
    };
    Some(intent)
}

/// Where platform listeners deliver events. Weak so a late event after
/// teardown finds nothing to write to.
pub type InputSink = Weak<RefCell<InputAdapter>>;

/// Removes platform listeners when dropped
pub struct ListenerGuard {
    detach: Option<Box<dyn FnOnce()>>,
}

impl ListenerGuard {
    pub fn new(detach: impl FnOnce() + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Guard for sources with nothing to remove
    pub fn noop() -> Self {
        Self { detach: None }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for ListenerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerGuard")
            .field("armed", &self.detach.is_some())
            .finish()
    }
}

/// Platform side of input: installs listeners that feed a sink
pub trait InputSource {
    fn attach(&self, sink: InputSink) -> ListenerGuard;
}

/// Source with no listeners; input is pushed into the adapter directly
#[derive(Debug, Default)]
pub struct NullInputSource;

impl InputSource for NullInputSource {
    fn attach(&self, _sink: InputSink) -> ListenerGuard {
        ListenerGuard::noop()
    }
}

/// Headless source that counts live listener sets and can replay events
/// into the last attached sink, like a DOM handler firing late
#[derive(Debug, Default)]
pub struct CountingInputSource {
    active: Rc<Cell<usize>>,
    attaches: Cell<usize>,
    last_sink: RefCell<Option<InputSink>>,
}

impl CountingInputSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener sets currently installed
    pub fn active(&self) -> usize {
        self.active.get()
    }

    /// Total number of attach calls
    pub fn attaches(&self) -> usize {
        self.attaches.get()
    }

    /// Deliver a key press the way a platform handler would
    pub fn emit_key_down(&self, code: &str) -> bool {
        self.with_sink(|adapter| adapter.key_down(code).is_some())
    }

    pub fn emit_key_up(&self, code: &str) {
        self.with_sink(|adapter| adapter.key_up(code));
    }

    pub fn emit_pointer_down(&self, pos: Vec2) {
        self.with_sink(|adapter| adapter.pointer_down(pos));
    }

    fn with_sink<T: Default>(&self, f: impl FnOnce(&mut InputAdapter) -> T) -> T {
        let sink = self.last_sink.borrow().as_ref().and_then(Weak::upgrade);
        match sink {
            Some(adapter) => f(&mut adapter.borrow_mut()),
            None => T::default(),
        }
    }
}

impl InputSource for CountingInputSource {
    fn attach(&self, sink: InputSink) -> ListenerGuard {
        self.active.set(self.active.get() + 1);
        self.attaches.set(self.attaches.get() + 1);
        *self.last_sink.borrow_mut() = Some(sink);
        let active = self.active.clone();
        ListenerGuard::new(move || active.set(active.get().saturating_sub(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attached() -> InputAdapter {
        let mut a = InputAdapter::new();
        a.attach();
        a
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(Intent::from_key_code("ArrowLeft"), Some(Intent::MoveLeft));
        assert_eq!(Intent::from_key_code("KeyD"), Some(Intent::MoveRight));
        assert_eq!(Intent::from_key_code("Space"), Some(Intent::Primary));
        assert_eq!(Intent::from_key_code("ShiftLeft"), Some(Intent::Secondary));
        assert_eq!(Intent::from_key_code("Escape"), Some(Intent::Pause));
        assert_eq!(Intent::from_key_code("Numpad3"), Some(Intent::Slot(2)));
        assert_eq!(Intent::from_key_code("KeyQ"), None);
    }

    #[test]
    fn test_press_is_edge_triggered() {
        let mut a = attached();
        assert_eq!(a.key_down("Space"), Some(Intent::Primary));
        // Auto-repeat while held
        assert_eq!(a.key_down("Space"), None);
        let frame = a.take_frame();
        assert_eq!(frame.pressed, vec![Intent::Primary]);
        assert!(frame.held(Intent::Primary));

        // Still held next frame, but no new edge
        let frame = a.take_frame();
        assert!(frame.pressed.is_empty());
        assert!(frame.held(Intent::Primary));

        a.key_up("Space");
        let frame = a.take_frame();
        assert!(!frame.held(Intent::Primary));
        assert_eq!(a.key_down("Space"), Some(Intent::Primary));
    }

    #[test]
    fn test_events_ignored_when_detached() {
        let mut a = InputAdapter::new();
        assert_eq!(a.key_down("ArrowLeft"), None);
        a.pointer_down(Vec2::new(5.0, 5.0));
        let frame = a.take_frame();
        assert!(frame.pressed.is_empty());
        assert!(frame.taps.is_empty());
        assert!(!frame.held(Intent::MoveLeft));
    }

    #[test]
    fn test_attach_is_idempotent_and_detach_clears() {
        let mut a = InputAdapter::new();
        assert!(a.attach());
        assert!(!a.attach());
        a.key_down("ArrowRight");
        assert!(a.detach());
        assert!(!a.detach());
        a.attach();
        let frame = a.take_frame();
        assert!(!frame.held(Intent::MoveRight));
        assert!(frame.pressed.is_empty());
    }

    #[test]
    fn test_pointer_tap_and_swipe() {
        let mut a = attached();
        a.pointer_down(Vec2::new(100.0, 100.0));
        a.pointer_up(Vec2::new(100.0, 160.0));
        let frame = a.take_frame();
        assert_eq!(frame.pressed, vec![Intent::Primary, Intent::MoveDown]);
        assert_eq!(frame.taps, vec![Vec2::new(100.0, 100.0)]);
        assert!(!frame.pointer.down);
    }

    #[test]
    fn test_short_drag_is_not_a_swipe() {
        let mut a = attached();
        a.pointer_down(Vec2::new(0.0, 0.0));
        a.pointer_up(Vec2::new(10.0, -12.0));
        assert_eq!(a.take_frame().pressed, vec![Intent::Primary]);
    }

    #[test]
    fn test_swipe_dominant_axis() {
        assert_eq!(swipe_intent(Vec2::new(-40.0, 10.0)), Some(Intent::MoveLeft));
        assert_eq!(swipe_intent(Vec2::new(5.0, -30.0)), Some(Intent::MoveUp));
        assert_eq!(swipe_intent(Vec2::new(3.0, 3.0)), None);
    }

    #[test]
    fn test_pending_presses_are_bounded() {
        let mut a = attached();
        for _ in 0..100 {
            a.press(Intent::Primary);
            a.release(Intent::Primary);
        }
        assert_eq!(a.take_frame().pressed.len(), MAX_PENDING_PRESSES);
    }

    #[test]
    fn test_pause_request_deduplicates() {
        let mut a = attached();
        a.request_pause();
        a.request_pause();
        assert_eq!(a.take_frame().pressed, vec![Intent::Pause]);
    }

    #[test]
    fn test_pause_request_releases_held_input() {
        let mut a = attached();
        a.key_down("ArrowRight");
        a.pointer_down(Vec2::new(10.0, 10.0));
        a.request_pause();

        let frame = a.take_frame();
        assert_eq!(frame.pressed, vec![Intent::MoveRight, Intent::Primary, Intent::Pause]);
        assert!(!frame.held(Intent::MoveRight));
        assert!(!frame.pointer.down);

        // The drag that started before the blur is not a swipe
        a.pointer_up(Vec2::new(200.0, 10.0));
        assert!(a.take_frame().pressed.is_empty());

        // Pressing again after focus returns is a fresh edge
        assert_eq!(a.key_down("ArrowRight"), Some(Intent::MoveRight));
    }

    #[test]
    fn test_axis() {
        let mut a = attached();
        a.key_down("KeyA");
        assert_eq!(a.take_frame().axis_x(), -1.0);
        a.key_down("KeyD");
        assert_eq!(a.take_frame().axis_x(), 0.0);
        a.key_up("KeyA");
        assert_eq!(a.take_frame().axis_x(), 1.0);
    }

    #[test]
    fn test_guard_detaches_on_drop() {
        let source = CountingInputSource::new();
        let adapter = Rc::new(RefCell::new(InputAdapter::new()));
        let guard = source.attach(Rc::downgrade(&adapter));
        assert_eq!(source.active(), 1);
        drop(guard);
        assert_eq!(source.active(), 0);
        assert_eq!(source.attaches(), 1);
    }

    #[test]
    fn test_late_event_after_adapter_dropped_is_noop() {
        let source = CountingInputSource::new();
        let adapter = Rc::new(RefCell::new(InputAdapter::new()));
        let _guard = source.attach(Rc::downgrade(&adapter));
        drop(adapter);
        assert!(!source.emit_key_down("Space"));
    }
}
