//! Frame clock: per-frame callbacks, clamped delta time and FPS
//!
//! The platform supplies a `FrameScheduler` (requestAnimationFrame in the
//! browser, `ManualScheduler` headless). `FrameClock` keeps at most one frame
//! pending and turns raw timestamps into a clamped step.

use std::cell::RefCell;
use std::rc::Rc;

use crate::consts::MAX_FRAME_DT;

/// Identifies a requested frame so it can be cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Runs once with the frame timestamp in milliseconds
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Host of per-frame callbacks
pub trait FrameScheduler {
    /// Current monotonic time in milliseconds
    fn now(&self) -> f64;

    /// Run `callback` before the next repaint
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle;

    /// Drop a pending request. Unknown or already-fired handles are ignored.
    fn cancel_frame(&self, handle: FrameHandle);
}

/// Convert a raw timestamp gap (ms) into a step in seconds, clamped to
/// `[0, max_dt]`. Non-finite gaps count as zero.
pub fn clamp_dt(gap_ms: f64, max_dt: f32) -> f32 {
    let secs = (gap_ms / 1000.0) as f32;
    if !secs.is_finite() {
        return 0.0;
    }
    secs.clamp(0.0, max_dt)
}

/// Owns the pending frame of one game instance
pub struct FrameClock {
    scheduler: Rc<dyn FrameScheduler>,
    pending: Option<FrameHandle>,
    last_time: Option<f64>,
    max_dt: f32,
}

impl FrameClock {
    pub fn new(scheduler: Rc<dyn FrameScheduler>) -> Self {
        Self {
            scheduler,
            pending: None,
            last_time: None,
            max_dt: MAX_FRAME_DT,
        }
    }

    pub fn now(&self) -> f64 {
        self.scheduler.now()
    }

    /// Request the next frame, replacing any request still pending
    pub fn schedule(&mut self, callback: FrameCallback) {
        self.cancel();
        self.pending = Some(self.scheduler.request_frame(callback));
    }

    /// Cancel the pending frame. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                self.scheduler.cancel_frame(handle);
                true
            }
            None => false,
        }
    }

    /// Called from inside a frame callback: that request is spent
    pub fn mark_fired(&mut self) {
        self.pending = None;
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Start measuring from `now`; the next `tick` is relative to it
    pub fn restart_at(&mut self, now: f64) {
        self.last_time = Some(now);
    }

    /// Clamped seconds since the previous tick (zero on the first)
    pub fn tick(&mut self, now: f64) -> f32 {
        let dt = match self.last_time {
            Some(last) => clamp_dt(now - last, self.max_dt),
            None => 0.0,
        };
        self.last_time = Some(now);
        dt
    }
}

impl Drop for FrameClock {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Frames per second over the last 60 frame timestamps
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frame_times: [f64; 60],
    frame_index: usize,
    filled: usize,
    fps: u32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self {
            frame_times: [0.0; 60],
            frame_index: 0,
            filled: 0,
            fps: 0,
        }
    }
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, time: f64) {
        self.frame_times[self.frame_index] = time;
        self.frame_index = (self.frame_index + 1) % 60;
        self.filled = (self.filled + 1).min(60);

        // Oldest sample sits at the next write position once the ring is full
        if self.filled == 60 {
            let elapsed = time - self.frame_times[self.frame_index];
            if elapsed > 0.0 {
                self.fps = (59_000.0 / elapsed).round() as u32;
            }
        }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Default)]
struct ManualState {
    now: f64,
    next_id: u64,
    pending: Vec<(FrameHandle, FrameCallback)>,
    cancelled: Vec<FrameCallback>,
}

/// Deterministic scheduler driven by explicit `advance` calls
#[derive(Default)]
pub struct ManualScheduler {
    state: RefCell<ManualState>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now: f64) -> Self {
        let scheduler = Self::default();
        scheduler.state.borrow_mut().now = now;
        scheduler
    }

    /// Number of requests waiting for the next `advance`
    pub fn pending(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Move time forward by `ms` and run everything that was pending.
    /// Requests made by those callbacks wait for the next advance.
    pub fn advance(&self, ms: f64) -> usize {
        let (now, due) = {
            let mut state = self.state.borrow_mut();
            state.now += ms;
            (state.now, std::mem::take(&mut state.pending))
        };
        let count = due.len();
        for (_, callback) in due {
            callback(now);
        }
        count
    }

    /// Advance `frames` times by `ms` each
    pub fn run_frames(&self, frames: usize, ms: f64) {
        for _ in 0..frames {
            self.advance(ms);
        }
    }

    /// Run callbacks that were cancelled, as a browser might for a frame
    /// that was already queued when it got cancelled
    pub fn fire_cancelled(&self) -> usize {
        let (now, stale) = {
            let mut state = self.state.borrow_mut();
            (state.now, std::mem::take(&mut state.cancelled))
        };
        let count = stale.len();
        for callback in stale {
            callback(now);
        }
        count
    }
}

impl FrameScheduler for ManualScheduler {
    fn now(&self) -> f64 {
        self.state.borrow().now
    }

    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let handle = FrameHandle(state.next_id);
        state.pending.push((handle, callback));
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        let mut state = self.state.borrow_mut();
        if let Some(i) = state.pending.iter().position(|(h, _)| *h == handle) {
            let (_, callback) = state.pending.remove(i);
            state.cancelled.push(callback);
        }
    }
}
