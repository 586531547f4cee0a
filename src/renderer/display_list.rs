//! Recorded draw commands for headless runs and tests

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;

use super::{Color, Painter, Surface, SurfaceError, SurfaceFactory, TextAlign};
use crate::sim::Rect;

/// One recorded draw call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Clear(Color),
    Rect { rect: Rect, color: Color },
    RoundRect { rect: Rect, radius: f32, color: Color },
    Circle { center: Vec2, radius: f32, color: Color },
    Line { from: Vec2, to: Vec2, width: f32, color: Color },
    Text { text: String, pos: Vec2, size: f32, align: TextAlign, color: Color },
}

/// A painter that records instead of drawing
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    pub cmds: Vec<DrawCmd>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_cmds(&mut self) {
        self.cmds.clear();
    }

    /// All text drawn this frame, in order
    pub fn texts(&self) -> Vec<&str> {
        self.cmds
            .iter()
            .filter_map(|c| match c {
                DrawCmd::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().iter().any(|t| t.contains(needle))
    }

    /// Index of the first command matching `pred`
    pub fn position(&self, pred: impl Fn(&DrawCmd) -> bool) -> Option<usize> {
        self.cmds.iter().position(pred)
    }
}

impl Painter for DisplayList {
    fn clear(&mut self, color: Color) {
        self.cmds.push(DrawCmd::Clear(color));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.cmds.push(DrawCmd::Rect { rect, color });
    }

    fn fill_round_rect(&mut self, rect: Rect, radius: f32, color: Color) {
        self.cmds.push(DrawCmd::RoundRect { rect, radius, color });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.cmds.push(DrawCmd::Circle { center, radius, color });
    }

    fn line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color) {
        self.cmds.push(DrawCmd::Line {
            from,
            to,
            width,
            color,
        });
    }

    fn text(&mut self, text: &str, pos: Vec2, size: f32, align: TextAlign, color: Color) {
        self.cmds.push(DrawCmd::Text {
            text: text.to_string(),
            pos,
            size,
            align,
            color,
        });
    }
}

#[derive(Debug, Default)]
struct Recorded {
    last_frame: DisplayList,
    frames: u64,
    released: bool,
}

/// Read-only view into a `RecordingSurface` after it was handed to a game
#[derive(Debug, Clone)]
pub struct SurfaceLog {
    shared: Rc<RefCell<Recorded>>,
}

impl SurfaceLog {
    /// Number of frames presented so far
    pub fn frames(&self) -> u64 {
        self.shared.borrow().frames
    }

    pub fn is_released(&self) -> bool {
        self.shared.borrow().released
    }

    /// Commands of the most recently presented frame
    pub fn last_frame(&self) -> DisplayList {
        self.shared.borrow().last_frame.clone()
    }
}

/// Headless surface: keeps the last presented frame for inspection
#[derive(Debug)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    current: DisplayList,
    shared: Rc<RefCell<Recorded>>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> (Self, SurfaceLog) {
        let shared = Rc::new(RefCell::new(Recorded::default()));
        let screen = SurfaceLog {
            shared: shared.clone(),
        };
        (
            Self {
                width,
                height,
                current: DisplayList::new(),
                shared,
            },
            screen,
        )
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn painter(&mut self) -> &mut dyn Painter {
        &mut self.current
    }

    fn present(&mut self) {
        let mut shared = self.shared.borrow_mut();
        shared.last_frame = std::mem::take(&mut self.current);
        shared.frames += 1;
    }

    fn release(&mut self) {
        self.shared.borrow_mut().released = true;
        self.current.clear_cmds();
    }

    fn is_released(&self) -> bool {
        self.shared.borrow().released
    }
}

/// Hands out `RecordingSurface`s and remembers their logs
#[derive(Debug, Default)]
pub struct RecordingSurfaceFactory {
    logs: RefCell<Vec<SurfaceLog>>,
}

impl RecordingSurfaceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs of every surface allocated so far, oldest first
    pub fn logs(&self) -> Vec<SurfaceLog> {
        self.logs.borrow().clone()
    }

    pub fn allocated(&self) -> usize {
        self.logs.borrow().len()
    }

    /// Surfaces not yet released
    pub fn live(&self) -> usize {
        self.logs.borrow().iter().filter(|p| !p.is_released()).count()
    }
}

impl SurfaceFactory for RecordingSurfaceFactory {
    fn allocate(&self, width: u32, height: u32) -> Result<Box<dyn Surface>, SurfaceError> {
        let (surface, screen) = RecordingSurface::new(width, height);
        self.logs.borrow_mut().push(screen);
        Ok(Box::new(surface))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_present_moves_frame_to_log() {
        let (mut surface, screen) = RecordingSurface::new(100, 50);
        surface.painter().clear(Color::rgb(0, 0, 0));
        surface
            .painter()
            .text("hi", Vec2::ZERO, 12.0, TextAlign::Left, Color::rgb(255, 255, 255));
        assert_eq!(screen.frames(), 0);

        surface.present();
        assert_eq!(screen.frames(), 1);
        assert_eq!(screen.last_frame().cmds.len(), 2);
        assert!(screen.last_frame().contains_text("hi"));
    }

    #[test]
    fn test_release_is_idempotent() {
        let (mut surface, screen) = RecordingSurface::new(10, 10);
        surface.release();
        surface.release();
        assert!(surface.is_released());
        assert!(screen.is_released());
    }

    #[test]
    fn test_factory_tracks_live_surfaces() {
        let factory = RecordingSurfaceFactory::new();
        let mut a = factory.allocate(10, 10).unwrap();
        let _b = factory.allocate(10, 10).unwrap();
        assert_eq!(factory.live(), 2);
        a.release();
        assert_eq!(factory.live(), 1);
        assert_eq!(factory.allocated(), 2);
    }
}
