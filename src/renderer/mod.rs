//! Rendering module
//!
//! Games draw through the `Painter` trait in immediate mode. The browser
//! build backs it with a Canvas 2D context; headless runs and tests record
//! draw commands into a `DisplayList`.

pub mod display_list;
pub mod shapes;

#[cfg(target_arch = "wasm32")]
pub mod canvas2d;

pub use display_list::{DisplayList, DrawCmd, RecordingSurface, RecordingSurfaceFactory, SurfaceLog};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::sim::Rect;

/// RGBA color (8-bit channels, float alpha like CSS `rgba()`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// CSS color string for the Canvas 2D API
    pub fn css(&self) -> String {
        format!("rgba({},{},{},{:.3})", self.r, self.g, self.b, self.a)
    }
}

/// Shared neon palette
pub mod palette {
    use super::Color;

    pub const BACKDROP: Color = Color::rgb(8, 10, 22);
    pub const SHADE: Color = Color::rgba(0, 0, 0, 0.22);
    pub const GRID: Color = Color::rgba(255, 255, 255, 0.05);
    pub const TEXT: Color = Color::rgba(255, 255, 255, 0.92);
    pub const TEXT_DIM: Color = Color::rgba(255, 255, 255, 0.78);
    pub const CYAN: Color = Color::rgba(0, 255, 255, 0.18);
    pub const PLAYER: Color = Color::rgba(120, 170, 255, 0.95);
    pub const HAZARD: Color = Color::rgba(255, 110, 110, 0.90);
    pub const GOOD_PARTICLE: Color = Color::rgb(160, 220, 255);
    pub const BAD_PARTICLE: Color = Color::rgb(255, 120, 120);
    pub const OVERLAY: Color = Color::rgba(0, 0, 0, 0.35);
}

/// Horizontal text anchoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }
}

/// Immediate-mode 2D drawing in CSS pixels
pub trait Painter {
    fn clear(&mut self, color: Color);
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn fill_round_rect(&mut self, rect: Rect, radius: f32, color: Color);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);
    fn line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color);
    fn text(&mut self, text: &str, pos: Vec2, size: f32, align: TextAlign, color: Color);
}

/// A render target exclusively owned by one game instance
pub trait Surface {
    /// Size in CSS pixels
    fn size(&self) -> (u32, u32);

    /// Painter for the next frame
    fn painter(&mut self) -> &mut dyn Painter;

    /// Called once all draw calls of a frame are issued
    fn present(&mut self) {}

    /// Remove the surface from the page. Must be idempotent.
    fn release(&mut self);

    fn is_released(&self) -> bool;
}

/// Failure to produce a render surface
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("no container element to render into")]
    NoContainer,
    #[error("canvas unavailable: {0}")]
    Canvas(String),
}

/// Allocates surfaces sized to the host's container
pub trait SurfaceFactory {
    fn allocate(&self, width: u32, height: u32) -> Result<Box<dyn Surface>, SurfaceError>;
}
