//! Collision predicates shared by the games
//!
//! Everything in the arcade is an axis-aligned box, a point or a circle, so
//! the predicates stay simple. They are pure functions so each game's update
//! pass can call them without borrowing anything else.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (top-left origin, screen coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle of size `w`×`h` centred on `center`
    pub fn centered(center: Vec2, w: f32, h: f32) -> Self {
        Self::new(center.x - w / 2.0, center.y - h / 2.0, w, h)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Shrink (positive) or grow (negative) on every side
    pub fn inset(&self, by: f32) -> Self {
        Self::new(self.x + by, self.y + by, self.w - by * 2.0, self.h - by * 2.0)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        rect_contains(self, p)
    }
}

/// Strict AABB overlap. Touching edges do not count as a hit.
#[inline]
pub fn rect_overlap(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

/// Inclusive point-in-rectangle test (used for pointer hit testing)
#[inline]
pub fn rect_contains(r: &Rect, p: Vec2) -> bool {
    p.x >= r.x && p.x <= r.right() && p.y >= r.y && p.y <= r.bottom()
}

/// Circle vs rectangle overlap via the closest point on the rectangle
pub fn circle_rect_overlap(center: Vec2, radius: f32, r: &Rect) -> bool {
    let closest = Vec2::new(center.x.clamp(r.x, r.right()), center.y.clamp(r.y, r.bottom()));
    center.distance_squared(closest) < radius * radius
}

/// Check a value produced by the physics step. Non-finite numbers mean the
/// integration blew up and the run can no longer be trusted.
pub fn ensure_finite(value: f32, what: &'static str) -> Result<f32, super::SimError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(super::SimError::NonFinite(what))
    }
}
