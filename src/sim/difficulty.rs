//! Bounded difficulty curves
//!
//! Every game ramps something (spawn rate, speed, tolerance window) with
//! survived time or successful events. A `Ramp` keeps that monotonic and
//! clamped so a long run never becomes unplayable or collapses to zero.

use serde::{Deserialize, Serialize};

/// Linear ramp `base + per_unit * x`, clamped to `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ramp {
    pub base: f32,
    pub per_unit: f32,
    pub min: f32,
    pub max: f32,
}

impl Ramp {
    pub const fn new(base: f32, per_unit: f32, min: f32, max: f32) -> Self {
        Self {
            base,
            per_unit,
            min,
            max,
        }
    }

    /// Value of the curve after `x` units (seconds, hits, rounds...)
    pub fn at(&self, x: f32) -> f32 {
        (self.base + self.per_unit * x.max(0.0)).clamp(self.min, self.max)
    }
}

/// Fractional accumulator for "points per second" survival scoring.
///
/// Frames are short enough that `floor(rate * dt)` is usually zero, so the
/// remainder is carried between frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SurvivalScore {
    carry: f32,
}

impl SurvivalScore {
    pub fn reset(&mut self) {
        self.carry = 0.0;
    }

    /// Advance by `dt` seconds at `rate` points per second; returns whole points earned
    pub fn advance(&mut self, rate: f32, dt: f32) -> u64 {
        self.carry += rate * dt.max(0.0);
        let whole = self.carry.floor();
        self.carry -= whole;
        whole as u64
    }
}
