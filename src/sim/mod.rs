//! Simulation contract and shared gameplay helpers
//!
//! A game's rules live behind the `Simulation` trait. The engine calls it
//! once per frame with a `Step` carrying the clamped delta time, the input
//! snapshot and the shared effect systems. Rules must stay free of platform
//! calls:
//! - Delta time comes from the step only
//! - Randomness comes from the seeded RNG in the step only
//! - Game over goes through the step; the score is read back after each update

pub mod collision;
pub mod difficulty;
pub mod particles;

pub use collision::{Rect, circle_rect_overlap, ensure_finite, rect_contains, rect_overlap};
pub use difficulty::{Ramp, SurvivalScore};
pub use particles::{Lifetime, Particle, ParticleSystem, Valence};

use std::collections::BTreeMap;

use rand_pcg::Pcg32;
use thiserror::Error;

use crate::audio::SoundCue;
use crate::engine::input::InputFrame;
use crate::renderer::{Painter, shapes};

/// Errors a simulation can raise from its update pass. Any of these ends the
/// run with a generic game-over reason.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
    #[error("inconsistent state: {0}")]
    InvalidState(String),
}

/// Size of the play field in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Something a simulation reported during a step
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    GameOver {
        reason: String,
        meta: BTreeMap<String, serde_json::Value>,
    },
    Sound(SoundCue),
}

/// Everything a simulation may touch during one frame
pub struct Step<'a> {
    /// Clamped delta time in seconds
    pub dt: f32,
    /// Frame timestamp in milliseconds
    pub time_ms: f64,
    pub input: &'a InputFrame,
    pub particles: &'a mut ParticleSystem,
    pub rng: &'a mut Pcg32,
    events: &'a mut Vec<SimEvent>,
}

impl<'a> Step<'a> {
    pub fn new(
        dt: f32,
        time_ms: f64,
        input: &'a InputFrame,
        particles: &'a mut ParticleSystem,
        rng: &'a mut Pcg32,
        events: &'a mut Vec<SimEvent>,
    ) -> Self {
        Self {
            dt,
            time_ms,
            input,
            particles,
            rng,
            events,
        }
    }

    /// End the run with a player-facing reason
    pub fn game_over(&mut self, reason: impl Into<String>) {
        self.game_over_with(reason, BTreeMap::new());
    }

    /// End the run with a reason and extra metadata (round reached, ...)
    pub fn game_over_with(
        &mut self,
        reason: impl Into<String>,
        meta: BTreeMap<String, serde_json::Value>,
    ) {
        self.events.push(SimEvent::GameOver {
            reason: reason.into(),
            meta,
        });
    }

    pub fn sound(&mut self, cue: SoundCue) {
        self.events.push(SimEvent::Sound(cue));
    }

    /// Whether a game over was already requested this frame
    pub fn is_over(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, SimEvent::GameOver { .. }))
    }
}

/// One game's rules
pub trait Simulation {
    /// Put every entity, timer, score and combo back to the start-of-run state
    fn reset(&mut self, rng: &mut Pcg32);

    /// Show the "press to start" screen before simulating
    fn wants_start_screen(&self) -> bool {
        true
    }

    /// Adjust the shared particle system (gravity, lifetime) for this game
    fn configure_particles(&self, _particles: &mut ParticleSystem) {}

    /// First input after the start screen; the input itself is consumed
    fn engage(&mut self, _step: &mut Step<'_>) {}

    /// Advance one frame: kinematics, collisions, scoring
    fn update(&mut self, step: &mut Step<'_>) -> Result<(), SimError>;

    /// Current score; the engine reports changes after each update
    fn score(&self) -> u64;

    /// Background and entities
    fn draw(&self, painter: &mut dyn Painter, time_ms: f64);

    /// Heads-up display, drawn above particles
    fn draw_hud(&self, painter: &mut dyn Painter) {
        shapes::score_label(painter, self.score());
    }
}
