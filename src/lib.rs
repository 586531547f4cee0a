//! Neon Arcade - small real-time arcade games on one shared loop engine
//!
//! Core modules:
//! - `engine`: Frame clock, input adapter and the game instance lifecycle
//! - `sim`: Simulation contract plus shared physics, particles and difficulty helpers
//! - `games`: Game registry and the individual rule sets
//! - `host`: Mounts games, routes callbacks, persists highscores
//! - `renderer`: Painter abstraction, display list and Canvas 2D backend
//! - `platform`: Browser glue (requestAnimationFrame, DOM listeners)
//! - `persistence`: Key-value backends (memory, LocalStorage)

pub mod audio;
pub mod engine;
pub mod games;
pub mod highscores;
pub mod host;
pub mod persistence;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use engine::{GameCallbacks, GameContext, GameInstance, GameModule, GameOverPayload, RunPhase};
pub use highscores::{HighscoreStore, ScoreRecord};
pub use host::{GameHost, HostError};
pub use settings::{QualityPreset, Settings};

/// Engine configuration constants
pub mod consts {
    /// Upper bound for a single frame's delta time (seconds).
    /// Stalls longer than this (tab in background, slow frame) are dropped.
    pub const MAX_FRAME_DT: f32 = 0.033;

    /// Velocity retained per 60 Hz frame by particles
    pub const PARTICLE_DRAG: f32 = 0.98;
    /// Largest burst a single spawn call may create
    pub const MAX_BURST: usize = 64;
    /// Base alpha of a freshly spawned particle
    pub const PARTICLE_ALPHA: f32 = 0.35;

    /// Minimum pointer travel (px) before a release counts as a swipe
    pub const SWIPE_MIN_PX: f32 = 24.0;

    /// Number of entries a leaderboard query returns
    pub const LEADERBOARD_SIZE: usize = 10;

    /// Reason reported when a simulation fails mid-run
    pub const GENERIC_FAILURE_REASON: &str = "Something went wrong";
}

/// Clamp `v` into `[lo, hi]` (f32 helper mirroring the games' `clamp`)
#[inline]
pub fn clamp(v: f32, lo: f32, hi: f32) -> f32 {
    v.max(lo).min(hi)
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
