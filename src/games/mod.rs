//! Game registry
//!
//! Every game is a `GameModule` whose factory builds its `Simulation`; the
//! host looks modules up here by id.

pub mod dodge;
pub mod jumper;
pub mod knives;
pub mod merge;
pub mod runner;
pub mod simon;
pub mod stopper;

use crate::engine::GameModule;

/// All playable games, in menu order
pub const GAMES: &[GameModule] = &[
    dodge::MODULE,
    knives::MODULE,
    jumper::MODULE,
    merge::MODULE,
    stopper::MODULE,
    runner::MODULE,
    simon::MODULE,
];

/// Module registered under `id` in `registry`
pub fn find(registry: &'static [GameModule], id: &str) -> Option<&'static GameModule> {
    registry.iter().find(|m| m.id == id)
}
