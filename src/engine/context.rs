//! What a host hands to a game module at creation

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::clock::FrameScheduler;
use super::input::InputSource;
use crate::audio::AudioSink;
use crate::renderer::Surface;
use crate::settings::Settings;

/// Final result of a run, delivered exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOverPayload {
    pub score: u64,
    pub reason: Option<String>,
    #[serde(default)]
    pub meta: BTreeMap<String, serde_json::Value>,
}

pub type ScoreCallback = Box<dyn FnMut(u64)>;
pub type GameOverCallback = Box<dyn FnMut(GameOverPayload)>;

/// Host-supplied notifications
pub struct GameCallbacks {
    /// Called when the score changes during a run
    pub on_score: Option<ScoreCallback>,
    pub on_game_over: GameOverCallback,
}

impl GameCallbacks {
    pub fn new(on_game_over: impl FnMut(GameOverPayload) + 'static) -> Self {
        Self {
            on_score: None,
            on_game_over: Box::new(on_game_over),
        }
    }

    pub fn with_score(mut self, on_score: impl FnMut(u64) + 'static) -> Self {
        self.on_score = Some(Box::new(on_score));
        self
    }

    /// Callbacks that ignore everything
    pub fn ignore() -> Self {
        Self::new(|_| {})
    }
}

/// Everything one game instance owns for its lifetime
pub struct GameContext {
    pub surface: Box<dyn Surface>,
    pub width: u32,
    pub height: u32,
    pub callbacks: GameCallbacks,
    pub scheduler: Rc<dyn FrameScheduler>,
    pub input: Rc<dyn InputSource>,
    pub audio: Option<Rc<dyn AudioSink>>,
    pub settings: Settings,
    /// Seeds the instance RNG; equal seeds replay equal runs
    pub seed: u64,
}
