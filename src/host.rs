//! Game host: mounts one game at a time into a render surface
//!
//! The host resolves ids through the registry, validates the surface before
//! anything is created, routes score and game-over callbacks into a
//! `HostView`, and records finished runs in the highscore store. Mounting a
//! new game always destroys the previous instance first.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::Serialize;
use thiserror::Error;

use crate::audio::AudioSink;
use crate::engine::{
    FrameScheduler, GameCallbacks, GameContext, GameInstance, GameModule, GameOverPayload,
    InputSource,
};
use crate::games;
use crate::highscores::{HighscoreStore, ScoreRecord};
use crate::renderer::SurfaceFactory;
use crate::settings::Settings;

/// Configuration problems detected before a game is created
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("unknown game id {0:?}")]
    UnknownGame(String),
    #[error("invalid surface size {width}x{height}")]
    InvalidSurface { width: u32, height: u32 },
    #[error("render surface unavailable: {0}")]
    SurfaceUnavailable(String),
}

impl HostError {
    /// Status shown to the player for this error
    pub fn status(&self) -> HostStatus {
        match self {
            HostError::UnknownGame(_) => HostStatus::NotFound,
            HostError::InvalidSurface { .. } | HostError::SurfaceUnavailable(_) => {
                HostStatus::CannotRender
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum HostStatus {
    #[default]
    Idle,
    Playing,
    GameOver,
    NotFound,
    CannotRender,
}

impl HostStatus {
    /// Player-facing text
    pub fn message(&self) -> &'static str {
        match self {
            HostStatus::Idle => "Pick a game",
            HostStatus::Playing => "Playing",
            HostStatus::GameOver => "Game over",
            HostStatus::NotFound => "Game not found",
            HostStatus::CannotRender => "This game cannot be displayed here",
        }
    }
}

/// What the page around the game shows
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HostView {
    pub status: HostStatus,
    pub game_id: Option<String>,
    pub title: Option<&'static str>,
    pub score: u64,
    /// Stored best for the signed-in player
    pub best: u64,
    pub game_over: Option<GameOverPayload>,
    /// Whether the last finished run beat the stored best
    pub new_record: bool,
}

pub type ViewObserver = Box<dyn FnMut(&HostView)>;

/// Platform services a host hands to every game it mounts
pub struct Platform {
    pub scheduler: Rc<dyn FrameScheduler>,
    pub input: Rc<dyn InputSource>,
    pub surfaces: Rc<dyn SurfaceFactory>,
    pub audio: Option<Rc<dyn AudioSink>>,
    pub store: Rc<dyn HighscoreStore>,
    pub settings: Settings,
    /// Base seed; each mount derives its own from it
    pub seed: u64,
}

struct HostState {
    platform: Platform,
    registry: &'static [GameModule],
    instance: Option<GameInstance>,
    view: HostView,
    observer: Option<ViewObserver>,
    mounts: u64,
}

/// Owns the active game instance and its page-level state
pub struct GameHost {
    state: Rc<RefCell<HostState>>,
}

impl GameHost {
    pub fn new(platform: Platform) -> Self {
        Self::with_games(platform, games::GAMES)
    }

    /// Host over a custom registry
    pub fn with_games(platform: Platform, registry: &'static [GameModule]) -> Self {
        Self {
            state: Rc::new(RefCell::new(HostState {
                platform,
                registry,
                instance: None,
                view: HostView::default(),
                observer: None,
                mounts: 0,
            })),
        }
    }

    /// Receive every view change; called once immediately
    pub fn set_observer(&self, observer: impl FnMut(&HostView) + 'static) {
        self.state.borrow_mut().observer = Some(Box::new(observer));
        notify(&self.state);
    }

    pub fn view(&self) -> HostView {
        self.state.borrow().view.clone()
    }

    /// Handle to the mounted instance
    pub fn instance(&self) -> Option<GameInstance> {
        self.state.borrow().instance.clone()
    }

    pub fn games(&self) -> &'static [GameModule] {
        self.state.borrow().registry
    }

    /// Destroy the current game (if any), then create and start `game_id`
    pub fn mount(&self, game_id: &str, width: u32, height: u32) -> Result<(), HostError> {
        self.teardown();

        let result = self.try_mount(game_id, width, height);
        if let Err(e) = &result {
            log::warn!("Cannot mount {game_id}: {e}");
            {
                let mut state = self.state.borrow_mut();
                state.view = HostView {
                    status: e.status(),
                    game_id: Some(game_id.to_string()),
                    ..HostView::default()
                };
            }
            notify(&self.state);
        }
        result
    }

    fn try_mount(&self, game_id: &str, width: u32, height: u32) -> Result<(), HostError> {
        let (module, ctx) = {
            let mut state = self.state.borrow_mut();
            let module = games::find(state.registry, game_id)
                .ok_or_else(|| HostError::UnknownGame(game_id.to_string()))?;
            if width == 0 || height == 0 {
                return Err(HostError::InvalidSurface { width, height });
            }

            let surface = state
                .platform
                .surfaces
                .allocate(width, height)
                .map_err(|e| HostError::SurfaceUnavailable(e.to_string()))?;

            state.mounts += 1;
            let p = &state.platform;
            let ctx = GameContext {
                surface,
                width,
                height,
                callbacks: self.callbacks(),
                scheduler: p.scheduler.clone(),
                input: p.input.clone(),
                audio: p.audio.clone(),
                settings: p.settings.clone(),
                seed: p.seed.wrapping_add(state.mounts),
            };
            let best = p.store.get_highscore(game_id);
            state.view = HostView {
                status: HostStatus::Playing,
                game_id: Some(game_id.to_string()),
                title: Some(module.name),
                best,
                ..HostView::default()
            };
            (module, ctx)
        };

        let instance = module.create(ctx);
        self.state.borrow_mut().instance = Some(instance.clone());
        log::info!("Mounted {}", module.id);
        notify(&self.state);
        instance.start();
        Ok(())
    }

    /// Stop and start the current game
    pub fn restart(&self) -> bool {
        let Some(instance) = self.instance() else {
            return false;
        };
        instance.stop();
        {
            let mut state = self.state.borrow_mut();
            let view = &mut state.view;
            view.status = HostStatus::Playing;
            view.score = 0;
            view.game_over = None;
            view.new_record = false;
        }
        notify(&self.state);
        instance.start();
        true
    }

    /// Destroy the current game and go back to idle
    pub fn unmount(&self) {
        self.teardown();
        self.state.borrow_mut().view = HostView::default();
        notify(&self.state);
    }

    /// Top entries for the mounted game
    pub fn leaderboard(&self) -> Vec<ScoreRecord> {
        let state = self.state.borrow();
        match &state.view.game_id {
            Some(id) => state.platform.store.leaderboard(id),
            None => Vec::new(),
        }
    }

    fn teardown(&self) {
        let previous = self.state.borrow_mut().instance.take();
        if let Some(instance) = previous {
            instance.destroy();
        }
    }

    fn callbacks(&self) -> GameCallbacks {
        let on_over: Weak<RefCell<HostState>> = Rc::downgrade(&self.state);
        let on_score = on_over.clone();
        GameCallbacks::new(move |payload| {
            if let Some(state) = on_over.upgrade() {
                finish_run(&state, payload);
            }
        })
        .with_score(move |score| {
            if let Some(state) = on_score.upgrade() {
                state.borrow_mut().view.score = score;
                notify(&state);
            }
        })
    }
}

impl Drop for GameHost {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn finish_run(state: &Rc<RefCell<HostState>>, payload: GameOverPayload) {
    let (store, game_id) = {
        let s = state.borrow();
        (s.platform.store.clone(), s.view.game_id.clone())
    };
    let Some(game_id) = game_id else {
        return;
    };

    let new_record = match store.save_highscore(&game_id, payload.score) {
        Ok(saved) => saved,
        Err(e) => {
            log::warn!("Could not save highscore for {game_id}: {e}");
            false
        }
    };
    let best = store.get_highscore(&game_id);

    {
        let mut s = state.borrow_mut();
        let view = &mut s.view;
        view.status = HostStatus::GameOver;
        view.score = payload.score;
        view.best = best;
        view.new_record = new_record;
        view.game_over = Some(payload);
    }
    notify(state);
}

/// Push the view to the observer without holding the state borrow
fn notify(state: &Rc<RefCell<HostState>>) {
    let (observer, view) = {
        let mut s = state.borrow_mut();
        (s.observer.take(), s.view.clone())
    };
    if let Some(mut observer) = observer {
        observer(&view);
        let mut s = state.borrow_mut();
        if s.observer.is_none() {
            s.observer = Some(observer);
        }
    }
}
