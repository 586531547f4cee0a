//! Game instance runner: the lifecycle every game module shares
//!
//! One `GameInstance` wires a `Simulation` to the frame clock, the input
//! adapter, the particle system and a render surface:
//! - `start` resets the simulation, attaches listeners and schedules frames
//! - `stop` cancels the pending frame and drops the listeners
//! - `destroy` stops and releases the surface; the instance is inert after
//!
//! Each frame reads input, advances the simulation by the clamped delta,
//! integrates particles and renders back to front. Host callbacks run only
//! after the runner's own borrow is released, so they may call back into
//! the instance.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::clock::{FpsCounter, FrameClock};
use super::context::{GameCallbacks, GameContext, GameOverPayload};
use super::input::{InputAdapter, InputFrame, InputSource, Intent, ListenerGuard};
use crate::audio::{AudioSink, SoundCue};
use crate::consts::GENERIC_FAILURE_REASON;
use crate::renderer::{Surface, shapes};
use crate::sim::{ParticleSystem, SimEvent, Simulation, Step, Viewport};

/// Where an instance is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Created or stopped; nothing scheduled
    Ready,
    /// Showing the start screen, waiting for the first input
    AwaitingInput,
    Running,
    Paused,
    /// Run ended; the final frame stays on screen
    Terminated,
    Destroyed,
}

impl RunPhase {
    /// Whether frames are being scheduled
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            RunPhase::AwaitingInput | RunPhase::Running | RunPhase::Paused
        )
    }
}

/// A game as the registry knows it
#[derive(Debug, Clone, Copy)]
pub struct GameModule {
    pub id: &'static str,
    pub name: &'static str,
    /// One-line controls hint for the start screen
    pub controls: &'static str,
    pub build: fn(Viewport) -> Box<dyn Simulation>,
}

impl GameModule {
    /// Build a fresh instance; nothing runs until `start`
    pub fn create(&self, ctx: GameContext) -> GameInstance {
        let viewport = Viewport::new(ctx.width as f32, ctx.height as f32);
        GameInstance::new(self.name, self.controls, (self.build)(viewport), ctx)
    }
}

/// What one frame produced for the host
#[derive(Default)]
struct FrameOutcome {
    score: Option<u64>,
    game_over: Option<GameOverPayload>,
    sounds: Vec<SoundCue>,
}

struct Runner {
    phase: RunPhase,
    title: &'static str,
    controls: &'static str,
    sim: Box<dyn Simulation>,
    surface: Box<dyn Surface>,
    viewport: Viewport,
    clock: FrameClock,
    particles: ParticleSystem,
    rng: Pcg32,
    events: Vec<SimEvent>,
    input_source: Rc<dyn InputSource>,
    listeners: Option<ListenerGuard>,
    fps: FpsCounter,
    show_fps: bool,
    last_reported: u64,
    final_payload: Option<GameOverPayload>,
}

impl Runner {
    fn advance(&mut self, time_ms: f64, input: &InputFrame) -> FrameOutcome {
        let dt = self.clock.tick(time_ms);
        self.fps.record(time_ms);
        self.events.clear();

        match self.phase {
            RunPhase::AwaitingInput => {
                if input.any_pressed() {
                    let idle = InputFrame::default();
                    let mut step = Step::new(
                        0.0,
                        time_ms,
                        &idle,
                        &mut self.particles,
                        &mut self.rng,
                        &mut self.events,
                    );
                    self.sim.engage(&mut step);
                    self.phase = RunPhase::Running;
                    log::debug!("{} engaged", self.title);
                }
            }
            RunPhase::Running if input.just_pressed(Intent::Pause) => {
                self.phase = RunPhase::Paused;
            }
            RunPhase::Running => {
                let mut step = Step::new(
                    dt,
                    time_ms,
                    input,
                    &mut self.particles,
                    &mut self.rng,
                    &mut self.events,
                );
                let result = self.sim.update(&mut step);
                self.particles.integrate(dt);
                if let Err(err) = result {
                    log::error!("{} failed: {err}", self.title);
                    let mut meta = BTreeMap::new();
                    meta.insert("error".to_string(), serde_json::Value::from(err.to_string()));
                    self.events.push(SimEvent::GameOver {
                        reason: GENERIC_FAILURE_REASON.to_string(),
                        meta,
                    });
                }
            }
            RunPhase::Paused => {
                if input.just_pressed(Intent::Pause) || input.just_pressed(Intent::Primary) {
                    self.phase = RunPhase::Running;
                }
            }
            RunPhase::Ready | RunPhase::Terminated | RunPhase::Destroyed => {}
        }

        let mut outcome = FrameOutcome::default();
        for event in self.events.drain(..) {
            match event {
                SimEvent::Sound(cue) => outcome.sounds.push(cue),
                SimEvent::GameOver { reason, meta } => {
                    if outcome.game_over.is_none() {
                        outcome.game_over = Some(GameOverPayload {
                            score: self.sim.score(),
                            reason: Some(reason),
                            meta,
                        });
                    }
                }
            }
        }

        let score = self.sim.score();
        if score != self.last_reported {
            self.last_reported = score;
            outcome.score = Some(score);
        }

        if let Some(payload) = &outcome.game_over {
            self.phase = RunPhase::Terminated;
            self.final_payload = Some(payload.clone());
            outcome.sounds.push(SoundCue::GameOver);
        }

        self.render(time_ms);
        outcome
    }

    fn render(&mut self, time_ms: f64) {
        if self.surface.is_released() {
            return;
        }
        let (w, h) = (self.viewport.width, self.viewport.height);
        let painter = self.surface.painter();

        self.sim.draw(painter, time_ms);
        self.particles.render(painter);
        self.sim.draw_hud(painter);
        if self.show_fps {
            shapes::fps_label(painter, w, self.fps.fps());
        }

        match self.phase {
            RunPhase::AwaitingInput => {
                shapes::overlay_card(
                    painter,
                    w,
                    h,
                    self.title,
                    &[self.controls, "Press any key or tap to start"],
                );
            }
            RunPhase::Paused => {
                shapes::overlay_card(painter, w, h, "Paused", &["Press P or Esc to resume"]);
            }
            RunPhase::Terminated => {
                if let Some(payload) = &self.final_payload {
                    let score_line = format!("Score: {}", payload.score);
                    let reason = payload.reason.as_deref().unwrap_or("");
                    shapes::overlay_card(painter, w, h, "Game Over", &[reason, score_line.as_str()]);
                }
            }
            RunPhase::Ready | RunPhase::Running | RunPhase::Destroyed => {}
        }

        self.surface.present();
    }

    fn drop_listeners(&mut self, input: &RefCell<InputAdapter>) {
        self.listeners = None;
        input.borrow_mut().detach();
    }
}

struct Shared {
    runner: RefCell<Runner>,
    callbacks: RefCell<GameCallbacks>,
    input: Rc<RefCell<InputAdapter>>,
    audio: Option<Rc<dyn AudioSink>>,
    /// Bumped on every start/stop; frames from an older run are ignored
    generation: Cell<u64>,
    /// Cleared once a run may no longer report to the host
    accepting: Cell<bool>,
}

/// Handle to a running (or stoppable) game. Clones share the instance.
#[derive(Clone)]
pub struct GameInstance {
    shared: Rc<Shared>,
}

impl GameInstance {
    pub fn new(
        title: &'static str,
        controls: &'static str,
        sim: Box<dyn Simulation>,
        ctx: GameContext,
    ) -> Self {
        let viewport = Viewport::new(ctx.width as f32, ctx.height as f32);
        let runner = Runner {
            phase: RunPhase::Ready,
            title,
            controls,
            sim,
            surface: ctx.surface,
            viewport,
            clock: FrameClock::new(ctx.scheduler),
            particles: ParticleSystem::new(ctx.settings.max_particles()),
            rng: Pcg32::seed_from_u64(ctx.seed),
            events: Vec::new(),
            input_source: ctx.input,
            listeners: None,
            fps: FpsCounter::new(),
            show_fps: ctx.settings.show_fps,
            last_reported: 0,
            final_payload: None,
        };
        Self {
            shared: Rc::new(Shared {
                runner: RefCell::new(runner),
                callbacks: RefCell::new(ctx.callbacks),
                input: Rc::new(RefCell::new(InputAdapter::new())),
                audio: ctx.audio,
                generation: Cell::new(0),
                accepting: Cell::new(false),
            }),
        }
    }

    /// Begin a run. No-op while one is live; restarts after stop or game over.
    pub fn start(&self) {
        let shared = &self.shared;
        let mut runner = shared.runner.borrow_mut();
        match runner.phase {
            RunPhase::Destroyed => {
                log::warn!("start() on a destroyed {} instance ignored", runner.title);
                return;
            }
            phase if phase.is_live() => return,
            _ => {}
        }

        shared.generation.set(shared.generation.get() + 1);

        let r = &mut *runner;
        r.sim.reset(&mut r.rng);
        r.particles.clear();
        r.sim.configure_particles(&mut r.particles);
        r.events.clear();
        r.fps.reset();
        r.final_payload = None;
        r.last_reported = r.sim.score();

        {
            let mut input = shared.input.borrow_mut();
            input.detach();
            input.attach();
        }
        r.listeners = Some(r.input_source.attach(Rc::downgrade(&shared.input)));

        r.phase = if r.sim.wants_start_screen() {
            RunPhase::AwaitingInput
        } else {
            RunPhase::Running
        };
        let now = r.clock.now();
        r.clock.restart_at(now);
        shared.accepting.set(true);
        Self::schedule(shared, r);
        log::info!("{} started", r.title);
    }

    /// Cancel the pending frame and detach listeners. Keeps the surface.
    pub fn stop(&self) {
        let shared = &self.shared;
        let mut runner = shared.runner.borrow_mut();
        if runner.phase == RunPhase::Destroyed {
            return;
        }
        shared.accepting.set(false);
        shared.generation.set(shared.generation.get() + 1);
        runner.clock.cancel();
        runner.drop_listeners(&shared.input);
        if runner.phase != RunPhase::Ready {
            log::debug!("{} stopped", runner.title);
        }
        runner.phase = RunPhase::Ready;
    }

    /// Stop and release the surface. Safe to repeat and without `start`.
    pub fn destroy(&self) {
        self.stop();
        let mut runner = self.shared.runner.borrow_mut();
        if runner.phase == RunPhase::Destroyed {
            return;
        }
        runner.surface.release();
        runner.particles.clear();
        runner.phase = RunPhase::Destroyed;
        log::info!("{} destroyed", runner.title);
    }

    pub fn phase(&self) -> RunPhase {
        self.shared.runner.borrow().phase
    }

    pub fn score(&self) -> u64 {
        self.shared.runner.borrow().sim.score()
    }

    /// The adapter platform listeners feed
    pub fn input(&self) -> Rc<RefCell<InputAdapter>> {
        self.shared.input.clone()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.shared.runner.borrow().clock.has_pending()
    }

    pub fn particle_count(&self) -> usize {
        self.shared.runner.borrow().particles.len()
    }

    /// Result of the last finished run, if it ended on its own
    pub fn last_result(&self) -> Option<GameOverPayload> {
        self.shared.runner.borrow().final_payload.clone()
    }

    fn schedule(shared: &Rc<Shared>, runner: &mut Runner) {
        let weak: Weak<Shared> = Rc::downgrade(shared);
        let generation = shared.generation.get();
        runner.clock.schedule(Box::new(move |time_ms| {
            if let Some(shared) = weak.upgrade() {
                GameInstance { shared }.on_frame(generation, time_ms);
            }
        }));
    }

    fn is_current(&self, generation: u64) -> bool {
        self.shared.accepting.get() && self.shared.generation.get() == generation
    }

    fn on_frame(&self, generation: u64, time_ms: f64) {
        if !self.is_current(generation) {
            log::debug!("stale frame from run {generation} ignored");
            return;
        }
        let shared = &self.shared;

        let outcome = {
            let mut runner = shared.runner.borrow_mut();
            runner.clock.mark_fired();
            let frame = shared.input.borrow_mut().take_frame();
            let outcome = runner.advance(time_ms, &frame);

            if outcome.game_over.is_some() {
                shared.accepting.set(false);
                runner.drop_listeners(&shared.input);
                log::info!("{} over with score {}", runner.title, runner.sim.score());
            } else {
                Self::schedule(shared, &mut runner);
            }
            outcome
        };

        if let Some(audio) = &shared.audio {
            for cue in &outcome.sounds {
                audio.play(*cue);
            }
        }

        // A callback may stop or restart the instance; later ones then skip
        if let Some(score) = outcome.score {
            if shared.generation.get() == generation {
                let mut callbacks = shared.callbacks.borrow_mut();
                if let Some(on_score) = callbacks.on_score.as_mut() {
                    on_score(score);
                }
            }
        }
        if let Some(payload) = outcome.game_over {
            if shared.generation.get() == generation {
                let mut callbacks = shared.callbacks.borrow_mut();
                (callbacks.on_game_over)(payload);
            }
        }
    }
}

impl std::fmt::Debug for GameInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let runner = self.shared.runner.borrow();
        f.debug_struct("GameInstance")
            .field("title", &runner.title)
            .field("phase", &runner.phase)
            .field("generation", &self.shared.generation.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::CueLog;
    use crate::engine::clock::ManualScheduler;
    use crate::engine::input::CountingInputSource;
    use crate::renderer::{Color, DrawCmd, Painter, RecordingSurface, SurfaceLog, palette};
    use crate::settings::Settings;
    use crate::sim::{Rect, SimError, Valence};
    use glam::Vec2;

    #[derive(Default)]
    struct Log {
        resets: u32,
        engaged: u32,
        updates: u32,
        dts: Vec<f32>,
        saw_primary: bool,
        held_right: bool,
    }

    struct ScriptedSim {
        log: Rc<RefCell<Log>>,
        start_screen: bool,
        end_at: Option<u32>,
        fail_at: Option<u32>,
        points_per_frame: u64,
        frames: u32,
        score: u64,
    }

    impl ScriptedSim {
        fn new(log: Rc<RefCell<Log>>) -> Self {
            Self {
                log,
                start_screen: false,
                end_at: None,
                fail_at: None,
                points_per_frame: 10,
                frames: 0,
                score: 0,
            }
        }
    }

    impl Simulation for ScriptedSim {
        fn reset(&mut self, _rng: &mut Pcg32) {
            self.frames = 0;
            self.score = 0;
            self.log.borrow_mut().resets += 1;
        }

        fn wants_start_screen(&self) -> bool {
            self.start_screen
        }

        fn engage(&mut self, _step: &mut Step<'_>) {
            self.log.borrow_mut().engaged += 1;
        }

        fn update(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
            self.frames += 1;
            self.score += self.points_per_frame;
            {
                let mut log = self.log.borrow_mut();
                log.updates += 1;
                log.dts.push(step.dt);
                log.saw_primary |= step.input.just_pressed(Intent::Primary);
                log.held_right = step.input.held(Intent::MoveRight);
            }
            step.particles
                .spawn(step.rng, Vec2::new(50.0, 50.0), 2, 100.0, Valence::Good);
            step.sound(SoundCue::Score);
            if self.fail_at == Some(self.frames) {
                return Err(SimError::InvalidState("boom".into()));
            }
            if self.end_at == Some(self.frames) {
                let mut meta = BTreeMap::new();
                meta.insert("frames".to_string(), serde_json::json!(self.frames));
                step.game_over_with("Scripted end", meta);
            }
            Ok(())
        }

        fn score(&self) -> u64 {
            self.score
        }

        fn draw(&self, painter: &mut dyn Painter, _time_ms: f64) {
            painter.clear(palette::BACKDROP);
            painter.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::rgb(1, 2, 3));
        }
    }

    struct Rig {
        scheduler: Rc<ManualScheduler>,
        input: Rc<CountingInputSource>,
        screen: SurfaceLog,
        audio: Rc<CueLog>,
        scores: Rc<RefCell<Vec<u64>>>,
        overs: Rc<RefCell<Vec<GameOverPayload>>>,
        log: Rc<RefCell<Log>>,
    }

    impl Rig {
        fn frame(&self) {
            self.scheduler.advance(16.0);
        }

        fn frames(&self, n: usize) {
            self.scheduler.run_frames(n, 16.0);
        }
    }

    fn rig_with(configure: impl FnOnce(&mut ScriptedSim)) -> (GameInstance, Rig) {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut sim = ScriptedSim::new(log.clone());
        configure(&mut sim);

        let scheduler = Rc::new(ManualScheduler::starting_at(1000.0));
        let input = Rc::new(CountingInputSource::new());
        let audio = Rc::new(CueLog::new());
        let (surface, screen) = RecordingSurface::new(320, 240);
        let scores = Rc::new(RefCell::new(Vec::new()));
        let overs = Rc::new(RefCell::new(Vec::new()));

        let s = scores.clone();
        let o = overs.clone();
        let ctx = GameContext {
            surface: Box::new(surface),
            width: 320,
            height: 240,
            callbacks: GameCallbacks::new(move |p| o.borrow_mut().push(p))
                .with_score(move |v| s.borrow_mut().push(v)),
            scheduler: scheduler.clone(),
            input: input.clone(),
            audio: Some(audio.clone()),
            settings: Settings::default(),
            seed: 42,
        };
        let instance = GameInstance::new("Scripted", "Do things", Box::new(sim), ctx);
        (
            instance,
            Rig {
                scheduler,
                input,
                screen,
                audio,
                scores,
                overs,
                log,
            },
        )
    }

    fn rig() -> (GameInstance, Rig) {
        rig_with(|_| {})
    }

    #[test]
    fn test_start_is_idempotent() {
        let (game, rig) = rig();
        game.start();
        game.start();
        assert_eq!(rig.scheduler.pending(), 1);
        assert_eq!(rig.input.attaches(), 1);
        assert_eq!(rig.log.borrow().resets, 1);
        assert_eq!(game.phase(), RunPhase::Running);
    }

    #[test]
    fn test_stop_is_idempotent_and_keeps_surface() {
        let (game, rig) = rig();
        game.start();
        rig.frames(3);
        game.stop();
        game.stop();
        assert_eq!(game.phase(), RunPhase::Ready);
        assert_eq!(rig.scheduler.pending(), 0);
        assert_eq!(rig.input.active(), 0);
        assert!(!rig.screen.is_released());
        rig.frames(3);
        assert_eq!(rig.log.borrow().updates, 3);
    }

    #[test]
    fn test_destroy_without_start() {
        let (game, rig) = rig();
        game.destroy();
        game.destroy();
        assert!(rig.screen.is_released());
        assert_eq!(game.phase(), RunPhase::Destroyed);

        game.start();
        assert_eq!(game.phase(), RunPhase::Destroyed);
        assert_eq!(rig.scheduler.pending(), 0);
        assert_eq!(rig.input.attaches(), 0);
    }

    #[test]
    fn test_no_callbacks_after_destroy() {
        let (game, rig) = rig();
        game.start();
        rig.frames(5);
        let scores = rig.scores.borrow().len();
        let updates = rig.log.borrow().updates;
        assert_eq!(scores, 5);

        game.destroy();
        assert_eq!(rig.scheduler.fire_cancelled(), 1);
        rig.frames(5);

        assert_eq!(rig.scores.borrow().len(), scores);
        assert_eq!(rig.log.borrow().updates, updates);
        assert!(rig.overs.borrow().is_empty());
        assert_eq!(rig.input.active(), 0);
        assert!(!rig.input.emit_key_down("Space"));
    }

    #[test]
    fn test_stale_frame_from_previous_run_is_ignored() {
        let (game, rig) = rig();
        game.start();
        game.stop();
        game.start();
        assert_eq!(rig.scheduler.fire_cancelled(), 1);
        assert_eq!(rig.log.borrow().updates, 0);
        rig.frame();
        assert_eq!(rig.log.borrow().updates, 1);
    }

    #[test]
    fn test_stall_is_clamped() {
        let (game, rig) = rig();
        game.start();
        rig.frame();
        rig.scheduler.advance(5000.0);
        let log = rig.log.borrow();
        assert!((log.dts[0] - 0.016).abs() < 1e-6);
        assert!(log.dts[1] <= crate::consts::MAX_FRAME_DT);
        assert!(game.has_pending_frame());
    }

    #[test]
    fn test_game_over_fires_exactly_once() {
        let (game, rig) = rig_with(|s| s.end_at = Some(3));
        game.start();
        rig.frames(10);

        let overs = rig.overs.borrow();
        assert_eq!(overs.len(), 1);
        assert_eq!(overs[0].score, 30);
        assert_eq!(overs[0].reason.as_deref(), Some("Scripted end"));
        assert_eq!(overs[0].meta["frames"], serde_json::json!(3));

        assert_eq!(*rig.scores.borrow(), vec![10, 20, 30]);
        assert_eq!(game.phase(), RunPhase::Terminated);
        assert_eq!(rig.log.borrow().updates, 3);
        assert!(!game.has_pending_frame());
        assert_eq!(rig.input.active(), 0);
        assert!(rig.audio.cues().contains(&SoundCue::GameOver));

        let last = rig.screen.last_frame();
        assert!(last.contains_text("Game Over"));
        assert!(last.contains_text("Scripted end"));
        assert_eq!(game.last_result().map(|p| p.score), Some(30));
    }

    #[test]
    fn test_sim_error_ends_with_generic_reason() {
        let (game, rig) = rig_with(|s| s.fail_at = Some(2));
        game.start();
        rig.frames(5);

        let overs = rig.overs.borrow();
        assert_eq!(overs.len(), 1);
        assert_eq!(overs[0].reason.as_deref(), Some(GENERIC_FAILURE_REASON));
        let err = overs[0].meta["error"].as_str().unwrap_or_default();
        assert!(err.contains("boom"));
        assert_eq!(game.phase(), RunPhase::Terminated);
        assert!(!rig.screen.last_frame().contains_text("boom"));
    }

    #[test]
    fn test_restart_after_game_over() {
        let (game, rig) = rig_with(|s| s.end_at = Some(2));
        game.start();
        rig.frames(4);
        game.start();
        assert_eq!(rig.log.borrow().resets, 2);
        rig.frames(4);
        assert_eq!(rig.overs.borrow().len(), 2);
        assert_eq!(rig.input.attaches(), 2);
        assert_eq!(rig.input.active(), 0);
    }

    #[test]
    fn test_pause_freezes_simulation() {
        let (game, rig) = rig();
        game.start();
        rig.frames(2);
        rig.input.emit_key_down("KeyP");
        rig.input.emit_key_up("KeyP");
        rig.frames(5);
        assert_eq!(game.phase(), RunPhase::Paused);
        assert_eq!(rig.log.borrow().updates, 2);
        let particles = game.particle_count();
        rig.frames(3);
        assert_eq!(game.particle_count(), particles);
        assert!(rig.screen.last_frame().contains_text("Paused"));

        rig.input.emit_key_down("Escape");
        rig.frame();
        assert_eq!(game.phase(), RunPhase::Running);
        rig.frame();
        assert_eq!(rig.log.borrow().updates, 3);
    }

    #[test]
    fn test_blur_releases_held_keys() {
        let (game, rig) = rig();
        game.start();
        rig.input.emit_key_down("ArrowRight");
        rig.frame();
        assert!(rig.log.borrow().held_right);

        // Window blur: the keyup never arrives
        game.input().borrow_mut().request_pause();
        rig.frame();
        assert_eq!(game.phase(), RunPhase::Paused);

        rig.input.emit_key_down("Escape");
        rig.frame();
        assert_eq!(game.phase(), RunPhase::Running);
        rig.frame();
        assert_eq!(rig.log.borrow().updates, 2);
        assert!(!rig.log.borrow().held_right);
    }

    #[test]
    fn test_start_screen_consumes_first_input() {
        let (game, rig) = rig_with(|s| s.start_screen = true);
        game.start();
        assert_eq!(game.phase(), RunPhase::AwaitingInput);
        rig.frames(3);
        assert_eq!(rig.log.borrow().updates, 0);
        assert!(rig.screen.last_frame().contains_text("Scripted"));
        assert!(rig.screen.last_frame().contains_text("Do things"));

        rig.input.emit_key_down("Space");
        rig.frame();
        assert_eq!(game.phase(), RunPhase::Running);
        assert_eq!(rig.log.borrow().engaged, 1);
        rig.frames(3);
        assert_eq!(rig.log.borrow().updates, 3);
        assert!(!rig.log.borrow().saw_primary);
    }

    #[test]
    fn test_render_order() {
        let (game, rig) = rig();
        game.start();
        rig.frames(2);
        let frame = rig.screen.last_frame();
        assert!(matches!(frame.cmds[0], DrawCmd::Clear(_)));
        let entity = frame
            .position(|c| matches!(c, DrawCmd::Rect { .. }))
            .unwrap();
        let particle = frame
            .position(|c| matches!(c, DrawCmd::Circle { .. }))
            .unwrap();
        let hud = frame
            .position(|c| matches!(c, DrawCmd::Text { text, .. } if text.starts_with("Score")))
            .unwrap();
        assert!(entity < particle);
        assert!(particle < hud);
    }

    #[test]
    fn test_score_reported_only_on_change() {
        let (game, rig) = rig_with(|s| s.points_per_frame = 0);
        game.start();
        rig.frames(5);
        assert!(rig.scores.borrow().is_empty());
    }

    #[test]
    fn test_callback_may_destroy_instance() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut sim = ScriptedSim::new(log);
        sim.end_at = Some(1);
        let scheduler = Rc::new(ManualScheduler::new());
        let (surface, screen) = RecordingSurface::new(100, 100);
        let slot: Rc<RefCell<Option<GameInstance>>> = Rc::new(RefCell::new(None));

        let inner = slot.clone();
        let ctx = GameContext {
            surface: Box::new(surface),
            width: 100,
            height: 100,
            callbacks: GameCallbacks::new(move |_| {
                if let Some(game) = inner.borrow().as_ref() {
                    game.destroy();
                }
            }),
            scheduler: scheduler.clone(),
            input: Rc::new(crate::engine::input::NullInputSource),
            audio: None,
            settings: Settings::default(),
            seed: 1,
        };
        let game = GameInstance::new("Scripted", "", Box::new(sim), ctx);
        *slot.borrow_mut() = Some(game.clone());

        game.start();
        scheduler.advance(16.0);
        assert_eq!(game.phase(), RunPhase::Destroyed);
        assert!(screen.is_released());
        slot.borrow_mut().take();
    }

    #[test]
    fn test_module_create_uses_viewport() {
        fn build(viewport: Viewport) -> Box<dyn Simulation> {
            assert_eq!(viewport, Viewport::new(200.0, 100.0));
            let mut sim = ScriptedSim::new(Rc::new(RefCell::new(Log::default())));
            sim.points_per_frame = 1;
            Box::new(sim)
        }
        let module = GameModule {
            id: "scripted",
            name: "Scripted",
            controls: "",
            build,
        };
        let (surface, _screen) = RecordingSurface::new(200, 100);
        let ctx = GameContext {
            surface: Box::new(surface),
            width: 200,
            height: 100,
            callbacks: GameCallbacks::ignore(),
            scheduler: Rc::new(ManualScheduler::new()),
            input: Rc::new(crate::engine::input::NullInputSource),
            audio: None,
            settings: Settings::default(),
            seed: 3,
        };
        let game = module.create(ctx);
        assert_eq!(game.phase(), RunPhase::Ready);
        assert_eq!(game.score(), 0);
    }
}
