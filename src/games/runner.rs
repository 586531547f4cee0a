//! Runaway Runner
//!
//! Three lanes scroll toward the runner. Left/right hop one lane per press and
//! a dash smashes through whatever it meets for a moment. Barriers that scroll
//! past are worth 25 points, smashed ones 60, and every second alive adds 50.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::audio::SoundCue;
use crate::engine::{GameModule, Intent};
use crate::renderer::{Color, Painter, palette, shapes};
use crate::sim::{
    Ramp, Rect, SimError, Simulation, Step, SurvivalScore, Valence, Viewport, ensure_finite,
    rect_overlap,
};

pub const MODULE: GameModule = GameModule {
    id: "runner",
    name: "Runaway Runner",
    controls: "←/→ or A/D = Lane | SPACE = Dash",
    build,
};

fn build(view: Viewport) -> Box<dyn Simulation> {
    Box::new(Runner::new(view))
}

const LANES: usize = 3;
const PLAYER_W: f32 = 40.0;
const PLAYER_H: f32 = 52.0;
const BARRIER_H: f32 = 30.0;
/// Barrier width as a share of the lane
const BARRIER_FILL: f32 = 0.62;
const DASH_TIME: f32 = 0.30;
const DASH_COOLDOWN: f32 = 1.10;
const PASS_POINTS: u64 = 25;
const SMASH_POINTS: u64 = 60;
const SURVIVAL_RATE: f32 = 50.0;
/// Share of the lane offset left after one second of easing
const LANE_EASE: f32 = 1e-6;

/// Scroll speed (px/s) over survived seconds
const SPEED: Ramp = Ramp::new(380.0, 16.0, 380.0, 920.0);
/// Seconds between barriers over survived seconds
const SPAWN_GAP: Ramp = Ramp::new(0.85, -0.025, 0.38, 0.85);

#[derive(Debug, Clone, Copy)]
struct Barrier {
    lane: usize,
    y: f32,
}

impl Barrier {
    fn rect(&self, lane_w: f32) -> Rect {
        let w = lane_w * BARRIER_FILL;
        let x = lane_w * (self.lane as f32 + 0.5) - w / 2.0;
        Rect::new(x, self.y, w, BARRIER_H)
    }
}

pub struct Runner {
    view: Viewport,
    lane: usize,
    x: f32,
    dash: f32,
    dash_cooldown: f32,
    barriers: Vec<Barrier>,
    spawn_timer: f32,
    time_alive: f32,
    score: u64,
    survival: SurvivalScore,
}

impl Runner {
    pub fn new(view: Viewport) -> Self {
        let mut runner = Self {
            view,
            lane: LANES / 2,
            x: 0.0,
            dash: 0.0,
            dash_cooldown: 0.0,
            barriers: Vec::new(),
            spawn_timer: 0.6,
            time_alive: 0.0,
            score: 0,
            survival: SurvivalScore::default(),
        };
        runner.x = runner.lane_center(runner.lane);
        runner
    }

    fn lane_width(&self) -> f32 {
        self.view.width / LANES as f32
    }

    fn lane_center(&self, lane: usize) -> f32 {
        self.lane_width() * (lane as f32 + 0.5)
    }

    fn player_y(&self) -> f32 {
        (self.view.height * 0.8).floor()
    }

    fn player_rect(&self) -> Rect {
        Rect::centered(Vec2::new(self.x, self.player_y()), PLAYER_W, PLAYER_H)
    }

    fn dash(&mut self, step: &mut Step<'_>) {
        if self.dash_cooldown > 0.0 {
            return;
        }
        self.dash = DASH_TIME;
        self.dash_cooldown = DASH_COOLDOWN;
        let at = Vec2::new(self.x, self.player_y());
        step.particles.spawn(step.rng, at, 16, 480.0, Valence::Good);
        step.sound(SoundCue::Dash);
    }

    fn steer(&mut self, step: &Step<'_>) {
        if step.input.just_pressed(Intent::MoveLeft) {
            self.lane = self.lane.saturating_sub(1);
        }
        if step.input.just_pressed(Intent::MoveRight) {
            self.lane = (self.lane + 1).min(LANES - 1);
        }
    }
}

impl Simulation for Runner {
    fn reset(&mut self, _rng: &mut Pcg32) {
        *self = Self::new(self.view);
    }

    fn update(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        let dt = step.dt;
        self.time_alive += dt;
        let speed = SPEED.at(self.time_alive);

        self.steer(step);
        if step.input.just_pressed(Intent::Primary) {
            self.dash(step);
        }
        self.dash = (self.dash - dt).max(0.0);
        self.dash_cooldown = (self.dash_cooldown - dt).max(0.0);

        let target = self.lane_center(self.lane);
        self.x += (target - self.x) * (1.0 - LANE_EASE.powf(dt));
        ensure_finite(self.x, "runner position")?;

        self.spawn_timer -= dt;
        if self.spawn_timer <= 0.0 {
            let lane = step.rng.random_range(0..LANES);
            self.barriers.push(Barrier {
                lane,
                y: -BARRIER_H - 10.0,
            });
            self.spawn_timer = SPAWN_GAP.at(self.time_alive);
        }

        let floor = self.view.height + 40.0;
        let before = self.barriers.len();
        for b in self.barriers.iter_mut() {
            b.y += speed * dt;
        }
        self.barriers.retain(|b| b.y <= floor);
        self.score += (before - self.barriers.len()) as u64 * PASS_POINTS;

        let lane_w = self.lane_width();
        let player = self.player_rect();
        if self.dash > 0.0 {
            let mut smashed = Vec::new();
            self.barriers.retain(|b| {
                let r = b.rect(lane_w);
                let hit = rect_overlap(&player, &r);
                if hit {
                    smashed.push(r.center());
                }
                !hit
            });
            for at in &smashed {
                step.particles.spawn(step.rng, *at, 22, 560.0, Valence::Good);
            }
            if !smashed.is_empty() {
                self.score += smashed.len() as u64 * SMASH_POINTS;
                step.sound(SoundCue::Score);
            }
        } else if self.barriers.iter().any(|b| rect_overlap(&player, &b.rect(lane_w))) {
            let at = Vec2::new(self.x, self.player_y());
            step.particles.spawn(step.rng, at, 48, 620.0, Valence::Bad);
            step.sound(SoundCue::Miss);
            step.game_over("Ran into a barrier");
            return Ok(());
        }

        self.score += self.survival.advance(SURVIVAL_RATE, dt);
        Ok(())
    }

    fn score(&self) -> u64 {
        self.score
    }

    fn draw(&self, p: &mut dyn Painter, time_ms: f64) {
        let (w, h) = (self.view.width, self.view.height);
        shapes::backdrop(p, w, h, time_ms);

        let lane_w = self.lane_width();
        for i in 1..LANES {
            let x = lane_w * i as f32;
            p.line(Vec2::new(x, 0.0), Vec2::new(x, h), 2.0, palette::GRID);
        }
        shapes::glow_line(p, self.player_y() + PLAYER_H * 0.5 + 6.0, w);

        for b in &self.barriers {
            shapes::neon_block(p, b.rect(lane_w), 8.0, palette::HAZARD);
        }

        let body = self.player_rect();
        if self.dash > 0.0 {
            let trail = Rect::new(body.x + 6.0, body.bottom(), body.w - 12.0, 34.0);
            p.fill_round_rect(trail, 10.0, Color::rgba(255, 139, 214, 0.16));
        }
        shapes::neon_block(p, body, 12.0, palette::PLAYER);
    }
}
