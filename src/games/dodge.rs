//! Falling Blocks Dodge
//!
//! Blocks rain from the top at a rate that ramps with survived time. The
//! player slides left/right and can dash briefly. Every block that leaves the
//! screen is worth 30 points, and staying alive earns 40 points per second.

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
use crate::{clamp, lerp};

pub const MODULE: GameModule = GameModule {
    id: "dodge",
    name: "Falling Blocks Dodge",
    controls: "←/→ or A/D | SPACE = Dash",
    build,
};

fn build(view: Viewport) -> Box<dyn Simulation> {
    Box::new(Dodge::new(view))
}

const PLAYER_SIZE: f32 = 44.0;
const EDGE_MARGIN: f32 = 30.0;
const DASH_TIME: f32 = 0.14;
const DASH_COOLDOWN: f32 = 0.65;
const PASS_POINTS: u64 = 30;
const SURVIVAL_RATE: f32 = 40.0;
/// Velocity kept after one second of friction
const FRICTION: f32 = 0.0008;

/// Difficulty multiplier over survived seconds
const DIFFICULTY: Ramp = Ramp::new(1.0, 0.18, 1.0, 12.0);
/// Seconds between spawns over difficulty
const SPAWN_INTERVAL: Ramp = Ramp::new(0.42, -0.04, 0.14, 0.42);

#[derive(Debug, Clone)]
struct Player {
    x: f32,
    y: f32,
    vx: f32,
    /// Remaining dash time
    dash: f32,
    dash_cooldown: f32,
}

impl Player {
    fn rect(&self) -> Rect {
        Rect::centered(Vec2::new(self.x, self.y), PLAYER_SIZE, PLAYER_SIZE)
    }
}

#[derive(Debug, Clone)]
struct Block {
    x: f32,
    y: f32,
    size: f32,
    vy: f32,
    tint: Color,
}

impl Block {
    fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.size, self.size)
    }
}

pub struct Dodge {
    view: Viewport,
    player: Player,
    blocks: Vec<Block>,
    spawn_timer: f32,
    time_alive: f32,
    difficulty: f32,
    score: u64,
    survival: SurvivalScore,
}

impl Dodge {
    pub fn new(view: Viewport) -> Self {
        Self {
            view,
            player: Player {
                x: view.width * 0.5,
                y: view.height * 0.82,
                vx: 0.0,
                dash: 0.0,
                dash_cooldown: 0.0,
            },
            blocks: Vec::new(),
            spawn_timer: 0.4,
            time_alive: 0.0,
            difficulty: 1.0,
            score: 0,
            survival: SurvivalScore::default(),
        }
    }

    fn spawn_block(&mut self, rng: &mut Pcg32) {
        let size = 26.0 + rng.random::<f32>() * 22.0;
        let span = (self.view.width - 2.0 * EDGE_MARGIN - size).max(0.0);
        let x = EDGE_MARGIN + rng.random::<f32>() * span;
        let vy = 220.0 + rng.random::<f32>() * 120.0 + self.difficulty * 45.0;
        let t = rng.random::<f32>();
        let tint = Color::rgba(
            lerp(80.0, 120.0, t) as u8,
            lerp(230.0, 170.0, t) as u8,
            255,
            0.9,
        );
        self.blocks.push(Block {
            x,
            y: -size - 20.0,
            size,
            vy,
            tint,
        });
    }

    fn dash(&mut self, step: &mut Step<'_>) {
        if self.player.dash_cooldown > 0.0 {
            return;
        }
        self.player.dash = DASH_TIME;
        self.player.dash_cooldown = DASH_COOLDOWN;
        let at = Vec2::new(self.player.x, self.player.y);
        step.particles.spawn(step.rng, at, 18, 520.0, Valence::Good);
        step.sound(SoundCue::Dash);
    }
}

impl Simulation for Dodge {
    fn reset(&mut self, _rng: &mut Pcg32) {
        *self = Self::new(self.view);
    }

    fn update(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        let dt = step.dt;
        self.time_alive += dt;
        self.difficulty = DIFFICULTY.at(self.time_alive);

        self.spawn_timer -= dt;
        if self.spawn_timer <= 0.0 {
            self.spawn_block(step.rng);
            self.spawn_timer = SPAWN_INTERVAL.at(self.difficulty);
        }

        if step.input.just_pressed(Intent::Primary) {
            self.dash(step);
        }

        let dashing = self.player.dash > 0.0;
        let accel = if dashing { 2200.0 } else { 1500.0 };
        let max_v = if dashing { 820.0 } else { 520.0 };
        let p = &mut self.player;
        p.vx += step.input.axis_x() * accel * dt;
        p.vx *= FRICTION.powf(dt);
        p.vx = clamp(p.vx, -max_v, max_v);
        p.dash = (p.dash - dt).max(0.0);
        p.dash_cooldown = (p.dash_cooldown - dt).max(0.0);
        p.x = clamp(p.x + p.vx * dt, EDGE_MARGIN, self.view.width - EDGE_MARGIN);
        ensure_finite(p.x, "player position")?;

        let floor = self.view.height + 80.0;
        let before = self.blocks.len();
        for b in self.blocks.iter_mut() {
            b.y += b.vy * dt;
        }
        self.blocks.retain(|b| b.y <= floor);
        self.score += (before - self.blocks.len()) as u64 * PASS_POINTS;

        let player = self.player.rect();
        if self.blocks.iter().any(|b| rect_overlap(&player, &b.rect())) {
            let at = Vec2::new(self.player.x, self.player.y);
            step.particles.spawn(step.rng, at, 50, 620.0, Valence::Bad);
            step.sound(SoundCue::Miss);
            step.game_over("Hit by a falling block");
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
        shapes::glow_line(p, h * 0.9, w);

        for b in &self.blocks {
            shapes::neon_block(p, b.rect(), 12.0, b.tint);
        }

        let body = self.player.rect();
        if self.player.dash > 0.0 {
            let trail = Rect::new(body.x - 24.0, body.y + 8.0, 22.0, body.h - 16.0);
            p.fill_round_rect(trail, 10.0, Color::rgba(80, 220, 255, 0.10));
        }
        shapes::neon_block(p, body, 12.0, palette::PLAYER);
    }
}
