//! One-Button Jumper
//!
//! Obstacles scroll in from the right at a speed that ramps up to a cap.
//! One input jumps. Clearing an obstacle is worth 120 points; survival earns
//! 55 points per second.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::audio::SoundCue;
use crate::engine::{GameModule, Intent};
use crate::renderer::{Color, Painter, palette, shapes};
use crate::sim::{
    Lifetime, ParticleSystem, Ramp, Rect, SimError, Simulation, Step, SurvivalScore, Valence,
    Viewport, ensure_finite, rect_overlap,
};

pub const MODULE: GameModule = GameModule {
    id: "jumper",
    name: "One-Button Jumper",
    controls: "SPACE / Click = Jump",
    build,
};

fn build(view: Viewport) -> Box<dyn Simulation> {
    Box::new(Jumper::new(view))
}

const GRAVITY: f32 = 1900.0;
const JUMP_IMPULSE: f32 = 720.0;
const PLAYER_SIZE: f32 = 34.0;
const CLEAR_POINTS: u64 = 120;
const SURVIVAL_RATE: f32 = 55.0;
/// Scroll speed (px/s) over elapsed seconds
const SPEED: Ramp = Ramp::new(340.0, 16.0, 340.0, 720.0);
const PARTICLE_GRAVITY: f32 = 1200.0;

#[derive(Debug, Clone)]
struct Obstacle {
    x: f32,
    w: f32,
    h: f32,
    passed: bool,
}

pub struct Jumper {
    view: Viewport,
    ground_y: f32,
    player_x: f32,
    /// Feet position
    player_y: f32,
    vy: f32,
    on_ground: bool,
    obstacles: Vec<Obstacle>,
    next_spawn: f32,
    elapsed: f32,
    speed: f32,
    score: u64,
    survival: SurvivalScore,
}

impl Jumper {
    pub fn new(view: Viewport) -> Self {
        let ground_y = (view.height * 0.86).floor();
        Self {
            view,
            ground_y,
            player_x: (view.width * 0.18).floor(),
            player_y: ground_y,
            vy: 0.0,
            on_ground: true,
            obstacles: Vec::new(),
            next_spawn: 0.6,
            elapsed: 0.0,
            speed: SPEED.at(0.0),
            score: 0,
            survival: SurvivalScore::default(),
        }
    }

    fn player_rect(&self) -> Rect {
        Rect::new(
            self.player_x,
            self.player_y - PLAYER_SIZE,
            PLAYER_SIZE,
            PLAYER_SIZE,
        )
    }

    fn obstacle_rect(&self, o: &Obstacle) -> Rect {
        Rect::new(o.x, self.ground_y - o.h, o.w, o.h)
    }

    fn spawn_obstacle(&mut self, rng: &mut Pcg32) {
        self.obstacles.push(Obstacle {
            x: self.view.width + 40.0,
            w: 22.0 + rng.random::<f32>() * 14.0,
            h: 60.0 + rng.random::<f32>() * 70.0,
            passed: false,
        });
    }

    fn jump(&mut self, step: &mut Step<'_>) {
        if !self.on_ground {
            return;
        }
        self.vy = -JUMP_IMPULSE;
        self.on_ground = false;
        let feet = Vec2::new(self.player_x + PLAYER_SIZE * 0.5, self.player_y);
        step.particles.spawn(step.rng, feet, 14, 260.0, Valence::Good);
        step.sound(SoundCue::Jump);
    }
}

impl Simulation for Jumper {
    fn reset(&mut self, _rng: &mut Pcg32) {
        *self = Self::new(self.view);
    }

    fn configure_particles(&self, particles: &mut ParticleSystem) {
        particles.set_gravity(PARTICLE_GRAVITY);
        particles.set_lifetime(Lifetime {
            min: 0.5,
            spread: 0.5,
        });
    }

    fn update(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        let dt = step.dt;
        self.elapsed += dt;
        self.speed = SPEED.at(self.elapsed);

        if step.input.just_pressed(Intent::Primary) {
            self.jump(step);
        }

        self.vy += GRAVITY * dt;
        self.player_y += self.vy * dt;
        if self.player_y >= self.ground_y {
            self.player_y = self.ground_y;
            self.vy = 0.0;
            self.on_ground = true;
        }
        ensure_finite(self.player_y, "player height")?;

        self.next_spawn -= dt;
        if self.next_spawn <= 0.0 {
            self.spawn_obstacle(step.rng);
            let tighten = (self.score as f32 / 4000.0).min(0.35);
            self.next_spawn = 0.9 + step.rng.random::<f32>() * 0.8 - tighten;
        }

        for o in self.obstacles.iter_mut() {
            o.x -= self.speed * dt;
            if !o.passed && o.x + o.w < self.player_x {
                o.passed = true;
                self.score += CLEAR_POINTS;
                step.sound(SoundCue::Score);
            }
        }
        self.obstacles.retain(|o| o.x >= -100.0);

        let player = self.player_rect();
        if self
            .obstacles
            .iter()
            .any(|o| rect_overlap(&player, &self.obstacle_rect(o)))
        {
            step.particles
                .spawn(step.rng, player.center(), 40, 420.0, Valence::Bad);
            step.game_over("Crashed into an obstacle");
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

        let lane = self.ground_y + 22.0;
        shapes::glow_line(p, lane, w);
        let off = ((time_ms * self.speed as f64 * 0.02) % 90.0) as f32;
        let mut x = -120.0;
        while x < w + 120.0 {
            p.line(
                Vec2::new(x - off, lane + 16.0),
                Vec2::new(x - off + 50.0, lane + 16.0),
                2.0,
                Color::rgba(255, 255, 255, 0.08),
            );
            x += 90.0;
        }

        for o in &self.obstacles {
            shapes::neon_block(p, self.obstacle_rect(o), 10.0, palette::HAZARD);
        }

        let body = self.player_rect();
        shapes::neon_block(p, body, 10.0, palette::PLAYER);
        let eye = Color::rgba(255, 255, 255, 0.65);
        p.fill_round_rect(Rect::new(body.x + 8.0, body.y + 10.0, 6.0, 6.0), 3.0, eye);
        p.fill_round_rect(Rect::new(body.x + 20.0, body.y + 10.0, 6.0, 6.0), 3.0, eye);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::harness::Harness;
    use rand::SeedableRng;

    fn game() -> (Jumper, Harness) {
        let mut sim = Jumper::new(Viewport::new(800.0, 400.0));
        let mut h = Harness::new(5);
        h.reset(&mut sim);
        (sim, h)
    }

    #[test]
    fn test_jump_arc_returns_to_ground() {
        let (mut sim, mut h) = game();
        sim.next_spawn = 100.0;
        h.press(&mut sim, Intent::Primary).unwrap();
        assert!(!sim.on_ground);
        assert!(sim.player_y < sim.ground_y);
        assert_eq!(h.sounds(), vec![SoundCue::Jump]);

        // Airborne: pressing again does nothing
        h.press(&mut sim, Intent::Primary).unwrap();
        assert_eq!(h.sounds().len(), 1);

        for _ in 0..120 {
            h.step(&mut sim, 1.0 / 60.0).unwrap();
        }
        assert!(sim.on_ground);
        assert_eq!(sim.player_y, sim.ground_y);
    }

    #[test]
    fn test_speed_ramps_to_cap() {
        let (mut sim, mut h) = game();
        sim.next_spawn = 1e9;
        for _ in 0..2000 {
            h.step(&mut sim, 0.033).unwrap();
        }
        assert_eq!(sim.speed, 720.0);
    }

    #[test]
    fn test_cleared_obstacle_scores_once() {
        let (mut sim, mut h) = game();
        sim.next_spawn = 100.0;
        sim.obstacles.push(Obstacle {
            x: sim.player_x - 40.0,
            w: 30.0,
            h: 80.0,
            passed: false,
        });
        h.step(&mut sim, 0.01).unwrap();
        h.step(&mut sim, 0.01).unwrap();
        assert_eq!(sim.score(), CLEAR_POINTS + 1);
        assert_eq!(h.sounds(), vec![SoundCue::Score]);
    }

    #[test]
    fn test_collision_ends_run() {
        let (mut sim, mut h) = game();
        sim.obstacles.push(Obstacle {
            x: sim.player_x + 10.0,
            w: 30.0,
            h: 80.0,
            passed: false,
        });
        h.step(&mut sim, 0.01).unwrap();
        assert_eq!(h.game_over_reason(), Some("Crashed into an obstacle"));
    }

    #[test]
    fn test_particles_fall() {
        let (sim, _) = game();
        let mut particles = ParticleSystem::new(10);
        sim.configure_particles(&mut particles);
        let mut rng = Pcg32::seed_from_u64(1);
        particles.spawn(&mut rng, Vec2::ZERO, 1, 0.0, Valence::Good);
        particles.integrate(0.1);
        assert!(particles.iter().all(|p| p.vel.y > 0.0));
    }
}
