//! Knife Thrower
//!
//! A wooden disc spins above the player. Each throw sends a knife straight up;
//! it sticks where it meets the rim unless another knife already sits within
//! `MIN_GAP` radians of that spot. Sticking every knife of a level clears it
//! and the next level spins faster with more knives.

use std::collections::BTreeMap;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::audio::SoundCue;
use crate::engine::{GameModule, Intent};
use crate::renderer::{Color, Painter, shapes};
use crate::sim::{
    Ramp, Rect, SimError, Simulation, Step, SurvivalScore, Valence, Viewport, circle_rect_overlap,
    ensure_finite,
};

pub const MODULE: GameModule = GameModule {
    id: "knives",
    name: "Knife Thrower",
    controls: "SPACE / Click = Throw",
    build,
};

fn build(view: Viewport) -> Box<dyn Simulation> {
    Box::new(Knives::new(view))
}

/// Knives per level, by levels cleared
const KNIVES_PER_LEVEL: Ramp = Ramp::new(6.0, 0.9, 6.0, 12.0);
/// Disc spin (rad/s), by levels cleared
const SPIN: Ramp = Ramp::new(1.12, 0.12, 1.12, 4.0);

/// Upward knife speed (px/s)
const THROW_SPEED: f32 = 1250.0;
const BLADE_LEN: f32 = 120.0;
const BLADE_W: f32 = 8.0;
/// Closest two knives may sit on the rim (rad)
const MIN_GAP: f32 = 0.20;
/// Chance per frame that the disc picks a new spin target
const RESPIN_CHANCE: f32 = 0.010;
const PASSIVE_RATE: f32 = 12.0;

const FLASH_GOOD: f32 = 0.20;
const FLASH_BAD: f32 = 0.24;

/// Wrap an angle into `(-PI, PI]`
pub fn wrap_angle(a: f32) -> f32 {
    let w = (a + PI).rem_euclid(TAU) - PI;
    if w <= -PI { w + TAU } else { w }
}

pub struct Knives {
    view: Viewport,
    score: u64,
    level: u32,
    knives_total: u32,
    hits: u32,
    knives_left: u32,
    rot: f32,
    rot_vel: f32,
    rot_vel_target: f32,
    /// Stuck knives as disc-local angles
    stuck: Vec<f32>,
    /// Tip height of the knife in flight
    flying: Option<f32>,
    survival: SurvivalScore,
    flash_good: f32,
    flash_bad: f32,
}

impl Knives {
    pub fn new(view: Viewport) -> Self {
        Self {
            view,
            score: 0,
            level: 1,
            knives_total: 6,
            hits: 0,
            knives_left: 6,
            rot: 0.0,
            rot_vel: 0.0,
            rot_vel_target: 0.0,
            stuck: Vec::new(),
            flying: None,
            survival: SurvivalScore::default(),
            flash_good: 0.0,
            flash_bad: 0.0,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    fn center(&self) -> Vec2 {
        Vec2::new(
            (self.view.width * 0.5).floor(),
            (self.view.height * 0.36).floor(),
        )
    }

    fn radius(&self) -> f32 {
        self.view.width.min(self.view.height) * 0.12
    }

    /// Where a thrown knife's tip starts
    fn launch_y(&self) -> f32 {
        (self.view.height * 0.86).floor() - BLADE_LEN
    }

    fn blade(&self, tip_y: f32) -> Rect {
        Rect::new(self.center().x - BLADE_W / 2.0, tip_y, BLADE_W, BLADE_LEN)
    }

    fn random_sign(rng: &mut Pcg32) -> f32 {
        if rng.random::<f32>() < 0.5 { -1.0 } else { 1.0 }
    }

    fn setup_level(&mut self, level: u32, rng: &mut Pcg32) {
        self.level = level;
        let cleared = (level - 1) as f32;
        self.knives_total = KNIVES_PER_LEVEL.at(cleared).floor() as u32;
        self.knives_left = self.knives_total;
        self.hits = 0;
        self.stuck.clear();
        self.flying = None;

        let base = SPIN.at(cleared);
        self.rot_vel = Self::random_sign(rng) * base;
        self.rot_vel_target = Self::random_sign(rng) * (base + 0.35 + rng.random::<f32>() * 0.4);
        self.flash_good = 0.18;
    }

    fn throw(&mut self, step: &mut Step<'_>) {
        if self.flying.is_some() || self.knives_left == 0 {
            return;
        }
        self.knives_left -= 1;
        let y = self.launch_y();
        self.flying = Some(y);
        let at = Vec2::new(self.center().x, y + BLADE_LEN);
        step.particles.spawn(step.rng, at, 10, 320.0, Valence::Good);
    }

    /// Knife reached the rim: stick it or end the run
    fn land(&mut self, step: &mut Step<'_>) {
        self.flying = None;
        let at = Vec2::new(self.center().x, self.center().y + self.radius() - 8.0);
        let local = wrap_angle(FRAC_PI_2 - self.rot);

        if self
            .stuck
            .iter()
            .any(|s| wrap_angle(local - s).abs() < MIN_GAP)
        {
            self.flash_bad = FLASH_BAD;
            step.particles.spawn(step.rng, at, 46, 640.0, Valence::Bad);
            step.sound(SoundCue::Miss);
            let meta = BTreeMap::from([("level".to_string(), self.level.into())]);
            step.game_over_with("Hit another knife", meta);
            return;
        }

        self.stuck.push(local);
        self.hits += 1;
        self.score += 160 + u64::from(self.level) * 14;
        self.flash_good = FLASH_GOOD;
        step.particles.spawn(step.rng, at, 28, 520.0, Valence::Good);
        step.sound(SoundCue::Score);

        if self.hits >= self.knives_total {
            self.score += 250 + u64::from(self.level) * 40;
            let next = self.level + 1;
            self.setup_level(next, step.rng);
        }
    }

    fn draw_knife(p: &mut dyn Painter, from: Vec2, dir: Vec2, len: f32) {
        let tip = from + dir * len;
        p.line(from, tip, 6.0, Color::rgba(255, 255, 255, 0.80));
        p.line(from - dir * 18.0, from, 6.0, Color::rgba(80, 220, 255, 0.45));
    }
}

impl Simulation for Knives {
    fn reset(&mut self, rng: &mut Pcg32) {
        self.score = 0;
        self.rot = 0.0;
        self.survival.reset();
        self.flash_bad = 0.0;
        self.setup_level(1, rng);
    }

    fn update(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        let dt = step.dt;
        self.flash_good = (self.flash_good - dt).max(0.0);
        self.flash_bad = (self.flash_bad - dt).max(0.0);

        self.rot_vel += (self.rot_vel_target - self.rot_vel) * (1.0 - 0.02f32.powf(dt));
        self.rot = wrap_angle(self.rot + self.rot_vel * dt);
        if step.rng.random::<f32>() < RESPIN_CHANCE {
            let base = SPIN.at((self.level - 1) as f32);
            self.rot_vel_target =
                Self::random_sign(step.rng) * (base + step.rng.random::<f32>() * 0.55);
        }
        ensure_finite(self.rot, "disc rotation")?;

        if step.input.just_pressed(Intent::Primary) {
            self.throw(step);
        }

        if let Some(y) = self.flying {
            let y = y - THROW_SPEED * dt;
            self.flying = Some(y);
            // Sticks once the tip is a little inside the rim
            if circle_rect_overlap(self.center(), self.radius() - 8.0, &self.blade(y)) {
                self.land(step);
                if step.is_over() {
                    return Ok(());
                }
            }
        }

        self.score += self.survival.advance(PASSIVE_RATE, dt);
        Ok(())
    }

    fn score(&self) -> u64 {
        self.score
    }

    fn draw(&self, p: &mut dyn Painter, time_ms: f64) {
        let (w, h) = (self.view.width, self.view.height);
        shapes::backdrop(p, w, h, time_ms);

        let c = self.center();
        let r = self.radius();
        p.fill_circle(c, r + 18.0, Color::rgba(0, 0, 0, 0.16));
        p.fill_circle(c, r, Color::rgba(150, 100, 60, 0.92));
        for i in 1..4 {
            p.fill_circle(c, r * (1.0 - i as f32 * 0.25), Color::rgba(0, 0, 0, 0.08));
        }
        // Grain mark so the spin is visible
        let mark = Vec2::new(self.rot.cos(), self.rot.sin());
        p.line(c, c + mark * r * 0.8, 3.0, Color::rgba(0, 0, 0, 0.22));
        p.fill_circle(c, r * 0.14, Color::rgba(80, 220, 255, 0.20));

        for a in &self.stuck {
            let angle = self.rot + a;
            let dir = Vec2::new(angle.cos(), angle.sin());
            Self::draw_knife(p, c + dir * (r - 10.0), dir, BLADE_LEN * 0.6);
        }

        if let Some(y) = self.flying {
            let blade = self.blade(y);
            p.fill_round_rect(
                Rect::new(blade.x, blade.y, blade.w, blade.h - 16.0),
                7.0,
                Color::rgba(255, 255, 255, 0.85),
            );
            p.fill_round_rect(
                Rect::new(blade.x, blade.bottom() - 20.0, blade.w, 20.0),
                7.0,
                Color::rgba(80, 220, 255, 0.35),
            );
        }

        // Knives still to throw
        for i in 0..self.knives_left {
            let y = h - 24.0 - i as f32 * 14.0;
            p.fill_round_rect(Rect::new(w - 40.0, y, 18.0, 6.0), 3.0, Color::rgba(255, 255, 255, 0.55));
        }

        if self.flash_good > 0.0 {
            let a = 0.16 * self.flash_good / FLASH_GOOD;
            p.fill_rect(Rect::new(0.0, 0.0, w, h), Color::rgba(80, 220, 255, a));
        }
        if self.flash_bad > 0.0 {
            let a = 0.18 * self.flash_bad / FLASH_BAD;
            p.fill_rect(Rect::new(0.0, 0.0, w, h), Color::rgba(255, 90, 90, a));
        }
    }

    fn draw_hud(&self, p: &mut dyn Painter) {
        shapes::score_label(p, self.score);
        shapes::hud_line(p, 0, &format!("Level: {}", self.level));
        shapes::hud_line(p, 1, &format!("Hits: {}/{}", self.hits, self.knives_total));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::harness::Harness;

    fn game() -> (Knives, Harness) {
        let mut sim = Knives::new(Viewport::new(800.0, 500.0));
        let mut h = Harness::new(5);
        h.reset(&mut sim);
        (sim, h)
    }

    /// Put a knife right at the rim with the disc at a known angle
    fn arm(sim: &mut Knives, rot: f32) {
        sim.rot = rot;
        sim.rot_vel = 0.0;
        sim.rot_vel_target = 0.0;
        sim.flying = Some(sim.center().y + sim.radius() - 9.0);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-5);
        assert!((wrap_angle(-FRAC_PI_2) + FRAC_PI_2).abs() < 1e-6);
        assert!((wrap_angle(TAU + 0.5) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_reset_sets_up_first_level() {
        let (sim, _) = game();
        assert_eq!(sim.level(), 1);
        assert_eq!(sim.knives_total, 6);
        assert_eq!(sim.knives_left, 6);
        assert!(sim.rot_vel.abs() >= SPIN.at(0.0) - 1e-6);
    }

    #[test]
    fn test_one_knife_in_flight() {
        let (mut sim, mut h) = game();
        h.press(&mut sim, Intent::Primary).unwrap();
        assert!(sim.flying.is_some());
        assert_eq!(sim.knives_left, 5);
        h.press(&mut sim, Intent::Primary).unwrap();
        assert_eq!(sim.knives_left, 5);
    }

    #[test]
    fn test_thrown_knife_sticks() {
        let (mut sim, mut h) = game();
        h.press(&mut sim, Intent::Primary).unwrap();
        for _ in 0..30 {
            h.step(&mut sim, 1.0 / 60.0).unwrap();
        }
        assert!(sim.flying.is_none());
        assert_eq!(sim.hits, 1);
        assert_eq!(sim.stuck.len(), 1);
        assert!(sim.score() >= 174, "got {}", sim.score());
        assert!(h.game_over_reason().is_none());
    }

    #[test]
    fn test_stick_scores_by_level() {
        let (mut sim, mut h) = game();
        arm(&mut sim, 0.0);
        h.step(&mut sim, 0.0).unwrap();
        assert_eq!(sim.score(), 160 + 14);
        assert_eq!(sim.stuck.len(), 1);
        assert!((sim.stuck[0] - FRAC_PI_2).abs() < 1e-5);
        assert_eq!(h.sounds(), vec![SoundCue::Score]);
    }

    #[test]
    fn test_clearing_a_level() {
        let (mut sim, mut h) = game();
        sim.hits = sim.knives_total - 1;
        arm(&mut sim, 0.0);
        h.step(&mut sim, 0.0).unwrap();
        assert_eq!(sim.score(), 174 + 290);
        assert_eq!(sim.level(), 2);
        assert_eq!(sim.hits, 0);
        assert!(sim.stuck.is_empty());

        sim.hits = sim.knives_total - 1;
        arm(&mut sim, 0.0);
        h.step(&mut sim, 0.0).unwrap();
        assert_eq!(sim.level(), 3);
        assert_eq!(sim.knives_total, 7);
        assert_eq!(sim.knives_left, 7);
    }

    #[test]
    fn test_hitting_a_knife_ends_the_run() {
        let (mut sim, mut h) = game();
        sim.stuck.push(FRAC_PI_2 + 0.1);
        arm(&mut sim, 0.0);
        h.step(&mut sim, 0.0).unwrap();
        assert_eq!(h.game_over_reason(), Some("Hit another knife"));
        assert_eq!(h.sounds(), vec![SoundCue::Miss]);
        assert_eq!(sim.score(), 0);
    }

    #[test]
    fn test_spacing_is_measured_on_the_disc() {
        let (mut sim, mut h) = game();
        // Same rim spot as before, but the disc turned half a revolution
        sim.stuck.push(FRAC_PI_2);
        arm(&mut sim, PI);
        h.step(&mut sim, 0.0).unwrap();
        assert!(h.game_over_reason().is_none());
        assert_eq!(sim.stuck.len(), 2);
    }
}
