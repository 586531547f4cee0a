//! Stop at the Right Time
//!
//! A cursor sweeps back and forth over a bar. Stopping it inside the target
//! zone scores `120 + combo * 25`, shrinks the zone and speeds the cursor up.
//! A miss breaks the combo, eases both back a little and costs a life.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::audio::SoundCue;
use crate::engine::{GameModule, Intent};
use crate::renderer::{Color, Painter, shapes};
use crate::sim::{Rect, SimError, Simulation, Step, Valence, Viewport, ensure_finite};

pub const MODULE: GameModule = GameModule {
    id: "stop",
    name: "Stop at the Right Time",
    controls: "SPACE / Click = Stop",
    build,
};

fn build(view: Viewport) -> Box<dyn Simulation> {
    Box::new(Stopper::new(view))
}

const LIVES: u32 = 3;
const HIT_BASE: u64 = 120;
const COMBO_BONUS: u64 = 25;

/// Cursor speed in bar widths per second
const START_SPEED: f32 = 1.05;
const MIN_SPEED: f32 = 1.0;
const MAX_SPEED: f32 = 2.4;

/// Target zone width as a fraction of the bar
const START_WIDTH: f32 = 0.20;
const MIN_WIDTH: f32 = 0.07;
const MAX_WIDTH: f32 = 0.24;

const FLASH_GOOD: f32 = 0.22;
const FLASH_BAD: f32 = 0.26;

pub struct Stopper {
    view: Viewport,
    score: u64,
    combo: u32,
    level: u32,
    lives: u32,
    /// Cursor position on the bar, 0..=1
    x: f32,
    dir: f32,
    speed: f32,
    target_center: f32,
    target_width: f32,
    flash_good: f32,
    flash_bad: f32,
}

impl Stopper {
    pub fn new(view: Viewport) -> Self {
        Self {
            view,
            score: 0,
            combo: 0,
            level: 1,
            lives: LIVES,
            x: 0.2,
            dir: 1.0,
            speed: START_SPEED,
            target_center: 0.72,
            target_width: START_WIDTH,
            flash_good: 0.0,
            flash_bad: 0.0,
        }
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    fn bar(&self) -> Rect {
        let (w, h) = (self.view.width, self.view.height);
        Rect::new(
            (w * 0.12).floor(),
            (h * 0.52).floor(),
            (w * 0.76).floor(),
            (h * 0.07).floor().max(18.0),
        )
    }

    /// Zone bounds on the bar
    fn zone(&self) -> (f32, f32) {
        let half = self.target_width / 2.0;
        (self.target_center - half, self.target_center + half)
    }

    fn in_zone(&self) -> bool {
        let (left, right) = self.zone();
        self.x >= left && self.x <= right
    }

    fn move_target(&mut self, rng: &mut Pcg32) {
        self.target_center = 0.15 + rng.random::<f32>() * 0.70;
    }

    fn attempt_stop(&mut self, step: &mut Step<'_>) {
        let bar = self.bar();
        let at = Vec2::new(bar.x + self.x * bar.w, bar.center().y);

        if self.in_zone() {
            self.combo += 1;
            self.level += 1;
            self.score += HIT_BASE + u64::from(self.combo) * COMBO_BONUS;
            self.target_width = (self.target_width * 0.92).max(MIN_WIDTH);
            self.speed = (self.speed + 0.08).min(MAX_SPEED);
            self.flash_good = FLASH_GOOD;
            step.particles.spawn(step.rng, at, 26, 420.0, Valence::Good);
            step.sound(SoundCue::Score);
        } else {
            self.combo = 0;
            self.lives = self.lives.saturating_sub(1);
            self.target_width = (self.target_width * 1.08).min(MAX_WIDTH);
            self.speed = (self.speed - 0.06).max(MIN_SPEED);
            self.flash_bad = FLASH_BAD;
            step.particles.spawn(step.rng, at, 30, 520.0, Valence::Bad);
            step.sound(SoundCue::Miss);
        }
        self.move_target(step.rng);

        if self.lives == 0 {
            let meta = BTreeMap::from([("level".to_string(), self.level.into())]);
            step.game_over_with("Out of lives", meta);
        }
    }
}

impl Simulation for Stopper {
    fn reset(&mut self, _rng: &mut Pcg32) {
        *self = Self::new(self.view);
    }

    fn update(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        let dt = step.dt;
        self.flash_good = (self.flash_good - dt).max(0.0);
        self.flash_bad = (self.flash_bad - dt).max(0.0);

        if step.input.just_pressed(Intent::Primary) {
            self.attempt_stop(step);
            if step.is_over() {
                return Ok(());
            }
        }

        self.x += self.dir * self.speed * dt;
        if self.x <= 0.0 {
            self.x = 0.0;
            self.dir = 1.0;
        }
        if self.x >= 1.0 {
            self.x = 1.0;
            self.dir = -1.0;
        }
        ensure_finite(self.x, "cursor position")?;
        Ok(())
    }

    fn score(&self) -> u64 {
        self.score
    }

    fn draw(&self, p: &mut dyn Painter, time_ms: f64) {
        shapes::backdrop(p, self.view.width, self.view.height, time_ms);

        let bar = self.bar();
        p.fill_round_rect(bar, 16.0, Color::rgba(0, 0, 0, 0.20));

        let (left, right) = self.zone();
        let (left, right) = (left.clamp(0.0, 1.0), right.clamp(0.0, 1.0));
        let zone = Rect::new(
            bar.x + left * bar.w,
            bar.y + 4.0,
            (right - left) * bar.w,
            bar.h - 8.0,
        );
        p.fill_round_rect(zone, 12.0, Color::rgba(80, 220, 255, 0.40));

        let cx = bar.x + self.x * bar.w;
        p.fill_round_rect(
            Rect::new(cx - 8.0, bar.y - 10.0, 16.0, bar.h + 20.0),
            10.0,
            Color::rgba(255, 255, 255, 0.80),
        );
        p.line(
            Vec2::new(cx, bar.y - 14.0),
            Vec2::new(cx, bar.y - 2.0),
            6.0,
            Color::rgba(255, 255, 255, 0.75),
        );

        if self.flash_good > 0.0 {
            let a = 0.20 * self.flash_good / FLASH_GOOD;
            p.fill_round_rect(bar, 16.0, Color::rgba(80, 220, 255, a));
        }
        if self.flash_bad > 0.0 {
            let a = 0.22 * self.flash_bad / FLASH_BAD;
            p.fill_round_rect(bar, 16.0, Color::rgba(255, 90, 90, a));
        }
    }

    fn draw_hud(&self, p: &mut dyn Painter) {
        shapes::score_label(p, self.score);
        shapes::hud_line(p, 0, &format!("Level: {}", self.level));
        shapes::hud_line(p, 1, &format!("Combo: x{}", self.combo));
        shapes::hud_line(p, 2, &format!("Lives: {}", self.lives));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimEvent;
    use crate::sim::harness::Harness;

    fn game() -> (Stopper, Harness) {
        let mut sim = Stopper::new(Viewport::new(800.0, 500.0));
        let mut h = Harness::new(9);
        h.reset(&mut sim);
        (sim, h)
    }

    fn aim(sim: &mut Stopper, hit: bool) {
        sim.target_center = 0.5;
        sim.x = if hit { 0.5 } else { 0.05 };
        sim.dir = 1.0;
    }

    #[test]
    fn test_cursor_bounces() {
        let (mut sim, mut h) = game();
        for _ in 0..60 {
            h.step(&mut sim, 1.0 / 60.0).unwrap();
        }
        assert_eq!(sim.dir, -1.0);
        assert!(sim.x < 1.0 && sim.x > 0.0);
    }

    #[test]
    fn test_hit_scores_with_combo() {
        let (mut sim, mut h) = game();
        aim(&mut sim, true);
        h.press(&mut sim, Intent::Primary).unwrap();
        assert_eq!(sim.score(), 145);
        aim(&mut sim, true);
        h.press(&mut sim, Intent::Primary).unwrap();
        assert_eq!(sim.score(), 145 + 170);
        assert_eq!(sim.combo, 2);
        assert_eq!(sim.level, 3);
        assert!(sim.target_width < START_WIDTH);
        assert!(sim.speed > START_SPEED);
        assert_eq!(h.sounds(), vec![SoundCue::Score, SoundCue::Score]);
    }

    #[test]
    fn test_difficulty_stays_bounded() {
        let (mut sim, mut h) = game();
        for _ in 0..80 {
            aim(&mut sim, true);
            h.press(&mut sim, Intent::Primary).unwrap();
        }
        assert_eq!(sim.target_width, MIN_WIDTH);
        assert_eq!(sim.speed, MAX_SPEED);
    }

    #[test]
    fn test_miss_costs_life_and_combo() {
        let (mut sim, mut h) = game();
        aim(&mut sim, true);
        h.press(&mut sim, Intent::Primary).unwrap();
        aim(&mut sim, false);
        h.press(&mut sim, Intent::Primary).unwrap();
        assert_eq!(sim.combo, 0);
        assert_eq!(sim.lives(), LIVES - 1);
        assert_eq!(sim.score(), 145);
        assert!(h.game_over_reason().is_none());
    }

    #[test]
    fn test_out_of_lives() {
        let (mut sim, mut h) = game();
        for _ in 0..LIVES {
            aim(&mut sim, false);
            h.press(&mut sim, Intent::Primary).unwrap();
        }
        assert_eq!(h.game_over_reason(), Some("Out of lives"));
        let level = h.events.iter().find_map(|e| match e {
            SimEvent::GameOver { meta, .. } => meta.get("level").cloned(),
            _ => None,
        });
        assert_eq!(level, Some(serde_json::json!(1)));
    }
}
