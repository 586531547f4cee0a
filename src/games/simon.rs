//! Simon Says
//!
//! The game plays a growing sequence on four pads and the player repeats it
//! with keys 1-4 or by clicking the pads. The beat tightens every round.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::audio::SoundCue;
use crate::engine::{GameModule, Intent, SLOT_COUNT};
use crate::renderer::{Color, Painter, TextAlign, palette, shapes};
use crate::sim::{Lifetime, ParticleSystem, Rect, SimError, Simulation, Step, Valence, Viewport};

pub const MODULE: GameModule = GameModule {
    id: "simon",
    name: "Simon Says",
    controls: "1-4 / Click = Press pad",
    build,
};

fn build(view: Viewport) -> Box<dyn Simulation> {
    Box::new(Simon::new(view))
}

const BEAT_START: f32 = 0.55;
const BEAT_MIN: f32 = 0.22;
const BEAT_STEP: f32 = 0.02;
/// Delay before the first flash of a round
const LEAD_IN: f32 = 0.15;
/// Pause after a cleared round
const ROUND_PAUSE: f32 = 0.40;
const FLASH_GOOD: f32 = 0.18;
const FLASH_BAD: f32 = 0.22;

const PAD_COLORS: [Color; SLOT_COUNT] = [
    Color::rgba(120, 180, 255, 0.22),
    Color::rgba(80, 220, 255, 0.22),
    Color::rgba(140, 255, 200, 0.22),
    Color::rgba(255, 220, 120, 0.22),
];

/// Seconds between flashes in `round`
pub fn beat_for(round: u32) -> f32 {
    (BEAT_START - round as f32 * BEAT_STEP).clamp(BEAT_MIN, BEAT_START)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Show,
    Input,
}

pub struct Simon {
    view: Viewport,
    score: u64,
    round: u32,
    seq: Vec<u8>,
    mode: Mode,
    input_index: usize,
    show_index: usize,
    show_timer: f32,
    beat: f32,
    flash_pad: Option<u8>,
    flash_timer: f32,
}

impl Simon {
    pub fn new(view: Viewport) -> Self {
        Self {
            view,
            score: 0,
            round: 0,
            seq: Vec::new(),
            mode: Mode::Idle,
            input_index: 0,
            show_index: 0,
            show_timer: 0.0,
            beat: BEAT_START,
            flash_pad: None,
            flash_timer: 0.0,
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Pad `i` in reading order: top-left, top-right, bottom-left, bottom-right
    fn pad_rect(&self, i: u8) -> Rect {
        let size = self.view.width.min(self.view.height) * 0.62;
        let panel = Vec2::new(
            ((self.view.width - size) / 2.0).floor(),
            ((self.view.height - size) / 2.0).floor() + 10.0,
        );
        let gap = (size * 0.03).floor().max(14.0);
        let cell = ((size - gap * 3.0) / 2.0).floor();
        let (row, col) = (f32::from(i / 2), f32::from(i % 2));
        Rect::new(
            panel.x + gap + col * (cell + gap),
            panel.y + gap + row * (cell + gap),
            cell,
            cell,
        )
    }

    fn pad_at(&self, pos: Vec2) -> Option<u8> {
        (0..SLOT_COUNT as u8).find(|&i| self.pad_rect(i).contains(pos))
    }

    fn next_round(&mut self, rng: &mut Pcg32) {
        self.round += 1;
        self.input_index = 0;
        self.beat = beat_for(self.round);
        self.seq.push(rng.random_range(0..SLOT_COUNT as u8));
        self.mode = Mode::Show;
        self.show_index = 0;
        self.show_timer = LEAD_IN;
        self.flash_pad = None;
        self.flash_timer = 0.0;
    }

    fn flash(&mut self, pad: u8, good: bool, step: &mut Step<'_>) {
        self.flash_pad = Some(pad);
        self.flash_timer = if good { FLASH_GOOD } else { FLASH_BAD };
        let at = self.pad_rect(pad).center();
        if good {
            step.particles.spawn(step.rng, at, 18, 520.0, Valence::Good);
            step.sound(SoundCue::Pad(pad));
        } else {
            step.particles.spawn(step.rng, at, 28, 680.0, Valence::Bad);
            step.sound(SoundCue::Miss);
        }
    }

    fn press_pad(&mut self, pad: u8, step: &mut Step<'_>) {
        let Some(&expected) = self.seq.get(self.input_index) else {
            return;
        };
        if pad != expected {
            self.flash(pad, false, step);
            let meta = BTreeMap::from([("round".to_string(), self.round.into())]);
            step.game_over_with(format!("Wrong pad in round {}", self.round), meta);
            return;
        }

        self.flash(pad, true, step);
        self.score += 120 + u64::from(self.round) * 15;
        self.input_index += 1;
        if self.input_index >= self.seq.len() {
            self.score += 250 + u64::from(self.round) * 35;
            self.mode = Mode::Show;
            self.show_index = 0;
            self.show_timer = ROUND_PAUSE;
        }
    }

    fn pressed_pads(&self, step: &Step<'_>) -> Vec<u8> {
        let keys = step.input.pressed.iter().filter_map(|intent| match intent {
            Intent::Slot(i) if usize::from(*i) < SLOT_COUNT => Some(*i),
            _ => None,
        });
        let taps = step.input.taps.iter().filter_map(|pos| self.pad_at(*pos));
        keys.chain(taps).collect()
    }

    fn show(&mut self, step: &mut Step<'_>) {
        self.show_timer -= step.dt;
        if self.show_timer > 0.0 {
            return;
        }
        if self.input_index >= self.seq.len() {
            self.next_round(step.rng);
            return;
        }
        let Some(&pad) = self.seq.get(self.show_index) else {
            self.mode = Mode::Input;
            return;
        };
        self.flash(pad, true, step);
        self.show_index += 1;
        if self.show_index >= self.seq.len() {
            self.mode = Mode::Input;
            self.show_index = 0;
            self.show_timer = 0.0;
        } else {
            self.show_timer = self.beat;
        }
    }
}

impl Simulation for Simon {
    fn reset(&mut self, _rng: &mut Pcg32) {
        *self = Self::new(self.view);
    }

    fn configure_particles(&self, particles: &mut ParticleSystem) {
        particles.set_lifetime(Lifetime {
            min: 0.30,
            spread: 0.55,
        });
    }

    fn engage(&mut self, step: &mut Step<'_>) {
        if self.mode == Mode::Idle {
            self.next_round(step.rng);
        }
    }

    fn update(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        if self.flash_timer > 0.0 {
            self.flash_timer -= step.dt;
            if self.flash_timer <= 0.0 {
                self.flash_pad = None;
            }
        }

        match self.mode {
            Mode::Idle => self.next_round(step.rng),
            Mode::Show => self.show(step),
            Mode::Input => {
                for pad in self.pressed_pads(step) {
                    self.press_pad(pad, step);
                    if step.is_over() || self.mode != Mode::Input {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn score(&self) -> u64 {
        self.score
    }

    fn draw(&self, p: &mut dyn Painter, time_ms: f64) {
        shapes::backdrop(p, self.view.width, self.view.height, time_ms);

        let first = self.pad_rect(0);
        let last = self.pad_rect(3);
        let panel = Rect::new(
            first.x - 14.0,
            first.y - 14.0,
            last.right() - first.x + 28.0,
            last.bottom() - first.y + 28.0,
        );
        p.fill_round_rect(panel, 22.0, Color::rgba(0, 0, 0, 0.18));

        for (i, color) in PAD_COLORS.iter().enumerate() {
            let pad = i as u8;
            let r = self.pad_rect(pad);
            p.fill_round_rect(r, 18.0, *color);
            p.fill_round_rect(
                Rect::new(r.x + 10.0, r.y + 12.0, (r.w * 0.22).max(12.0), r.h - 24.0),
                16.0,
                Color::rgba(255, 255, 255, 0.08),
            );
            if self.flash_pad == Some(pad) && self.flash_timer > 0.0 {
                let k = (self.flash_timer / FLASH_GOOD).min(1.0);
                p.fill_round_rect(r, 18.0, Color::rgba(255, 255, 255, 0.12 + 0.25 * k));
            }
            p.text(
                &(i + 1).to_string(),
                r.center() + Vec2::new(0.0, 6.0),
                18.0,
                TextAlign::Center,
                Color::rgba(255, 255, 255, 0.62),
            );
        }
    }

    fn draw_hud(&self, p: &mut dyn Painter) {
        shapes::score_label(p, self.score);
        let status = match self.mode {
            Mode::Idle => "Press 1-4 or click a pad",
            Mode::Show => "Watch...",
            Mode::Input => "Your turn!",
        };
        shapes::hud_line(p, 0, &format!("Round: {}  •  {status}", self.round));
        if self.mode == Mode::Input {
            p.text(
                &format!("{} / {}", self.input_index, self.seq.len()),
                Vec2::new(self.view.width - 18.0, 30.0),
                15.0,
                TextAlign::Right,
                palette::TEXT_DIM,
            );
        }
    }
}
