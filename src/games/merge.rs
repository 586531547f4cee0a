//! Mini-2048
//!
//! Tiles slide on a 4×4 board; equal neighbours merge once per move and the
//! merged value is added to the score. After each slide a 2 (90%) or a 4
//! appears in a free cell. The run ends once no move can change the board.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::audio::SoundCue;
use crate::engine::{GameModule, Intent};
use crate::renderer::{Color, Painter, TextAlign, shapes};
use crate::sim::{Lifetime, ParticleSystem, Rect, SimError, Simulation, Step, Valence, Viewport};

pub const MODULE: GameModule = GameModule {
    id: "merge",
    name: "Mini-2048",
    controls: "Arrows / WASD / Swipe",
    build,
};

fn build(view: Viewport) -> Box<dyn Simulation> {
    Box::new(Merge::new(view))
}

pub const N: usize = 4;
const SLIDE_TIME: f32 = 0.12;
const PAD: f32 = 18.0;

pub type Board = [[u32; N]; N];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    Left,
    Right,
    Up,
    Down,
}

impl Dir {
    const ALL: [(Intent, Dir); 4] = [
        (Intent::MoveLeft, Dir::Left),
        (Intent::MoveRight, Dir::Right),
        (Intent::MoveUp, Dir::Up),
        (Intent::MoveDown, Dir::Down),
    ];

    /// Board cell of slot `i` on `line`, slot 0 being the edge tiles slide to
    fn cell(self, line: usize, i: usize) -> (usize, usize) {
        match self {
            Dir::Left => (line, i),
            Dir::Right => (line, N - 1 - i),
            Dir::Up => (i, line),
            Dir::Down => (N - 1 - i, line),
        }
    }
}

/// One tile's travel during the slide animation
#[derive(Debug, Clone, Copy, PartialEq)]
struct Slide {
    from: (usize, usize),
    to: (usize, usize),
    value: u32,
    merged: bool,
}

/// A move in flight: the board shown once it lands
#[derive(Debug, Clone)]
struct Pending {
    board: Board,
    slides: Vec<Slide>,
    t: f32,
}

/// Result of compacting one line toward slot 0
#[derive(Debug, Clone, PartialEq, Eq)]
struct LineMove {
    out: [u32; N],
    gained: u64,
    /// (from slot, to slot, merged)
    travel: Vec<(usize, usize, bool)>,
}

fn compact(line: [u32; N]) -> LineMove {
    let mut out = [0; N];
    let mut travel = Vec::new();
    let mut gained = 0;
    let mut write = 0;
    let mut open_merge = false;

    for (from, &v) in line.iter().enumerate() {
        if v == 0 {
            continue;
        }
        if open_merge && out[write - 1] == v {
            out[write - 1] = v * 2;
            gained += u64::from(v * 2);
            travel.push((from, write - 1, true));
            open_merge = false;
        } else {
            out[write] = v;
            travel.push((from, write, false));
            write += 1;
            open_merge = true;
        }
    }
    LineMove {
        out,
        gained,
        travel,
    }
}

/// Whether any slide would change `board`
pub fn can_move(board: &Board) -> bool {
    for r in 0..N {
        for c in 0..N {
            let v = board[r][c];
            if v == 0 {
                return true;
            }
            if c + 1 < N && board[r][c + 1] == v {
                return true;
            }
            if r + 1 < N && board[r + 1][c] == v {
                return true;
            }
        }
    }
    false
}

fn tile_color(v: u32) -> Color {
    match v {
        0..=4 => Color::rgba(140, 180, 255, 0.22),
        5..=16 => Color::rgba(80, 220, 255, 0.22),
        17..=64 => Color::rgba(120, 255, 200, 0.22),
        65..=256 => Color::rgba(255, 220, 120, 0.22),
        _ => Color::rgba(255, 120, 180, 0.22),
    }
}

struct Layout {
    origin: Vec2,
    board: f32,
    cell: f32,
    gap: f32,
}

pub struct Merge {
    view: Viewport,
    board: Board,
    score: u64,
    pending: Option<Pending>,
    /// Board restored by `reset` instead of a fresh one
    preset: Option<(Board, u64)>,
}

impl Merge {
    pub fn new(view: Viewport) -> Self {
        Self {
            view,
            board: [[0; N]; N],
            score: 0,
            pending: None,
            preset: None,
        }
    }

    /// Start every run from `board` with `score` already banked
    pub fn with_layout(view: Viewport, board: Board, score: u64) -> Self {
        Self {
            preset: Some((board, score)),
            ..Self::new(view)
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    fn layout(&self) -> Layout {
        let size = (self.view.width.min(self.view.height) - PAD * 2.0).max(0.0);
        let gap = (size * 0.03).floor().max(10.0);
        let cell = ((size - gap * (N as f32 + 1.0)) / N as f32).floor().max(0.0);
        let board = cell * N as f32 + gap * (N as f32 + 1.0);
        let origin = Vec2::new(
            ((self.view.width - board) * 0.5).floor(),
            ((self.view.height - board) * 0.5).floor(),
        );
        Layout {
            origin,
            board,
            cell,
            gap,
        }
    }

    fn cell_pos(&self, (r, c): (usize, usize)) -> Vec2 {
        let l = self.layout();
        l.origin + Vec2::new(
            l.gap + c as f32 * (l.cell + l.gap),
            l.gap + r as f32 * (l.cell + l.gap),
        )
    }

    fn cell_center(&self, at: (usize, usize)) -> Vec2 {
        let half = self.layout().cell * 0.5;
        self.cell_pos(at) + Vec2::splat(half)
    }

    /// Place a 2 or a 4 in a random empty cell
    fn spawn_tile(&mut self, step: &mut Step<'_>) {
        let Some(at) = Self::pick_empty(&self.board, step.rng) else {
            return;
        };
        self.board[at.0][at.1] = if step.rng.random::<f32>() < 0.9 { 2 } else { 4 };
        let center = self.cell_center(at);
        step.particles
            .spawn(step.rng, center, 10, 380.0, Valence::Good);
    }

    fn pick_empty(board: &Board, rng: &mut Pcg32) -> Option<(usize, usize)> {
        let empty: Vec<(usize, usize)> = (0..N)
            .flat_map(|r| (0..N).map(move |c| (r, c)))
            .filter(|&(r, c)| board[r][c] == 0)
            .collect();
        if empty.is_empty() {
            None
        } else {
            Some(empty[rng.random_range(0..empty.len())])
        }
    }

    fn plan(&self, dir: Dir) -> Option<(Pending, u64)> {
        let mut board = [[0; N]; N];
        let mut slides = Vec::new();
        let mut gained = 0;
        for line in 0..N {
            let cells: [u32; N] = std::array::from_fn(|i| {
                let (r, c) = dir.cell(line, i);
                self.board[r][c]
            });
            let moved = compact(cells);
            gained += moved.gained;
            for (i, v) in moved.out.iter().enumerate() {
                let (r, c) = dir.cell(line, i);
                board[r][c] = *v;
            }
            for (from, to, merged) in moved.travel {
                slides.push(Slide {
                    from: dir.cell(line, from),
                    to: dir.cell(line, to),
                    value: cells[from],
                    merged,
                });
            }
        }
        if board == self.board {
            return None;
        }
        Some((
            Pending {
                board,
                slides,
                t: 0.0,
            },
            gained,
        ))
    }

    fn try_move(&mut self, dir: Dir, step: &mut Step<'_>) {
        if !can_move(&self.board) {
            step.sound(SoundCue::Miss);
            step.game_over("No moves left");
            return;
        }
        let Some((pending, gained)) = self.plan(dir) else {
            return;
        };
        self.score += gained;
        if gained > 0 {
            step.sound(SoundCue::Merge);
            for s in pending.slides.iter().filter(|s| s.merged) {
                let at = self.cell_center(s.to);
                step.particles.spawn(step.rng, at, 14, 520.0, Valence::Good);
            }
        }
        self.pending = Some(pending);
    }

    fn land(&mut self, board: Board, step: &mut Step<'_>) {
        self.board = board;
        self.spawn_tile(step);
        if !can_move(&self.board) {
            step.sound(SoundCue::Miss);
            step.game_over("No moves left");
        }
    }

    fn draw_tile(&self, p: &mut dyn Painter, pos: Vec2, value: u32, pop: f32) {
        let cell = self.layout().cell;
        let size = cell * (1.0 + pop * 0.10);
        let rect = Rect::new(
            pos.x + (cell - size) * 0.5,
            pos.y + (cell - size) * 0.5,
            size,
            size,
        );
        p.fill_round_rect(rect, 16.0, tile_color(value));
        p.fill_round_rect(
            Rect::new(rect.x + 8.0, rect.y + 10.0, (size * 0.18).max(10.0), size - 20.0),
            14.0,
            Color::rgba(255, 255, 255, 0.08),
        );
        let font = (18.0 + (value.max(1) as f32).log2() * 2.0).floor();
        p.text(
            &value.to_string(),
            rect.center() + Vec2::new(0.0, font * 0.35),
            font,
            TextAlign::Center,
            Color::rgba(255, 255, 255, 0.92),
        );
    }
}

impl Simulation for Merge {
    fn reset(&mut self, rng: &mut Pcg32) {
        self.pending = None;
        if let Some((board, score)) = self.preset {
            self.board = board;
            self.score = score;
            return;
        }
        self.board = [[0; N]; N];
        self.score = 0;
        for _ in 0..2 {
            if let Some((r, c)) = Self::pick_empty(&self.board, rng) {
                self.board[r][c] = if rng.random::<f32>() < 0.9 { 2 } else { 4 };
            }
        }
    }

    fn wants_start_screen(&self) -> bool {
        false
    }

    fn configure_particles(&self, particles: &mut ParticleSystem) {
        particles.set_lifetime(Lifetime {
            min: 0.25,
            spread: 0.45,
        });
    }

    fn update(&mut self, step: &mut Step<'_>) -> Result<(), SimError> {
        if let Some(pending) = self.pending.as_mut() {
            pending.t += step.dt / SLIDE_TIME;
            if pending.t >= 1.0 {
                let board = pending.board;
                self.pending = None;
                self.land(board, step);
            }
            return Ok(());
        }

        let dir = Dir::ALL
            .iter()
            .find(|(intent, _)| step.input.just_pressed(*intent))
            .map(|&(_, dir)| dir);
        if let Some(dir) = dir {
            self.try_move(dir, step);
        }
        Ok(())
    }

    fn score(&self) -> u64 {
        self.score
    }

    fn draw(&self, p: &mut dyn Painter, time_ms: f64) {
        shapes::backdrop(p, self.view.width, self.view.height, time_ms);

        let l = self.layout();
        p.fill_round_rect(
            Rect::new(l.origin.x, l.origin.y, l.board, l.board),
            18.0,
            Color::rgba(0, 0, 0, 0.18),
        );
        for r in 0..N {
            for c in 0..N {
                let pos = self.cell_pos((r, c));
                p.fill_round_rect(
                    Rect::new(pos.x, pos.y, l.cell, l.cell),
                    14.0,
                    Color::rgba(255, 255, 255, 0.04),
                );
            }
        }

        match &self.pending {
            Some(pending) => {
                let t = pending.t.clamp(0.0, 1.0);
                let ease = 1.0 - (1.0 - t).powi(3);
                for s in &pending.slides {
                    let pos = self.cell_pos(s.from).lerp(self.cell_pos(s.to), ease);
                    let pop = if s.merged { (t * std::f32::consts::PI).sin() } else { 0.0 };
                    self.draw_tile(p, pos, s.value, pop);
                }
            }
            None => {
                for r in 0..N {
                    for c in 0..N {
                        let v = self.board[r][c];
                        if v != 0 {
                            self.draw_tile(p, self.cell_pos((r, c)), v, 0.0);
                        }
                    }
                }
            }
        }
    }
}
