//! Shared drawing routines: backdrop, HUD text and the overlay cards
//!
//! Every game uses the same neon look, so the pieces that were copied
//! between games live here once.

use glam::Vec2;

use super::palette;
use super::{Color, Painter, TextAlign};
use crate::sim::Rect;

/// Dark backdrop with a soft bottom shade and a drifting dot grid
pub fn backdrop(p: &mut dyn Painter, w: f32, h: f32, time_ms: f64) {
    p.clear(palette::BACKDROP);
    p.fill_rect(Rect::new(0.0, h * 0.6, w, h * 0.4), palette::SHADE);

    let spacing = 32.0;
    let drift = ((time_ms * 0.08) % spacing as f64) as f32 * 0.2;
    let mut y = 10.0;
    while y < h {
        let mut x = 10.0;
        while x < w {
            p.fill_rect(Rect::new(x + drift, y, 2.0, 2.0), palette::GRID);
            x += spacing;
        }
        y += spacing;
    }
}

/// Glowing horizontal lane line (ground, floor)
pub fn glow_line(p: &mut dyn Painter, y: f32, w: f32) {
    p.line(Vec2::new(0.0, y), Vec2::new(w, y), 6.0, palette::CYAN);
    p.line(
        Vec2::new(0.0, y),
        Vec2::new(w, y),
        2.0,
        Color::rgba(255, 255, 255, 0.10),
    );
}

/// Body with a lighter stripe, the block style all games share
pub fn neon_block(p: &mut dyn Painter, rect: Rect, radius: f32, color: Color) {
    p.fill_round_rect(rect, radius, color);
    let stripe = Rect::new(
        rect.x + 5.0,
        rect.y + 6.0,
        (rect.w * 0.22).max(4.0),
        (rect.h - 12.0).max(1.0),
    );
    p.fill_round_rect(stripe, radius * 0.8, Color::rgba(255, 255, 255, 0.16));
}

/// Score label in the top-left corner
pub fn score_label(p: &mut dyn Painter, score: u64) {
    p.text(
        &format!("Score: {score}"),
        Vec2::new(18.0, 30.0),
        18.0,
        TextAlign::Left,
        palette::TEXT,
    );
}

/// Secondary HUD line under the score
pub fn hud_line(p: &mut dyn Painter, line: usize, text: &str) {
    p.text(
        text,
        Vec2::new(18.0, 54.0 + line as f32 * 22.0),
        15.0,
        TextAlign::Left,
        palette::TEXT_DIM,
    );
}

/// FPS readout in the top-right corner
pub fn fps_label(p: &mut dyn Painter, w: f32, fps: u32) {
    p.text(
        &format!("{fps} FPS"),
        Vec2::new(w - 14.0, 24.0),
        13.0,
        TextAlign::Right,
        palette::TEXT_DIM,
    );
}

/// Dimmed full-screen card with a title and a few lines
pub fn overlay_card(p: &mut dyn Painter, w: f32, h: f32, title: &str, lines: &[&str]) {
    p.fill_rect(Rect::new(0.0, 0.0, w, h), palette::OVERLAY);

    let card_w = (w * 0.8).min(460.0);
    let card_h = 84.0 + lines.len() as f32 * 26.0;
    let card = Rect::new((w - card_w) / 2.0, (h - card_h) / 2.0, card_w, card_h);
    p.fill_round_rect(card, 18.0, Color::rgba(10, 14, 30, 0.85));

    let cx = card.center().x;
    p.text(
        title,
        Vec2::new(cx, card.y + 44.0),
        24.0,
        TextAlign::Center,
        palette::TEXT,
    );
    for (i, line) in lines.iter().enumerate() {
        p.text(
            line,
            Vec2::new(cx, card.y + 78.0 + i as f32 * 26.0),
            16.0,
            TextAlign::Center,
            palette::TEXT_DIM,
        );
    }
}
