//! Canvas 2D backend
//!
//! Each surface is its own `<canvas>` appended to the game container. The
//! backing store is scaled by `devicePixelRatio` while games keep drawing in
//! CSS pixels.

use std::f64::consts::TAU;

use glam::Vec2;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlCanvasElement};

use super::{Color, Painter, Surface, SurfaceError, SurfaceFactory, TextAlign};
use crate::sim::Rect;

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    width: u32,
    height: u32,
    released: bool,
}

impl CanvasSurface {
    pub fn new(
        document: &Document,
        container: &Element,
        width: u32,
        height: u32,
        dpr: f64,
    ) -> Result<Self, SurfaceError> {
        let canvas: HtmlCanvasElement = document
            .create_element("canvas")
            .map_err(|e| SurfaceError::Canvas(format!("{e:?}")))?
            .dyn_into()
            .map_err(|_| SurfaceError::Canvas("not a canvas element".into()))?;

        let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
        canvas.set_width((width as f64 * dpr).floor() as u32);
        canvas.set_height((height as f64 * dpr).floor() as u32);
        canvas
            .set_attribute(
                "style",
                &format!("width:{width}px;height:{height}px;display:block;touch-action:none"),
            )
            .map_err(|e| SurfaceError::Canvas(format!("{e:?}")))?;

        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .map_err(|e| SurfaceError::Canvas(format!("{e:?}")))?
            .ok_or_else(|| SurfaceError::Canvas("2d context unavailable".into()))?
            .dyn_into()
            .map_err(|_| SurfaceError::Canvas("unexpected context type".into()))?;
        ctx.scale(dpr, dpr)
            .map_err(|e| SurfaceError::Canvas(format!("{e:?}")))?;

        container
            .append_child(&canvas)
            .map_err(|e| SurfaceError::Canvas(format!("{e:?}")))?;

        Ok(Self {
            canvas,
            ctx,
            width,
            height,
            released: false,
        })
    }

    fn round_rect_path(&self, rect: Rect, radius: f32) {
        let r = radius.min(rect.w / 2.0).min(rect.h / 2.0).max(0.0) as f64;
        let (x, y, w, h) = (rect.x as f64, rect.y as f64, rect.w as f64, rect.h as f64);
        let c = &self.ctx;
        c.begin_path();
        c.move_to(x + r, y);
        let _ = c.arc_to(x + w, y, x + w, y + h, r);
        let _ = c.arc_to(x + w, y + h, x, y + h, r);
        let _ = c.arc_to(x, y + h, x, y, r);
        let _ = c.arc_to(x, y, x + w, y, r);
        c.close_path();
    }
}

impl Painter for CanvasSurface {
    fn clear(&mut self, color: Color) {
        let (w, h) = (self.width as f64, self.height as f64);
        self.ctx.clear_rect(0.0, 0.0, w, h);
        self.ctx.set_fill_style_str(&color.css());
        self.ctx.fill_rect(0.0, 0.0, w, h);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ctx.set_fill_style_str(&color.css());
        self.ctx
            .fill_rect(rect.x as f64, rect.y as f64, rect.w as f64, rect.h as f64);
    }

    fn fill_round_rect(&mut self, rect: Rect, radius: f32, color: Color) {
        self.round_rect_path(rect, radius);
        self.ctx.set_fill_style_str(&color.css());
        self.ctx.fill();
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.ctx.begin_path();
        let _ = self
            .ctx
            .arc(center.x as f64, center.y as f64, radius.max(0.0) as f64, 0.0, TAU);
        self.ctx.set_fill_style_str(&color.css());
        self.ctx.fill();
    }

    fn line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color) {
        let c = &self.ctx;
        c.set_stroke_style_str(&color.css());
        c.set_line_width(width as f64);
        c.begin_path();
        c.move_to(from.x as f64, from.y as f64);
        c.line_to(to.x as f64, to.y as f64);
        c.stroke();
    }

    fn text(&mut self, text: &str, pos: Vec2, size: f32, align: TextAlign, color: Color) {
        let c = &self.ctx;
        c.set_font(&format!("700 {}px system-ui, Arial", size.round()));
        c.set_text_align(align.as_str());
        c.set_fill_style_str(&color.css());
        let _ = c.fill_text(text, pos.x as f64, pos.y as f64);
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn painter(&mut self) -> &mut dyn Painter {
        self
    }

    fn release(&mut self) {
        if !self.released {
            self.canvas.remove();
            self.released = true;
        }
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for CanvasSurface {
    fn drop(&mut self) {
        self.release();
    }
}

/// Appends a fresh canvas to `container` for every mount
pub struct CanvasSurfaceFactory {
    document: Document,
    container: Element,
    dpr: f64,
}

impl CanvasSurfaceFactory {
    pub fn new(document: Document, container: Element, dpr: f64) -> Self {
        Self {
            document,
            container,
            dpr,
        }
    }
}

impl SurfaceFactory for CanvasSurfaceFactory {
    fn allocate(&self, width: u32, height: u32) -> Result<Box<dyn Surface>, SurfaceError> {
        if !self.container.is_connected() {
            return Err(SurfaceError::NoContainer);
        }
        let surface = CanvasSurface::new(&self.document, &self.container, width, height, self.dpr)?;
        Ok(Box::new(surface))
    }
}
