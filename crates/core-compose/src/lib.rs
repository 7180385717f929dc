//! Compositing engine: walks element regions back-to-front and mutates the
//! shared cell grid and pixel overlay.
//!
//! The `Compositor` owns every frame buffer (cells, kind tags and pixel
//! overlay, current and previous generation, plus the per-cell width grid
//! and the grapheme-cluster pool). Elements arrive as flat descriptors in
//! draw order; applying them in that exact order is the only source of
//! z-ordering. Rendering is single-threaded and non-suspending: a pass
//! runs to completion without yielding or re-entering.
//!
//! Buffer lifecycle:
//! - `begin_frame` swaps current/previous generations and clears the
//!   current one; the previous generation feeds the differential emitter.
//! - `resize` zero-fills everything in place and forces a full repaint.
//!
//! Element regions are expected pre-clipped by the tree walker; a region
//! that escapes the grid is a programming error (`ComposeError::Geometry`),
//! fatal to the render pass. Everything else recoverable (zero alpha,
//! out-of-region particles, unplaceable wide glyphs) is handled locally.

use core_cell::{width, Cell, CellKind, EgcPool, Grid, Rgb, Rgba};
use core_region::{Point, Rect};
use thiserror::Error;

pub mod blocks;
pub mod cursor;
pub mod element;
pub mod field;
pub mod graphics;
pub mod pane;
pub mod text;

pub use element::{Blitter, Element, Payload, PixelParticle, TextParticle, Texture};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("element region {bbox:?} escapes {rows}x{cols} cell grid")]
    Geometry {
        bbox: Rect,
        rows: usize,
        cols: usize,
    },
}

/// Linear interpolation toward `src` by `a` in [0, 1].
#[inline]
pub(crate) fn lerp_channel(dst: u8, src: u8, a: f32) -> u8 {
    (dst as f32 + (src as f32 - dst as f32) * a).round().clamp(0.0, 255.0) as u8
}

#[inline]
pub(crate) fn lerp_rgb(dst: Rgb, src: Rgb, a: f32) -> Rgb {
    [
        lerp_channel(dst[0], src[0], a),
        lerp_channel(dst[1], src[1], a),
        lerp_channel(dst[2], src[2], a),
    ]
}

pub struct Compositor {
    pub cells: Grid<Cell>,
    pub prev_cells: Grid<Cell>,
    pub kind: Grid<CellKind>,
    pub prev_kind: Grid<CellKind>,
    /// RGBA overlay, `rows * cell_h` by `cols * cell_w` pixels.
    pub graphics: Grid<Rgba>,
    pub prev_graphics: Grid<Rgba>,
    /// Unicode column width per cell; 0 marks wide-glyph continuations.
    pub widths: Grid<i32>,
    pub pool: EgcPool,
    cell_h: usize,
    cell_w: usize,
    resized: bool,
}

impl Compositor {
    /// `cell_h`/`cell_w` are the pixel dimensions of one cell as reported
    /// by the terminal; `cell_h` is typically even so the half blitter can
    /// split the vertical axis.
    pub fn new(rows: usize, cols: usize, cell_h: usize, cell_w: usize) -> Self {
        Self {
            cells: Grid::new(rows, cols),
            prev_cells: Grid::new(rows, cols),
            kind: Grid::new(rows, cols),
            prev_kind: Grid::new(rows, cols),
            graphics: Grid::new(rows * cell_h, cols * cell_w),
            prev_graphics: Grid::new(rows * cell_h, cols * cell_w),
            widths: Grid::new(rows, cols),
            pool: EgcPool::new(),
            cell_h,
            cell_w,
            resized: true,
        }
    }

    pub fn rows(&self) -> usize {
        self.cells.h()
    }

    pub fn cols(&self) -> usize {
        self.cells.w()
    }

    pub fn cell_h(&self) -> usize {
        self.cell_h
    }

    pub fn cell_w(&self) -> usize {
        self.cell_w
    }

    /// Atomically replace the buffers for a new terminal geometry. All
    /// contents are dropped, which forces the next frame to repaint fully.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.cells.resize(rows, cols);
        self.prev_cells.resize(rows, cols);
        self.kind.resize(rows, cols);
        self.prev_kind.resize(rows, cols);
        self.graphics.resize(rows * self.cell_h, cols * self.cell_w);
        self.prev_graphics
            .resize(rows * self.cell_h, cols * self.cell_w);
        self.widths.resize(rows, cols);
        self.resized = true;
        tracing::debug!(rows, cols, "compositor resized");
    }

    /// Consume the resize flag; the emitter uses it to force a full frame.
    pub fn take_resized(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }

    /// Rotate buffers: the just-emitted frame becomes the previous
    /// generation and the current one starts empty.
    pub fn begin_frame(&mut self) {
        std::mem::swap(&mut self.cells, &mut self.prev_cells);
        std::mem::swap(&mut self.kind, &mut self.prev_kind);
        std::mem::swap(&mut self.graphics, &mut self.prev_graphics);
        self.cells.clear();
        self.kind.clear();
        self.graphics.clear();
    }

    /// Apply one element. Elements must arrive back-to-front.
    pub fn render(&mut self, element: &Element<'_>) -> Result<(), ComposeError> {
        if element.region.is_empty() {
            return Ok(());
        }
        if let Some(bbox) = element.region.bbox()
            && !(bbox.pos.y >= 0
                && bbox.pos.x >= 0
                && (bbox.pos.y + bbox.size.h) as usize <= self.rows()
                && (bbox.pos.x + bbox.size.w) as usize <= self.cols())
        {
            return Err(ComposeError::Geometry {
                bbox,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        if element.transparent && element.alpha <= 0.0 {
            return Ok(());
        }
        match &element.payload {
            Payload::Pane { bg } => self.render_pane(element, *bg),
            Payload::Text { canvas } => self.render_text(element, canvas),
            Payload::Graphics { texture, blitter } => {
                self.render_graphics(element, texture, *blitter)
            }
            Payload::TextField { particles } => self.render_text_field(element, particles),
            Payload::GraphicsField { particles, blitter } => {
                self.render_graphics_field(element, particles, *blitter)
            }
            Payload::Cursor { on, off, fg, bg } => {
                self.render_cursor(element, *on, *off, *fg, *bg)
            }
        }
        Ok(())
    }

    /// Mean color of the opaque overlay pixels under a cell, with the
    /// opaque fraction. Falls back to the cell background when nothing in
    /// the overlay is opaque.
    pub(crate) fn overlay_mean(&self, y: usize, x: usize) -> (Rgb, f32) {
        let mut sum = [0u32; 3];
        let mut n = 0u32;
        let total = (self.cell_h * self.cell_w) as u32;
        for py in y * self.cell_h..(y + 1) * self.cell_h {
            for px in x * self.cell_w..(x + 1) * self.cell_w {
                let p = self.graphics[(py, px)];
                if p[3] != 0 {
                    sum[0] += p[0] as u32;
                    sum[1] += p[1] as u32;
                    sum[2] += p[2] as u32;
                    n += 1;
                }
            }
        }
        if n == 0 {
            (self.cells[(y, x)].bg, 0.0)
        } else {
            (
                [(sum[0] / n) as u8, (sum[1] / n) as u8, (sum[2] / n) as u8],
                n as f32 / total as f32,
            )
        }
    }

    /// Blend a color into every opaque overlay pixel of a cell.
    pub(crate) fn blend_overlay_cell(&mut self, y: usize, x: usize, color: Rgb, a: f32) {
        for py in y * self.cell_h..(y + 1) * self.cell_h {
            for px in x * self.cell_w..(x + 1) * self.cell_w {
                let p = &mut self.graphics[(py, px)];
                if p[3] != 0 {
                    let mixed = lerp_rgb([p[0], p[1], p[2]], color, a);
                    p[0] = mixed[0];
                    p[1] = mixed[1];
                    p[2] = mixed[2];
                }
            }
        }
    }

    /// Recompute the width grid and heal impossible wide glyphs: a wide
    /// cell that would run off the row or collide with a non-continuation
    /// cell becomes a space, as does any orphaned continuation slot.
    pub fn normalize_widths(&mut self) {
        for y in 0..self.rows() {
            let cols = self.cols();
            let mut x = 0usize;
            while x < cols {
                let w = width::cell_width(&self.cells[(y, x)], &self.pool);
                if w > 1 {
                    let span = w as usize;
                    let fits = x + span <= cols
                        && (1..span).all(|k| self.cells[(y, x + k)].ord == 0);
                    if fits {
                        self.widths[(y, x)] = w;
                        for k in 1..span {
                            self.widths[(y, x + k)] = 0;
                        }
                        x += span;
                    } else {
                        self.cells[(y, x)].ord = Cell::SPACE;
                        self.widths[(y, x)] = 1;
                        x += 1;
                    }
                } else if w == 0 {
                    // Continuation not claimed by a preceding wide leader.
                    self.cells[(y, x)].ord = Cell::SPACE;
                    self.widths[(y, x)] = 1;
                    x += 1;
                } else {
                    self.widths[(y, x)] = 1;
                    x += 1;
                }
            }
        }
    }
}

/// Texel coordinates of a cell relative to an element origin.
#[inline]
pub(crate) fn rel(pos: Point, y: usize, x: usize) -> (usize, usize) {
    ((y as i32 - pos.y) as usize, (x as i32 - pos.x) as usize)
}
