//! Demo scene: a background pane, an animated plasma texture through the
//! configured blitter, a braille particle swirl and a title line. Exists
//! to push every pipeline stage each frame, not to look pretty.

use anyhow::Result;
use core_cell::{Cell, Grid, Style};
use core_compose::{Blitter, Element, Payload, PixelParticle, Texture};
use core_emit::Renderer;
use core_region::{Point, Region, Size};

use crate::config::Config;

pub struct Scene {
    t: f32,
    blitter: Blitter,
    background: [u8; 3],
    /// Per-particle angular phase.
    phases: Vec<f32>,
}

impl Scene {
    pub fn new(config: &Config) -> Self {
        let n = config.demo.particles;
        Self {
            t: 0.0,
            blitter: config.render.blitter(),
            background: config.demo.background,
            phases: (0..n).map(|i| i as f32 * 0.39).collect(),
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.t += dt;
    }

    pub fn compose(&mut self, r: &mut Renderer) -> Result<()> {
        let rows = r.compositor.rows() as i32;
        let cols = r.compositor.cols() as i32;
        if rows < 4 || cols < 8 {
            return Ok(());
        }

        let full = Region::from_rect(Point::new(0, 0), Size::new(rows, cols));
        r.render(&Element::opaque(
            &full,
            Point::new(0, 0),
            Payload::Pane { bg: self.background },
        ))?;

        self.compose_plasma(r, rows, cols)?;
        self.compose_swirl(r, rows, cols)?;
        self.compose_title(r, cols)?;
        Ok(())
    }

    fn compose_plasma(&self, r: &mut Renderer, rows: i32, cols: i32) -> Result<()> {
        let h = (rows - 4).max(1);
        let w = (cols - 4).max(1);
        let pos = Point::new(2, 2);
        let region = Region::from_rect(pos, Size::new(h, w));
        let (ph, pw) = self
            .blitter
            .density(r.compositor.cell_h(), r.compositor.cell_w());
        let tex = plasma_texture(h as usize * ph, w as usize * pw, (ph, pw), self.t);
        r.render(&Element::opaque(
            &region,
            pos,
            Payload::Graphics {
                texture: &tex,
                blitter: self.blitter,
            },
        ))?;
        Ok(())
    }

    fn compose_swirl(&self, r: &mut Renderer, rows: i32, cols: i32) -> Result<()> {
        let region = Region::from_rect(Point::new(0, 0), Size::new(rows, cols));
        let cy = rows as f32 * 2.0; // braille sub-pixel space: 4 per row
        let cx = cols as f32;
        let particles: Vec<PixelParticle> = self
            .phases
            .iter()
            .map(|phase| {
                let a = self.t * 0.8 + phase;
                let radius = 3.0 + 1.5 * (self.t * 0.5 + phase * 2.0).sin();
                PixelParticle {
                    y: (cy + radius * 2.0 * a.sin()) as f64,
                    x: (cx + radius * 4.0 * a.cos()) as f64,
                    color: [255, (128.0 + 127.0 * a.sin()) as u8, 64, 255],
                }
            })
            .collect();
        r.render(&Element::translucent(
            &region,
            Point::new(0, 0),
            0.9,
            Payload::GraphicsField {
                particles: &particles,
                blitter: Blitter::Braille,
            },
        ))?;
        Ok(())
    }

    fn compose_title(&self, r: &mut Renderer, cols: i32) -> Result<()> {
        let title = " sable ";
        let canvas = text_canvas(title, [240, 240, 240], [60, 30, 90], &mut r.compositor.pool);
        let w = (canvas.w() as i32).min(cols);
        let region = Region::from_rect(Point::new(0, 1), Size::new(1, w));
        r.render(&Element::opaque(
            &region,
            Point::new(0, 1),
            Payload::Text { canvas: &canvas },
        ))?;
        Ok(())
    }
}

/// The animated plasma field, sampled at the blitter's texel density.
pub fn plasma_texture(h: usize, w: usize, density: (usize, usize), t: f32) -> Texture {
    let (ph, pw) = density;
    let mut tex = Texture::new(h, w);
    for py in 0..h {
        for px in 0..w {
            let fx = px as f32 / pw.max(1) as f32;
            let fy = py as f32 / ph.max(1) as f32;
            let v = (fx * 0.35 + t).sin()
                + (fy * 0.48 - t * 1.3).sin()
                + ((fx + fy) * 0.21 + t * 0.7).sin();
            let norm = (v + 3.0) / 6.0;
            tex.set(
                py,
                px,
                [
                    (norm * 255.0) as u8,
                    ((1.0 - norm) * 200.0) as u8,
                    (norm * norm * 255.0) as u8,
                    255,
                ],
            );
        }
    }
    tex
}

/// One-row cell canvas from a string: clusters interned through the
/// compositor's pool, wide glyphs followed by continuation slots.
pub fn text_canvas(
    text: &str,
    fg: [u8; 3],
    bg: [u8; 3],
    pool: &mut core_cell::EgcPool,
) -> Grid<Cell> {
    let clusters: Vec<&str> = core_cell::width::clusters(text).collect();
    let total: i32 = clusters.iter().map(|c| core_cell::width::cluster_width(c)).sum();
    let mut canvas: Grid<Cell> = Grid::new(1, total.max(0) as usize);
    let mut x = 0usize;
    for cluster in clusters {
        let w = core_cell::width::cluster_width(cluster).max(1) as usize;
        canvas[(0, x)] = Cell {
            ord: pool.intern(cluster),
            style: Style::BOLD,
            fg,
            bg,
        };
        for k in 1..w {
            canvas[(0, x + k)] = Cell {
                ord: 0,
                style: Style::BOLD,
                fg,
                bg,
            };
        }
        x += w;
    }
    canvas
}
