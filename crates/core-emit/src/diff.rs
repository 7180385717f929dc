//! The per-frame differential pass.

use std::io::Write;
use std::time::Instant;

use core_cell::CellKind;
use core_sixel::{encoder, from_sixel, Quantized, TRANSPARENT};

use crate::{escape, RenderError, Renderer};

/// Inclusive-origin, exclusive-end cell rectangle.
#[derive(Debug, Clone, Copy)]
struct CellRect {
    y0: usize,
    x0: usize,
    y1: usize,
    x1: usize,
}

impl CellRect {
    fn expand(rect: &mut Option<CellRect>, y: usize, x: usize) {
        match rect {
            Some(r) => {
                r.y0 = r.y0.min(y);
                r.x0 = r.x0.min(x);
                r.y1 = r.y1.max(y + 1);
                r.x1 = r.x1.max(x + 1);
            }
            None => {
                *rect = Some(CellRect {
                    y0: y,
                    x0: x,
                    y1: y + 1,
                    x1: x + 1,
                })
            }
        }
    }

    fn contains(&self, y: usize, x: usize) -> bool {
        y >= self.y0 && y < self.y1 && x >= self.x0 && x < self.x1
    }
}

impl Renderer {
    /// Emit the difference between the current frame and the previous one.
    /// Produces no output at all when nothing changed.
    pub fn present(&mut self, sink: &mut impl Write) -> Result<(), RenderError> {
        use std::sync::atomic::Ordering::Relaxed;
        let start = Instant::now();
        let rows = self.compositor.rows();
        let cols = self.compositor.cols();
        let span = tracing::debug_span!("present", rows, cols);
        let _enter = span.enter();

        self.metrics.frames.fetch_add(1, Relaxed);
        self.cursor = None;
        self.last_sgr = None;
        self.opened = false;
        self.out.clear();

        self.compositor.normalize_widths();
        let resized = self.compositor.take_resized();
        let (ch, cw) = (self.compositor.cell_h(), self.compositor.cell_w());

        // Bounding rect of overlay cells + the re-emit decision.
        let mut rect: Option<CellRect> = None;
        let mut emit_sixel = resized;
        for y in 0..rows {
            for x in 0..cols {
                let k = self.compositor.kind[(y, x)];
                if k != self.compositor.prev_kind[(y, x)] {
                    emit_sixel = true;
                }
                if !k.uses_overlay() {
                    continue;
                }
                CellRect::expand(&mut rect, y, x);
                if !emit_sixel
                    && (self.overlay_cell_fields_changed(y, x, k)
                        || self.overlay_pixels_changed(y, x, ch, cw))
                {
                    emit_sixel = true;
                }
            }
        }

        let mut sixel_rect: Option<(CellRect, usize)> = None;
        let mut quantized: Option<Quantized> = None;
        if emit_sixel && let Some(r) = rect {
            let mut px_h = (r.y1 - r.y0) * ch;
            if r.y1 == rows {
                // Sixel output on the last row must not force a scroll:
                // round the pixel height down to a multiple of 6 and hand
                // the truncated cells back to the glyph path.
                let rounded = px_h / 6 * 6;
                if rounded < px_h {
                    for x in r.x0..r.x1 {
                        if self.compositor.kind[(rows - 1, x)].uses_overlay() {
                            self.compositor.kind[(rows - 1, x)] = CellKind::Mixed;
                        }
                    }
                    px_h = rounded;
                }
            }
            // Glyphs of partially covered cells go out first; the DCS
            // block paints over them where its pixels are opaque. This
            // also covers the rect collapsing to zero height below: the
            // truncated cells were just handed back to the glyph path.
            for y in r.y0..r.y1 {
                for x in r.x0..r.x1 {
                    if self.compositor.kind[(y, x)] == CellKind::Mixed {
                        self.emit_cell(y, x)?;
                    }
                }
            }
            if px_h > 0 {
                self.open_frame()?;
                escape::cup(&mut self.out, r.y0 as u32 + 1, r.x0 as u32 + 1)?;
                // The DCS leaves the cursor somewhere protocol-defined but
                // untracked here.
                self.cursor = None;

                let px_w = (r.x1 - r.x0) * cw;
                self.scratch.clear();
                self.scratch.reserve(px_w * px_h);
                for py in r.y0 * ch..r.y0 * ch + px_h {
                    for px in r.x0 * cw..r.x1 * cw {
                        self.scratch.push(self.compositor.graphics[(py, px)]);
                    }
                }
                let q = self.quant.quantize(&self.scratch, px_w, px_h);
                encoder::encode(self.out.as_mut_vec(), &q, self.aspect);
                tracing::debug!(
                    y0 = r.y0,
                    x0 = r.x0,
                    px_w,
                    px_h,
                    palette = q.palette.len(),
                    "sixel block emitted"
                );
                quantized = Some(q);
                sixel_rect = Some((r, px_h));
                self.metrics.sixel_frames.fetch_add(1, Relaxed);
            }
        }

        // Changed glyph cells, plus glyph cells the sixel block overdrew.
        for y in 0..rows {
            for x in 0..cols {
                if self.compositor.widths[(y, x)] == 0 {
                    continue; // continuation of a wide glyph
                }
                if self.compositor.kind[(y, x)] != CellKind::Glyph {
                    continue;
                }
                let changed = self.compositor.prev_kind[(y, x)] != CellKind::Glyph
                    || self.compositor.prev_cells[(y, x)] != self.compositor.cells[(y, x)];
                let overdrawn = sixel_rect.is_some_and(|(r, _)| r.contains(y, x));
                if changed || overdrawn {
                    self.emit_cell(y, x)?;
                }
            }
        }

        // See-through cells: pull the quantized background out of the
        // palette so the glyph re-emission matches the sixel layer exactly.
        if let (Some((r, px_h)), Some(q)) = (sixel_rect, &quantized) {
            for y in r.y0..r.y1 {
                for x in r.x0..r.x1 {
                    if self.compositor.kind[(y, x)] != CellKind::SeeThrough {
                        continue;
                    }
                    let rel_py = (y - r.y0) * ch;
                    let rel_px = (x - r.x0) * cw;
                    if rel_py < px_h {
                        let idx = q.indices[rel_py * q.w + rel_px];
                        if idx != TRANSPARENT {
                            let p = q.palette[idx as usize];
                            self.compositor.cells[(y, x)].bg =
                                [from_sixel(p[0]), from_sixel(p[1]), from_sixel(p[2])];
                        }
                    }
                    self.emit_cell(y, x)?;
                }
            }
        }

        if self.opened {
            escape::restore_cursor(&mut self.out)?;
            let n = self.out.flush(sink)?;
            self.metrics.bytes_flushed.fetch_add(n as u64, Relaxed);
        } else {
            self.out.clear();
            self.metrics.skipped_frames.fetch_add(1, Relaxed);
        }
        self.metrics
            .last_present_ns
            .store(start.elapsed().as_nanos() as u64, Relaxed);
        Ok(())
    }

    /// Cell-field diff for overlay cells; the background is advisory for
    /// see-through cells (it is rewritten from the palette every frame).
    fn overlay_cell_fields_changed(&self, y: usize, x: usize, kind: CellKind) -> bool {
        let cur = self.compositor.cells[(y, x)];
        let prev = self.compositor.prev_cells[(y, x)];
        if kind == CellKind::SeeThrough {
            cur.ord != prev.ord || cur.style != prev.style || cur.fg != prev.fg
        } else {
            cur != prev
        }
    }

    fn overlay_pixels_changed(&self, y: usize, x: usize, ch: usize, cw: usize) -> bool {
        for py in y * ch..(y + 1) * ch {
            for px in x * cw..(x + 1) * cw {
                if self.compositor.graphics[(py, px)] != self.compositor.prev_graphics[(py, px)]
                {
                    return true;
                }
            }
        }
        false
    }

    fn open_frame(&mut self) -> Result<(), RenderError> {
        if !self.opened {
            escape::save_cursor(&mut self.out)?;
            self.opened = true;
        }
        Ok(())
    }

    /// Emit one glyph cell: cursor motion if needed, SGR delta, UTF-8.
    fn emit_cell(&mut self, y: usize, x: usize) -> Result<(), RenderError> {
        use std::sync::atomic::Ordering::Relaxed;
        self.open_frame()?;
        match self.cursor {
            Some((cy, cx)) if cy == y && cx == x => {}
            Some((cy, _)) if cy == y => escape::cha(&mut self.out, x as u32 + 1)?,
            _ => escape::cup(&mut self.out, y as u32 + 1, x as u32 + 1)?,
        }
        let cell = self.compositor.cells[(y, x)];
        let next = (cell.style, cell.fg, cell.bg);
        escape::sgr_delta(&mut self.out, self.last_sgr, next)?;
        self.last_sgr = Some(next);

        if let Some(egc) = self.compositor.pool.lookup(cell.ord) {
            self.out.put(egc.as_bytes())?;
        } else {
            let c = match cell.ord {
                0 => ' ',
                ord => char::from_u32(ord).unwrap_or(' '),
            };
            let mut buf = [0u8; 4];
            self.out.put(c.encode_utf8(&mut buf).as_bytes())?;
        }
        let w = self.compositor.widths[(y, x)].max(1) as usize;
        self.cursor = Some((y, x + w));
        self.metrics.cells_emitted.fetch_add(1, Relaxed);
        Ok(())
    }
}
