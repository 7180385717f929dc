//! Texture rendering through the four blitters.

use core_cell::{Cell, CellKind, Rgb};

use crate::blocks::{block_fg_at, is_block};
use crate::{lerp_rgb, rel, Blitter, Compositor, Element, Texture};

/// Braille dot bits in row-major sub-pixel order (y*2 + x).
pub(crate) const DOT_BITS: [u8; 8] = [0x01, 0x08, 0x02, 0x10, 0x04, 0x20, 0x40, 0x80];

const BRAILLE_BASE: u32 = 0x2800;
const UPPER_HALF: u32 = 0x2580;

/// Variance ceiling below which a sixel layer reads as one flat color and
/// the cell can stay see-through.
const SEE_THROUGH_VARIANCE: f32 = 100.0;

#[derive(Debug, Default)]
struct SubrectStats {
    n: u32,
    sum: [u64; 4],
    sumsq: [u64; 4],
}

impl SubrectStats {
    fn push(&mut self, px: [u8; 4]) {
        self.n += 1;
        for c in 0..4 {
            self.sum[c] += px[c] as u64;
            self.sumsq[c] += (px[c] as u64) * (px[c] as u64);
        }
    }

    fn mean(&self, c: usize) -> f32 {
        self.sum[c] as f32 / self.n as f32
    }

    fn variance(&self, c: usize) -> f32 {
        let m = self.mean(c);
        self.sumsq[c] as f32 / self.n as f32 - m * m
    }

    fn flat(&self) -> bool {
        (0..4).all(|c| self.variance(c) < SEE_THROUGH_VARIANCE)
    }

    fn mean_rgb(&self) -> Rgb {
        [self.mean(0) as u8, self.mean(1) as u8, self.mean(2) as u8]
    }
}

impl Compositor {
    /// Pane-style blend of one color into a cell and its overlay, split by
    /// cell kind. Shared by the pane and the full blitter.
    pub(crate) fn blend_cell_color(&mut self, y: usize, x: usize, color: Rgb, a: f32) {
        let kind = self.kind[(y, x)];
        if kind != CellKind::Sixel {
            let cell = &mut self.cells[(y, x)];
            cell.fg = lerp_rgb(cell.fg, color, a);
            cell.bg = lerp_rgb(cell.bg, color, a);
        }
        if kind.uses_overlay() {
            self.blend_overlay_cell(y, x, color, a);
        }
    }

    pub(crate) fn render_graphics(
        &mut self,
        el: &Element<'_>,
        texture: &Texture,
        blitter: Blitter,
    ) {
        match blitter {
            Blitter::Full => self.blit_full(el, texture),
            Blitter::Half => self.blit_half(el, texture),
            Blitter::Braille => self.blit_braille(el, texture),
            Blitter::Sixel => self.blit_sixel(el, texture),
        }
    }

    fn blit_full(&mut self, el: &Element<'_>, texture: &Texture) {
        for rect in el.region.rects() {
            for y in rect.pos.y..rect.pos.y + rect.size.h {
                for x in rect.pos.x..rect.pos.x + rect.size.w {
                    let (y, x) = (y as usize, x as usize);
                    let (ty, tx) = rel(el.pos, y, x);
                    let Some(texel) = texture.get(ty, tx) else {
                        continue;
                    };
                    let rgb = [texel[0], texel[1], texel[2]];
                    if el.transparent {
                        let a = el.alpha * texel[3] as f32 / 255.0;
                        if a > 0.0 {
                            self.blend_cell_color(y, x, rgb, a);
                        }
                    } else {
                        self.cells[(y, x)] = Cell::space_on(rgb);
                        self.kind[(y, x)] = CellKind::Glyph;
                    }
                }
            }
        }
    }

    fn blit_half(&mut self, el: &Element<'_>, texture: &Texture) {
        for rect in el.region.rects() {
            for y in rect.pos.y..rect.pos.y + rect.size.h {
                for x in rect.pos.x..rect.pos.x + rect.size.w {
                    let (y, x) = (y as usize, x as usize);
                    let (ty, tx) = rel(el.pos, y, x);
                    let upper = texture.get(2 * ty, tx);
                    let lower = texture.get(2 * ty + 1, tx);
                    if upper.is_none() && lower.is_none() {
                        continue;
                    }
                    let cell = self.cells[(y, x)];
                    if el.transparent {
                        // A cell already showing a half block keeps distinct
                        // halves; anything else starts from its background.
                        let (cur_up, cur_dn) = if cell.ord == UPPER_HALF {
                            (cell.fg, cell.bg)
                        } else {
                            (cell.bg, cell.bg)
                        };
                        let new_up = match upper {
                            Some(t) if t[3] != 0 => lerp_rgb(
                                cur_up,
                                [t[0], t[1], t[2]],
                                el.alpha * t[3] as f32 / 255.0,
                            ),
                            _ => cur_up,
                        };
                        let new_dn = match lower {
                            Some(t) if t[3] != 0 => lerp_rgb(
                                cur_dn,
                                [t[0], t[1], t[2]],
                                el.alpha * t[3] as f32 / 255.0,
                            ),
                            _ => cur_dn,
                        };
                        self.write_half(y, x, new_up, new_dn);
                    } else {
                        let up_rgb = match upper {
                            Some(t) if t[3] != 0 => [t[0], t[1], t[2]],
                            _ => cell.bg,
                        };
                        let dn_rgb = match lower {
                            Some(t) if t[3] != 0 => [t[0], t[1], t[2]],
                            _ => cell.bg,
                        };
                        self.write_half(y, x, up_rgb, dn_rgb);
                    }
                }
            }
        }
    }

    /// Equal halves collapse to a plain space over the shared color.
    pub(crate) fn write_half(&mut self, y: usize, x: usize, up: Rgb, dn: Rgb) {
        self.cells[(y, x)] = if up == dn {
            Cell::space_on(up)
        } else {
            Cell {
                ord: UPPER_HALF,
                style: core_cell::Style::empty(),
                fg: up,
                bg: dn,
            }
        };
        self.kind[(y, x)] = CellKind::Glyph;
    }

    fn blit_braille(&mut self, el: &Element<'_>, texture: &Texture) {
        for rect in el.region.rects() {
            for y in rect.pos.y..rect.pos.y + rect.size.h {
                for x in rect.pos.x..rect.pos.x + rect.size.w {
                    let (y, x) = (y as usize, x as usize);
                    let (ty, tx) = rel(el.pos, y, x);
                    let mut bits = 0u8;
                    let mut sum = [0u32; 3];
                    let mut n = 0u32;
                    for sy in 0..4 {
                        for sx in 0..2 {
                            if let Some(t) = texture.get(4 * ty + sy, 2 * tx + sx)
                                && t[3] != 0
                            {
                                bits |= DOT_BITS[sy * 2 + sx];
                                sum[0] += t[0] as u32;
                                sum[1] += t[1] as u32;
                                sum[2] += t[2] as u32;
                                n += 1;
                            }
                        }
                    }
                    let mean = if n > 0 {
                        [
                            (sum[0] / n) as u8,
                            (sum[1] / n) as u8,
                            (sum[2] / n) as u8,
                        ]
                    } else {
                        [0, 0, 0]
                    };
                    let cell = &mut self.cells[(y, x)];
                    if el.transparent {
                        if bits == 0 {
                            continue;
                        }
                        let existing = if (BRAILLE_BASE..=0x28FF).contains(&cell.ord) {
                            (cell.ord - BRAILLE_BASE) as u8
                        } else {
                            0
                        };
                        let base = if existing != 0 { cell.fg } else { cell.bg };
                        cell.ord = BRAILLE_BASE | (bits | existing) as u32;
                        cell.fg = lerp_rgb(base, mean, el.alpha);
                    } else {
                        cell.ord = BRAILLE_BASE | bits as u32;
                        cell.style = core_cell::Style::empty();
                        if n > 0 {
                            cell.fg = mean;
                        }
                    }
                    self.kind[(y, x)] = CellKind::Glyph;
                }
            }
        }
    }

    fn blit_sixel(&mut self, el: &Element<'_>, texture: &Texture) {
        let (ch, cw) = (self.cell_h(), self.cell_w());
        for rect in el.region.rects() {
            for y in rect.pos.y..rect.pos.y + rect.size.h {
                for x in rect.pos.x..rect.pos.x + rect.size.w {
                    let (y, x) = (y as usize, x as usize);
                    let (ty, tx) = rel(el.pos, y, x);
                    if el.transparent {
                        self.blit_sixel_cell_transparent(el, texture, y, x, ty, tx);
                    } else {
                        for sy in 0..ch {
                            for sx in 0..cw {
                                if let Some(t) = texture.get(ty * ch + sy, tx * cw + sx) {
                                    self.graphics[(y * ch + sy, x * cw + sx)] = t;
                                }
                            }
                        }
                        self.kind[(y, x)] = CellKind::Sixel;
                    }
                }
            }
        }
    }

    fn blit_sixel_cell_transparent(
        &mut self,
        el: &Element<'_>,
        texture: &Texture,
        y: usize,
        x: usize,
        ty: usize,
        tx: usize,
    ) {
        let (ch, cw) = (self.cell_h(), self.cell_w());
        let mut stats = SubrectStats::default();
        for sy in 0..ch {
            for sx in 0..cw {
                if let Some(t) = texture.get(ty * ch + sy, tx * cw + sx) {
                    stats.push(t);
                }
            }
        }
        if stats.n == 0 {
            return;
        }
        let cell = self.cells[(y, x)];
        if !is_block(cell.ord) && stats.flat() {
            // Low-variance layer over a plain glyph: composite the mean
            // through the background and let the emitter re-emit the glyph
            // with the quantized color afterwards.
            let a = el.alpha * stats.mean(3) / 255.0;
            let blended = lerp_rgb(cell.bg, stats.mean_rgb(), a);
            for sy in 0..ch {
                for sx in 0..cw {
                    self.graphics[(y * ch + sy, x * cw + sx)] =
                        [blended[0], blended[1], blended[2], 255];
                }
            }
            self.cells[(y, x)].bg = blended;
            self.kind[(y, x)] = CellKind::SeeThrough;
            return;
        }

        // Indeterminate: composite sub-pixel by sub-pixel over whichever of
        // fg/bg sits under each position of the glyph.
        let mut all_opaque = true;
        for sy in 0..ch {
            for sx in 0..cw {
                let gy = y * ch + sy;
                let gx = x * cw + sx;
                let texel = texture.get(ty * ch + sy, tx * cw + sx);
                match texel {
                    Some(t) if t[3] != 0 => {
                        let base = if is_block(cell.ord)
                            && block_fg_at(cell.ord, sy, sx, ch, cw)
                        {
                            cell.fg
                        } else {
                            cell.bg
                        };
                        let mixed =
                            lerp_rgb(base, [t[0], t[1], t[2]], el.alpha * t[3] as f32 / 255.0);
                        self.graphics[(gy, gx)] = [mixed[0], mixed[1], mixed[2], 255];
                    }
                    _ => {
                        if self.graphics[(gy, gx)][3] == 0 {
                            all_opaque = false;
                        }
                    }
                }
            }
        }
        self.kind[(y, x)] = if all_opaque {
            CellKind::Sixel
        } else {
            CellKind::Mixed
        };
    }
}
