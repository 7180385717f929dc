//! Particle fields: cell or pixel particles at fractional positions.
//!
//! Particles land at the floor of their position. A particle outside the
//! element region is skipped, as is a wide cell particle whose second
//! column the region clips. The braille field accumulates sub-pixels over
//! the region's bounding rect first and commits whole cells afterwards, so
//! many particles in one cell merge into a single glyph.

use core_cell::{width, Cell, CellKind, Rgb};

use crate::graphics::DOT_BITS;
use crate::{lerp_rgb, Blitter, Compositor, Element, PixelParticle, TextParticle};

const BRAILLE_BASE: u32 = 0x2800;
const BRAILLE_LAST: u32 = 0x28FF;
const UPPER_HALF: u32 = 0x2580;

impl Compositor {
    pub(crate) fn render_text_field(&mut self, el: &Element<'_>, particles: &[TextParticle]) {
        for p in particles {
            let y = p.y.floor() as i32;
            let x = p.x.floor() as i32;
            if !el.region.contains(y, x) {
                continue;
            }
            let w = width::cell_width(&p.cell, &self.pool);
            if w > 1 && !el.region.contains(y, x + 1) {
                // Wide particle clipped by the region: suppressed entirely.
                continue;
            }
            let (yu, xu) = (y as usize, x as usize);
            if el.transparent {
                self.blend_text_cell(yu, xu, p.cell, el.alpha);
                if w > 1 {
                    self.blend_cell_color(yu, xu + 1, p.cell.bg, el.alpha);
                    self.cells[(yu, xu + 1)].ord = 0;
                }
            } else {
                self.cells[(yu, xu)] = p.cell;
                self.kind[(yu, xu)] = CellKind::Glyph;
                if w > 1 {
                    self.cells[(yu, xu + 1)] = Cell {
                        ord: 0,
                        style: p.cell.style,
                        fg: p.cell.fg,
                        bg: p.cell.bg,
                    };
                    self.kind[(yu, xu + 1)] = CellKind::Glyph;
                }
            }
        }
    }

    pub(crate) fn render_graphics_field(
        &mut self,
        el: &Element<'_>,
        particles: &[PixelParticle],
        blitter: Blitter,
    ) {
        if blitter == Blitter::Braille {
            self.braille_field(el, particles);
            return;
        }
        let (ph, pw) = blitter.density(self.cell_h(), self.cell_w());
        for p in particles {
            let sy = p.y.floor() as i32;
            let sx = p.x.floor() as i32;
            if sy < 0 || sx < 0 {
                continue;
            }
            let (cy, cx) = (sy / ph as i32, sx / pw as i32);
            if !el.region.contains(cy, cx) {
                continue;
            }
            if p.color[3] == 0 {
                continue;
            }
            let rgb = [p.color[0], p.color[1], p.color[2]];
            let a = if el.transparent {
                el.alpha * p.color[3] as f32 / 255.0
            } else {
                1.0
            };
            let (yu, xu) = (cy as usize, cx as usize);
            match blitter {
                Blitter::Full => {
                    if el.transparent {
                        self.blend_cell_color(yu, xu, rgb, a);
                    } else {
                        self.cells[(yu, xu)] = Cell::space_on(rgb);
                        self.kind[(yu, xu)] = CellKind::Glyph;
                    }
                }
                Blitter::Half => {
                    let cell = self.cells[(yu, xu)];
                    let (cur_up, cur_dn) = if cell.ord == UPPER_HALF {
                        (cell.fg, cell.bg)
                    } else {
                        (cell.bg, cell.bg)
                    };
                    let color = |cur: Rgb| {
                        if el.transparent {
                            lerp_rgb(cur, rgb, a)
                        } else {
                            rgb
                        }
                    };
                    if sy % 2 == 0 {
                        self.write_half(yu, xu, color(cur_up), cur_dn);
                    } else {
                        self.write_half(yu, xu, cur_up, color(cur_dn));
                    }
                }
                Blitter::Sixel => {
                    let gy = sy as usize;
                    let gx = sx as usize;
                    let base = self.cells[(yu, xu)].bg;
                    let px = &mut self.graphics[(gy, gx)];
                    let mixed = if el.transparent {
                        let under = if px[3] != 0 { [px[0], px[1], px[2]] } else { base };
                        lerp_rgb(under, rgb, a)
                    } else {
                        rgb
                    };
                    *px = [mixed[0], mixed[1], mixed[2], 255];
                    if self.kind[(yu, xu)] == CellKind::Glyph {
                        self.kind[(yu, xu)] = CellKind::Mixed;
                    }
                }
                Blitter::Braille => unreachable!("handled above"),
            }
        }
    }

    /// Accumulate braille particles into a sub-pixel grid over the region's
    /// bounding rect, then commit one glyph per touched cell.
    fn braille_field(&mut self, el: &Element<'_>, particles: &[PixelParticle]) {
        let Some(bbox) = el.region.bbox() else {
            return;
        };
        let acc_h = bbox.size.h as usize * 4;
        let acc_w = bbox.size.w as usize * 2;
        let mut count = vec![0u32; acc_h * acc_w];
        let mut sums = vec![[0u64; 3]; acc_h * acc_w];

        for p in particles {
            let sy = p.y.floor() as i32;
            let sx = p.x.floor() as i32;
            if sy < 0 || sx < 0 || p.color[3] == 0 {
                continue;
            }
            let (cy, cx) = (sy / 4, sx / 2);
            if !el.region.contains(cy, cx) {
                continue;
            }
            let ry = (sy - bbox.pos.y * 4) as usize;
            let rx = (sx - bbox.pos.x * 2) as usize;
            let i = ry * acc_w + rx;
            count[i] += 1;
            sums[i][0] += p.color[0] as u64;
            sums[i][1] += p.color[1] as u64;
            sums[i][2] += p.color[2] as u64;
        }

        for rect in el.region.rects() {
            for y in rect.pos.y..rect.pos.y + rect.size.h {
                for x in rect.pos.x..rect.pos.x + rect.size.w {
                    let mut bits = 0u8;
                    let mut sum = [0u64; 3];
                    let mut ncolors = 0u64;
                    for sy in 0..4 {
                        for sx in 0..2 {
                            let ry = (y - bbox.pos.y) as usize * 4 + sy;
                            let rx = (x - bbox.pos.x) as usize * 2 + sx;
                            let i = ry * acc_w + rx;
                            if count[i] > 0 {
                                bits |= DOT_BITS[sy * 2 + sx];
                                sum[0] += sums[i][0];
                                sum[1] += sums[i][1];
                                sum[2] += sums[i][2];
                                ncolors += count[i] as u64;
                            }
                        }
                    }
                    if ncolors == 0 {
                        continue;
                    }
                    let mean = [
                        (sum[0] / ncolors) as u8,
                        (sum[1] / ncolors) as u8,
                        (sum[2] / ncolors) as u8,
                    ];
                    let (yu, xu) = (y as usize, x as usize);
                    let cell = &mut self.cells[(yu, xu)];
                    // Keep the explicit braille-range check on the existing
                    // ord; do not fold it into the ncolors guard above.
                    let existing = if (BRAILLE_BASE..=BRAILLE_LAST).contains(&cell.ord) {
                        (cell.ord - BRAILLE_BASE) as u8
                    } else {
                        0
                    };
                    cell.ord = BRAILLE_BASE | (bits | existing) as u32;
                    cell.fg = if el.transparent {
                        let base = if existing != 0 { cell.fg } else { cell.bg };
                        lerp_rgb(base, mean, el.alpha)
                    } else {
                        mean
                    };
                    self.kind[(yu, xu)] = CellKind::Glyph;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Payload;
    use core_cell::Style;
    use core_region::{Point, Region, Size};

    fn region(y: i32, x: i32, h: i32, w: i32) -> Region {
        Region::from_rect(Point::new(y, x), Size::new(h, w))
    }

    fn cell(ord: char) -> Cell {
        Cell {
            ord: ord as u32,
            style: Style::empty(),
            fg: [200, 200, 200],
            bg: [10, 10, 10],
        }
    }

    #[test]
    fn text_particles_floor_positions() {
        let mut c = Compositor::new(4, 4, 2, 1);
        let particles = [
            TextParticle { y: 1.9, x: 2.2, cell: cell('a') },
            TextParticle { y: 0.0, x: 0.7, cell: cell('b') },
        ];
        let r = region(0, 0, 4, 4);
        let el = Element::opaque(&r, Point::new(0, 0), Payload::TextField { particles: &particles });
        c.render(&el).unwrap();
        assert_eq!(c.cells[(1, 2)].ord, 'a' as u32);
        assert_eq!(c.cells[(0, 0)].ord, 'b' as u32);
    }

    #[test]
    fn particle_outside_region_is_skipped() {
        let mut c = Compositor::new(4, 4, 2, 1);
        let particles = [TextParticle { y: 3.0, x: 3.0, cell: cell('a') }];
        let r = region(0, 0, 2, 2);
        let el = Element::opaque(&r, Point::new(0, 0), Payload::TextField { particles: &particles });
        c.render(&el).unwrap();
        assert_eq!(c.cells[(3, 3)].ord, 0);
    }

    #[test]
    fn wide_particle_clipped_at_region_edge() {
        let mut c = Compositor::new(2, 4, 2, 1);
        let wide = Cell {
            ord: '界' as u32,
            style: Style::empty(),
            fg: [1, 1, 1],
            bg: [2, 2, 2],
        };
        let particles = [
            TextParticle { y: 0.0, x: 2.0, cell: wide }, // second column outside
            TextParticle { y: 1.0, x: 0.0, cell: wide }, // fits
        ];
        let r = region(0, 0, 2, 3);
        let el = Element::opaque(&r, Point::new(0, 0), Payload::TextField { particles: &particles });
        c.render(&el).unwrap();
        assert_eq!(c.cells[(0, 2)].ord, 0, "clipped wide particle suppressed");
        assert_eq!(c.cells[(1, 0)].ord, '界' as u32);
        assert_eq!(c.cells[(1, 1)].ord, 0, "continuation slot");
    }

    #[test]
    fn full_pixel_particles_paint_cells() {
        let mut c = Compositor::new(2, 2, 2, 1);
        let particles = [PixelParticle { y: 1.5, x: 0.5, color: [5, 6, 7, 255] }];
        let r = region(0, 0, 2, 2);
        let el = Element::opaque(
            &r,
            Point::new(0, 0),
            Payload::GraphicsField { particles: &particles, blitter: Blitter::Full },
        );
        c.render(&el).unwrap();
        assert_eq!(c.cells[(1, 0)].bg, [5, 6, 7]);
        assert_eq!(c.cells[(1, 0)].ord, 0x20);
    }

    #[test]
    fn half_pixel_particles_pick_their_half() {
        let mut c = Compositor::new(2, 2, 2, 1);
        let particles = [
            PixelParticle { y: 0.0, x: 0.0, color: [255, 0, 0, 255] }, // upper of row 0
            PixelParticle { y: 1.0, x: 0.0, color: [0, 0, 255, 255] }, // lower of row 0
        ];
        let r = region(0, 0, 2, 2);
        let el = Element::opaque(
            &r,
            Point::new(0, 0),
            Payload::GraphicsField { particles: &particles, blitter: Blitter::Half },
        );
        c.render(&el).unwrap();
        let cell = c.cells[(0, 0)];
        assert_eq!(cell.ord, 0x2580);
        assert_eq!(cell.fg, [255, 0, 0]);
        assert_eq!(cell.bg, [0, 0, 255]);
    }

    #[test]
    fn sixel_pixel_particle_marks_mixed() {
        let mut c = Compositor::new(2, 2, 4, 2);
        let particles = [PixelParticle { y: 5.0, x: 2.0, color: [9, 9, 9, 255] }];
        let r = region(0, 0, 2, 2);
        let el = Element::opaque(
            &r,
            Point::new(0, 0),
            Payload::GraphicsField { particles: &particles, blitter: Blitter::Sixel },
        );
        c.render(&el).unwrap();
        // Pixel (5,2) lies in cell (1,1).
        assert_eq!(c.kind[(1, 1)], CellKind::Mixed);
        assert_eq!(c.graphics[(5, 2)], [9, 9, 9, 255]);
    }

    #[test]
    fn braille_field_accumulates_within_cell() {
        let mut c = Compositor::new(2, 2, 2, 1);
        // Dots (0,0) and (3,1) of cell (0,0): bits 1 | 128.
        let particles = [
            PixelParticle { y: 0.2, x: 0.8, color: [100, 0, 0, 255] },
            PixelParticle { y: 3.9, x: 1.1, color: [0, 100, 0, 255] },
        ];
        let r = region(0, 0, 2, 2);
        let el = Element::opaque(
            &r,
            Point::new(0, 0),
            Payload::GraphicsField { particles: &particles, blitter: Blitter::Braille },
        );
        c.render(&el).unwrap();
        assert_eq!(c.cells[(0, 0)].ord, 0x2800 | 1 | 128);
        assert_eq!(c.cells[(0, 0)].fg, [50, 50, 0]);
        assert_eq!(c.kind[(0, 0)], CellKind::Glyph);
    }

    #[test]
    fn braille_field_merges_with_existing_braille_glyph() {
        let mut c = Compositor::new(1, 1, 2, 1);
        c.cells[(0, 0)].ord = 0x2800 | 0x40; // dot 7 already lit
        let particles = [PixelParticle { y: 0.0, x: 0.0, color: [10, 10, 10, 255] }];
        let r = region(0, 0, 1, 1);
        let el = Element::opaque(
            &r,
            Point::new(0, 0),
            Payload::GraphicsField { particles: &particles, blitter: Blitter::Braille },
        );
        c.render(&el).unwrap();
        assert_eq!(c.cells[(0, 0)].ord, 0x2800 | 0x40 | 0x01);
    }

    #[test]
    fn braille_field_ignores_non_braille_ord() {
        let mut c = Compositor::new(1, 1, 2, 1);
        c.cells[(0, 0)].ord = 'W' as u32;
        let particles = [PixelParticle { y: 0.0, x: 0.0, color: [10, 10, 10, 255] }];
        let r = region(0, 0, 1, 1);
        let el = Element::opaque(
            &r,
            Point::new(0, 0),
            Payload::GraphicsField { particles: &particles, blitter: Blitter::Braille },
        );
        c.render(&el).unwrap();
        assert_eq!(c.cells[(0, 0)].ord, 0x2800 | 0x01, "glyph replaced, no bit merge");
    }
}
