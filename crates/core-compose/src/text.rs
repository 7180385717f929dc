//! Text canvas rendering.
//!
//! A source cell grid positioned at the element origin. The transparent
//! path distinguishes whitespace sources (blend their background like a
//! pane) from glyph sources, which replace the cell's glyph and reconcile
//! the background with whatever the pixel overlay already painted there.

use core_cell::{Cell, CellKind, Grid};

use crate::{lerp_rgb, rel, Compositor, Element};

impl Compositor {
    pub(crate) fn render_text(&mut self, el: &Element<'_>, canvas: &Grid<Cell>) {
        for rect in el.region.rects() {
            for y in rect.pos.y..rect.pos.y + rect.size.h {
                for x in rect.pos.x..rect.pos.x + rect.size.w {
                    let (y, x) = (y as usize, x as usize);
                    let (cy, cx) = rel(el.pos, y, x);
                    let Some(&src) = canvas.get(cy, cx) else {
                        continue;
                    };
                    if el.transparent {
                        self.blend_text_cell(y, x, src, el.alpha);
                    } else {
                        self.cells[(y, x)] = src;
                        self.kind[(y, x)] = CellKind::Glyph;
                    }
                }
            }
        }
    }

    pub(crate) fn blend_text_cell(&mut self, y: usize, x: usize, src: Cell, alpha: f32) {
        if src.is_whitespace() {
            self.blend_cell_color(y, x, src.bg, alpha);
            return;
        }
        let kind = self.kind[(y, x)];
        let under_bg = match kind {
            CellKind::Sixel => self.overlay_mean(y, x).0,
            CellKind::Mixed => {
                let (avg, opaque_fraction) = self.overlay_mean(y, x);
                lerp_rgb(self.cells[(y, x)].bg, avg, opaque_fraction)
            }
            _ => self.cells[(y, x)].bg,
        };
        let cell = &mut self.cells[(y, x)];
        cell.ord = src.ord;
        cell.style = src.style;
        cell.fg = src.fg;
        cell.bg = lerp_rgb(under_bg, src.bg, alpha);
        self.kind[(y, x)] = CellKind::Glyph;
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

    fn glyph(ord: char, fg: [u8; 3], bg: [u8; 3]) -> Cell {
        Cell {
            ord: ord as u32,
            style: Style::BOLD,
            fg,
            bg,
        }
    }

    #[test]
    fn opaque_copy() {
        let mut c = Compositor::new(4, 8, 2, 1);
        let mut canvas: Grid<Cell> = Grid::new(1, 2);
        canvas[(0, 0)] = glyph('h', [1, 1, 1], [2, 2, 2]);
        canvas[(0, 1)] = glyph('i', [3, 3, 3], [4, 4, 4]);
        let r = region(2, 5, 1, 2);
        let el = Element::opaque(&r, Point::new(2, 5), Payload::Text { canvas: &canvas });
        c.render(&el).unwrap();
        assert_eq!(c.cells[(2, 5)].ord, 'h' as u32);
        assert_eq!(c.cells[(2, 6)].ord, 'i' as u32);
        assert_eq!(c.cells[(2, 6)].style, Style::BOLD);
        assert_eq!(c.cells[(2, 4)].ord, 0);
    }

    #[test]
    fn transparent_whitespace_blends_like_pane() {
        let mut c = Compositor::new(2, 2, 2, 1);
        c.cells[(0, 0)].bg = [0, 0, 0];
        c.cells[(0, 0)].ord = 'x' as u32;
        let mut canvas: Grid<Cell> = Grid::new(1, 1);
        canvas[(0, 0)] = Cell::space_on([100, 100, 100]);
        let r = region(0, 0, 1, 1);
        let el = Element::translucent(&r, Point::new(0, 0), 0.5, Payload::Text { canvas: &canvas });
        c.render(&el).unwrap();
        // Glyph survives; background tinted.
        assert_eq!(c.cells[(0, 0)].ord, 'x' as u32);
        assert_eq!(c.cells[(0, 0)].bg, [50, 50, 50]);
    }

    #[test]
    fn transparent_glyph_replaces_and_blends_bg() {
        let mut c = Compositor::new(2, 2, 2, 1);
        c.cells[(0, 0)] = glyph('o', [9, 9, 9], [0, 0, 0]);
        let mut canvas: Grid<Cell> = Grid::new(1, 1);
        canvas[(0, 0)] = Cell {
            ord: 'N' as u32,
            style: Style::ITALIC,
            fg: [200, 0, 0],
            bg: [0, 200, 0],
        };
        let r = region(0, 0, 1, 1);
        let el = Element::translucent(&r, Point::new(0, 0), 0.5, Payload::Text { canvas: &canvas });
        c.render(&el).unwrap();
        let cell = c.cells[(0, 0)];
        assert_eq!(cell.ord, 'N' as u32);
        assert_eq!(cell.style, Style::ITALIC);
        assert_eq!(cell.fg, [200, 0, 0]);
        assert_eq!(cell.bg, [0, 100, 0]);
    }

    #[test]
    fn transparent_glyph_over_sixel_averages_overlay() {
        let mut c = Compositor::new(1, 1, 2, 2);
        c.kind[(0, 0)] = CellKind::Sixel;
        for py in 0..2 {
            for px in 0..2 {
                c.graphics[(py, px)] = [80, 120, 40, 255];
            }
        }
        let mut canvas: Grid<Cell> = Grid::new(1, 1);
        canvas[(0, 0)] = glyph('Q', [255, 255, 255], [80, 120, 40]);
        let r = region(0, 0, 1, 1);
        let el = Element::translucent(&r, Point::new(0, 0), 0.5, Payload::Text { canvas: &canvas });
        c.render(&el).unwrap();
        // Kind flips to glyph and the background starts from the overlay
        // average rather than the stale cell bg.
        assert_eq!(c.kind[(0, 0)], CellKind::Glyph);
        assert_eq!(c.cells[(0, 0)].bg, [80, 120, 40]);
        assert_eq!(c.cells[(0, 0)].ord, 'Q' as u32);
    }

    #[test]
    fn canvas_edges_clip() {
        let mut c = Compositor::new(2, 2, 2, 1);
        let mut canvas: Grid<Cell> = Grid::new(1, 1);
        canvas[(0, 0)] = glyph('z', [1, 1, 1], [2, 2, 2]);
        // Region larger than the canvas: out-of-canvas cells untouched.
        let r = region(0, 0, 2, 2);
        let el = Element::opaque(&r, Point::new(0, 0), Payload::Text { canvas: &canvas });
        c.render(&el).unwrap();
        assert_eq!(c.cells[(0, 0)].ord, 'z' as u32);
        assert_eq!(c.cells[(0, 1)].ord, 0);
        assert_eq!(c.cells[(1, 1)].ord, 0);
    }
}
