//! Solid pane rendering.

use core_cell::{Cell, CellKind, Rgb};

use crate::{Compositor, Element};

impl Compositor {
    pub(crate) fn render_pane(&mut self, el: &Element<'_>, bg: Rgb) {
        if !el.transparent {
            for rect in el.region.rects() {
                for y in rect.pos.y..rect.pos.y + rect.size.h {
                    for x in rect.pos.x..rect.pos.x + rect.size.w {
                        let (y, x) = (y as usize, x as usize);
                        self.cells[(y, x)] = Cell::space_on(bg);
                        self.kind[(y, x)] = CellKind::Glyph;
                    }
                }
            }
            return;
        }

        let a = el.alpha;
        for rect in el.region.rects() {
            for y in rect.pos.y..rect.pos.y + rect.size.h {
                for x in rect.pos.x..rect.pos.x + rect.size.w {
                    self.blend_cell_color(y as usize, x as usize, bg, a);
                }
            }
        }
    }
}
