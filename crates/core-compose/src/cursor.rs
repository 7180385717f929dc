//! Cursor overlay: the final style pass over a region.

use core_cell::{Rgb, Style};

use crate::{Compositor, Element};

impl Compositor {
    pub(crate) fn render_cursor(
        &mut self,
        el: &Element<'_>,
        on: Style,
        off: Style,
        fg: Option<Rgb>,
        bg: Option<Rgb>,
    ) {
        for rect in el.region.rects() {
            for y in rect.pos.y..rect.pos.y + rect.size.h {
                for x in rect.pos.x..rect.pos.x + rect.size.w {
                    let cell = &mut self.cells[(y as usize, x as usize)];
                    cell.style = (cell.style | on) - off;
                    if let Some(fg) = fg {
                        cell.fg = fg;
                    }
                    if let Some(bg) = bg {
                        cell.bg = bg;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Payload;
    use core_region::{Point, Region, Size};

    #[test]
    fn masks_and_overrides() {
        let mut c = Compositor::new(2, 2, 2, 1);
        c.cells[(0, 0)].style = Style::BOLD | Style::ITALIC;
        let r = Region::from_rect(Point::new(0, 0), Size::new(1, 1));
        let el = Element::opaque(
            &r,
            Point::new(0, 0),
            Payload::Cursor {
                on: Style::REVERSE,
                off: Style::ITALIC,
                fg: Some([1, 2, 3]),
                bg: None,
            },
        );
        c.render(&el).unwrap();
        let cell = c.cells[(0, 0)];
        assert_eq!(cell.style, Style::BOLD | Style::REVERSE);
        assert_eq!(cell.fg, [1, 2, 3]);
        assert_eq!(c.cells[(0, 1)].style, Style::empty(), "outside region untouched");
    }
}
