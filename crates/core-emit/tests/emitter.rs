//! Differential emitter integration tests: byte-level assertions over the
//! escape stream a frame produces.

use core_cell::{Cell, CellKind, Style};
use core_compose::{Blitter, Element, Payload, Texture};
use core_emit::Renderer;
use core_region::{Point, Region, Size};

fn region(y: i32, x: i32, h: i32, w: i32) -> Region {
    Region::from_rect(Point::new(y, x), Size::new(h, w))
}

/// Count complete CSI sequences ending in the given final byte.
fn count_csi(bytes: &[u8], final_byte: u8) -> usize {
    let mut n = 0;
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == 0x1b && bytes[i + 1] == b'[' {
            let mut j = i + 2;
            while j < bytes.len() && (bytes[j].is_ascii_digit() || bytes[j] == b';') {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == final_byte {
                n += 1;
            }
            i = j;
        } else {
            i += 1;
        }
    }
    n
}

fn present(r: &mut Renderer) -> Vec<u8> {
    let mut sink = Vec::new();
    r.present(&mut sink).unwrap();
    sink
}

#[test]
fn unchanged_frame_flushes_nothing() {
    let mut r = Renderer::new(4, 4, 6, 2);
    let reg = region(0, 0, 4, 4);
    let pane = Element::opaque(&reg, Point::new(0, 0), Payload::Pane { bg: [10, 20, 30] });
    r.render(&pane).unwrap();
    let first = present(&mut r);
    assert!(!first.is_empty());

    r.begin_frame();
    r.render(&pane).unwrap();
    let second = present(&mut r);
    assert!(second.is_empty(), "identical frame produced {second:?}");
    assert_eq!(r.metrics().skipped_frames, 1);
}

#[test]
fn single_cell_change_is_one_move_one_glyph() {
    let mut r = Renderer::new(4, 8, 6, 2);
    let reg = region(0, 0, 4, 8);
    let pane = Element::opaque(&reg, Point::new(0, 0), Payload::Pane { bg: [0, 0, 0] });
    r.render(&pane).unwrap();
    present(&mut r);

    r.begin_frame();
    r.render(&pane).unwrap();
    r.compositor.cells[(2, 3)] = Cell {
        ord: 'X' as u32,
        style: Style::BOLD,
        fg: [255, 255, 255],
        bg: [0, 0, 0],
    };
    let out = present(&mut r);
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("\x1b[3;4H"), "missing CUP: {s:?}");
    assert!(s.contains('X'));
    assert_eq!(count_csi(&out, b'H'), 1, "exactly one absolute move: {s:?}");
    assert_eq!(count_csi(&out, b'G'), 0);
    assert!(out.starts_with(b"\x1b7"));
    assert!(out.ends_with(b"\x1b8"));
}

#[test]
fn same_row_second_cell_uses_cha() {
    let mut r = Renderer::new(2, 8, 6, 2);
    let reg = region(0, 0, 2, 8);
    let pane = Element::opaque(&reg, Point::new(0, 0), Payload::Pane { bg: [0, 0, 0] });
    r.render(&pane).unwrap();
    present(&mut r);

    r.begin_frame();
    r.render(&pane).unwrap();
    for x in [1usize, 5usize] {
        r.compositor.cells[(0, x)].ord = 'o' as u32;
    }
    let out = present(&mut r);
    assert_eq!(count_csi(&out, b'H'), 1);
    assert_eq!(count_csi(&out, b'G'), 1, "same-row move must be CHA");
}

#[test]
fn adjacent_cells_need_no_move_between_them() {
    let mut r = Renderer::new(2, 8, 6, 2);
    let reg = region(0, 0, 2, 8);
    let pane = Element::opaque(&reg, Point::new(0, 0), Payload::Pane { bg: [0, 0, 0] });
    r.render(&pane).unwrap();
    present(&mut r);

    r.begin_frame();
    r.render(&pane).unwrap();
    r.compositor.cells[(1, 2)].ord = 'a' as u32;
    r.compositor.cells[(1, 3)].ord = 'b' as u32;
    let out = present(&mut r);
    assert_eq!(count_csi(&out, b'H'), 1);
    assert_eq!(count_csi(&out, b'G'), 0, "tracked cursor covers adjacency");
}

#[test]
fn sixel_cells_emit_dcs_block() {
    let mut r = Renderer::new(4, 4, 6, 2);
    let reg = region(0, 0, 4, 4);
    let pane = Element::opaque(&reg, Point::new(0, 0), Payload::Pane { bg: [0, 0, 0] });
    r.render(&pane).unwrap();
    let img = region(1, 1, 2, 2);
    let tex = Texture::solid(12, 4, [200, 40, 40, 255]);
    let gfx = Element::opaque(
        &img,
        Point::new(1, 1),
        Payload::Graphics { texture: &tex, blitter: Blitter::Sixel },
    );
    r.render(&gfx).unwrap();
    let out = present(&mut r);
    let s = String::from_utf8_lossy(&out);
    // Cursor parked at the rect origin before the DCS.
    assert!(s.contains("\x1b[2;2H"), "missing rect-origin CUP: {s}");
    // 2x2 cells at 6x2 pixels per cell.
    assert!(s.contains("q\"1;1;4;12"), "missing raster header: {s}");
    assert!(s.contains("\x1bP"), "missing DCS intro: {s}");
    assert!(s.contains("\x1b\\"), "missing string terminator: {s}");
    assert_eq!(r.metrics().sixel_frames, 1);
}

#[test]
fn unchanged_sixel_block_is_not_reemitted() {
    let mut r = Renderer::new(4, 4, 6, 2);
    let img = region(0, 0, 2, 2);
    let tex = Texture::solid(12, 4, [1, 2, 3, 255]);
    let gfx = Element::opaque(
        &img,
        Point::new(0, 0),
        Payload::Graphics { texture: &tex, blitter: Blitter::Sixel },
    );
    r.render(&gfx).unwrap();
    let first = present(&mut r);
    assert!(!first.is_empty());

    r.begin_frame();
    r.render(&gfx).unwrap();
    let second = present(&mut r);
    assert!(second.is_empty(), "static overlay must not re-emit: {second:?}");
}

#[test]
fn last_row_height_rounds_down_to_sixel_multiple() {
    // 2 rows of 4-pixel cells: 8 pixel rows -> rounded to 6; the last
    // row's cells fall back to the glyph path as Mixed.
    let mut r = Renderer::new(2, 2, 4, 2);
    let img = region(0, 0, 2, 2);
    let tex = Texture::solid(8, 4, [9, 90, 200, 255]);
    let gfx = Element::opaque(
        &img,
        Point::new(0, 0),
        Payload::Graphics { texture: &tex, blitter: Blitter::Sixel },
    );
    r.render(&gfx).unwrap();
    let out = present(&mut r);
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains("q\"1;1;4;6"), "height must be rounded to 6: {s}");
    assert_eq!(r.compositor.kind[(1, 0)], CellKind::Mixed);
    assert_eq!(r.compositor.kind[(1, 1)], CellKind::Mixed);
    assert_eq!(r.compositor.kind[(0, 0)], CellKind::Sixel);
}

#[test]
fn zero_height_after_rounding_skips_sixel_but_keeps_glyphs() {
    // A single 4-pixel-tall row touching the bottom rounds to zero sixel
    // rows: no DCS goes out, but the truncated cells repaint as glyphs.
    let mut r = Renderer::new(1, 3, 4, 2);
    let img = region(0, 0, 1, 3);
    let tex = Texture::solid(4, 6, [77, 0, 0, 255]);
    let gfx = Element::opaque(
        &img,
        Point::new(0, 0),
        Payload::Graphics { texture: &tex, blitter: Blitter::Sixel },
    );
    r.render(&gfx).unwrap();
    let out = present(&mut r);
    assert!(!out.windows(2).any(|w| w == b"\x1bP"), "no DCS expected: {out:?}");
    assert_eq!(r.compositor.kind[(0, 0)], CellKind::Mixed);
    // The Mixed glyphs still went out (spaces over the default colors).
    assert!(out.windows(2).any(|w| w == b"\x1b7"));
    assert_eq!(r.metrics().sixel_frames, 0);
}

#[test]
fn see_through_background_is_reconciled_with_palette() {
    let mut r = Renderer::new(2, 2, 6, 2);
    let reg = region(0, 0, 2, 2);
    let pane = Element::opaque(&reg, Point::new(0, 0), Payload::Pane { bg: [0, 0, 0] });
    r.render(&pane).unwrap();
    r.compositor.cells[(0, 0)].ord = 'A' as u32;
    r.compositor.cells[(0, 0)].fg = [255, 255, 255];
    // Flat translucent layer over the first cell only.
    let img = region(0, 0, 1, 1);
    let tex = Texture::solid(6, 2, [100, 100, 100, 255]);
    let gfx = Element::translucent(
        &img,
        Point::new(0, 0),
        0.5,
        Payload::Graphics { texture: &tex, blitter: Blitter::Sixel },
    );
    r.render(&gfx).unwrap();
    assert_eq!(r.compositor.kind[(0, 0)], CellKind::SeeThrough);
    assert_eq!(r.compositor.cells[(0, 0)].bg, [50, 50, 50]);

    let out = present(&mut r);
    let s = String::from_utf8_lossy(&out);
    // The reconciled background is the palette color mapped back to 0-255:
    // round-tripping 50 through the 0-99 register space gives 49.
    let bg = r.compositor.cells[(0, 0)].bg;
    assert_eq!(bg, [49, 49, 49]);
    assert!(
        s.contains("48;2;49;49;49"),
        "glyph must re-emit with quantized bg: {s}"
    );
    assert!(s.contains('A'));
}

#[test]
fn resize_forces_full_emission() {
    let mut r = Renderer::new(2, 2, 6, 2);
    let reg = region(0, 0, 2, 2);
    let pane = Element::opaque(&reg, Point::new(0, 0), Payload::Pane { bg: [30, 30, 30] });
    r.render(&pane).unwrap();
    present(&mut r);

    r.resize(3, 3);
    r.begin_frame();
    let reg2 = region(0, 0, 3, 3);
    let pane2 = Element::opaque(&reg2, Point::new(0, 0), Payload::Pane { bg: [30, 30, 30] });
    r.render(&pane2).unwrap();
    let out = present(&mut r);
    assert!(!out.is_empty(), "resized frame must repaint");
}

#[test]
fn wide_glyph_advances_cursor_two_columns() {
    let mut r = Renderer::new(1, 6, 6, 2);
    let reg = region(0, 0, 1, 6);
    let pane = Element::opaque(&reg, Point::new(0, 0), Payload::Pane { bg: [0, 0, 0] });
    r.render(&pane).unwrap();
    present(&mut r);

    r.begin_frame();
    r.render(&pane).unwrap();
    r.compositor.cells[(0, 0)].ord = '漢' as u32;
    r.compositor.cells[(0, 1)].ord = 0;
    r.compositor.cells[(0, 2)].ord = 'x' as u32;
    let out = present(&mut r);
    // 漢 occupies columns 1-2; 'x' at column 3 follows with no move at all.
    assert_eq!(count_csi(&out, b'H'), 1);
    assert_eq!(count_csi(&out, b'G'), 0);
    let s = String::from_utf8_lossy(&out);
    assert!(s.contains('漢'));
    assert!(s.contains('x'));
}
