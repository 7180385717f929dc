//! Geometry of the Unicode block elements, U+2580..U+259F.
//!
//! When a transparent sixel layer lands on a cell showing a block glyph,
//! each overlay pixel must composite against the color actually beneath
//! it: the cell foreground where the glyph ink is, the background
//! elsewhere. These 32 predicates answer "is this sub-pixel foreground"
//! from the sub-pixel's position within the cell.

/// First block element codepoint.
pub const BLOCK_BASE: u32 = 0x2580;

/// True for the 32 block element glyphs the predicate table covers.
pub fn is_block(ord: u32) -> bool {
    (BLOCK_BASE..=0x259F).contains(&ord)
}

/// Is the sub-pixel at `(py, px)` of a `h`x`w` cell covered by the glyph's
/// foreground? `ord` must satisfy [`is_block`].
pub fn block_fg_at(ord: u32, py: usize, px: usize, h: usize, w: usize) -> bool {
    // Sample at the sub-pixel center.
    let ty = (py as f32 + 0.5) / h as f32;
    let tx = (px as f32 + 0.5) / w as f32;
    let upper = ty < 0.5;
    let left = tx < 0.5;
    match ord {
        0x2580 => upper,                       // ▀
        0x2581..=0x2587 => {
            // ▁..▇ lower eighth bars, 1/8 per step.
            let eighths = (ord - 0x2580) as f32;
            ty >= 1.0 - eighths / 8.0
        }
        0x2588 => true,                        // █
        0x2589..=0x258F => {
            // ▉..▏ left bars shrinking from 7/8 to 1/8.
            let eighths = (0x2590 - ord) as f32;
            tx < eighths / 8.0
        }
        0x2590 => !left,                       // ▐
        0x2591 => py % 2 == 0 && px % 2 == 0,  // ░ light shade
        0x2592 => (py + px) % 2 == 0,          // ▒ medium shade
        0x2593 => !(py % 2 == 1 && px % 2 == 1), // ▓ dark shade
        0x2594 => ty < 1.0 / 8.0,              // ▔
        0x2595 => tx >= 7.0 / 8.0,             // ▕
        0x2596 => !upper && left,              // ▖
        0x2597 => !upper && !left,             // ▗
        0x2598 => upper && left,               // ▘
        0x2599 => !(upper && !left),           // ▙
        0x259A => upper == left,               // ▚
        0x259B => !(!upper && !left),          // ▛
        0x259C => !(!upper && left),           // ▜
        0x259D => upper && !left,              // ▝
        0x259E => upper != left,               // ▞
        0x259F => !(upper && left),            // ▟
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_range() {
        assert!(is_block(0x2580));
        assert!(is_block(0x259F));
        assert!(!is_block(0x25A0));
        assert!(!is_block('a' as u32));
    }

    #[test]
    fn upper_half() {
        assert!(block_fg_at(0x2580, 0, 0, 4, 2));
        assert!(block_fg_at(0x2580, 1, 1, 4, 2));
        assert!(!block_fg_at(0x2580, 2, 0, 4, 2));
        assert!(!block_fg_at(0x2580, 3, 1, 4, 2));
    }

    #[test]
    fn full_block_everywhere() {
        for py in 0..4 {
            for px in 0..2 {
                assert!(block_fg_at(0x2588, py, px, 4, 2));
            }
        }
    }

    #[test]
    fn lower_eighth_bars_grow_upward() {
        // ▄ (4/8) covers rows 2..4 of a 4-row cell.
        assert!(!block_fg_at(0x2584, 1, 0, 4, 2));
        assert!(block_fg_at(0x2584, 2, 0, 4, 2));
        // ▁ (1/8) covers only the bottom row of an 8-row cell.
        assert!(block_fg_at(0x2581, 7, 0, 8, 2));
        assert!(!block_fg_at(0x2581, 6, 0, 8, 2));
    }

    #[test]
    fn left_bars_shrink_rightward() {
        // ▌ left half.
        assert!(block_fg_at(0x258C, 0, 0, 4, 2));
        assert!(!block_fg_at(0x258C, 0, 1, 4, 2));
        // ▏ 1/8: nothing foreground at 2-wide resolution (centers at 1/4, 3/4).
        assert!(!block_fg_at(0x258F, 0, 0, 4, 2));
        assert!(block_fg_at(0x258F, 0, 0, 4, 16));
    }

    #[test]
    fn quadrants() {
        // ▚ holds upper-left and lower-right.
        assert!(block_fg_at(0x259A, 0, 0, 4, 2));
        assert!(block_fg_at(0x259A, 3, 1, 4, 2));
        assert!(!block_fg_at(0x259A, 0, 1, 4, 2));
        assert!(!block_fg_at(0x259A, 3, 0, 4, 2));
        // ▟ misses only upper-left.
        assert!(!block_fg_at(0x259F, 0, 0, 4, 2));
        assert!(block_fg_at(0x259F, 0, 1, 4, 2));
        assert!(block_fg_at(0x259F, 3, 0, 4, 2));
    }

    #[test]
    fn shades_hit_expected_density() {
        let density = |ord: u32| {
            let mut n = 0;
            for py in 0..4 {
                for px in 0..4 {
                    if block_fg_at(ord, py, px, 4, 4) {
                        n += 1;
                    }
                }
            }
            n
        };
        assert_eq!(density(0x2591), 4); // 25%
        assert_eq!(density(0x2592), 8); // 50%
        assert_eq!(density(0x2593), 12); // 75%
    }
}
