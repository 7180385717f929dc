//! Cursor-motion and SGR escape building.
//!
//! The emitter tracks the last position and attributes it sent; these
//! helpers append only the delta. Truecolor is assumed throughout (the
//! renderer never falls back to indexed palettes).

use std::collections::TryReserveError;

use core_cell::{Rgb, Style};

use crate::outbuf::OutBuf;

pub const ESC: u8 = 0x1b;

/// Style bits with their SGR on/off code pairs.
const STYLE_CODES: [(Style, u32, u32); 6] = [
    (Style::BOLD, 1, 22),
    (Style::ITALIC, 3, 23),
    (Style::UNDERLINE, 4, 24),
    (Style::STRIKETHROUGH, 9, 29),
    (Style::OVERLINE, 53, 55),
    (Style::REVERSE, 7, 27),
];

/// `CUP`: absolute move, 1-based.
pub fn cup(out: &mut OutBuf, row: u32, col: u32) -> Result<(), TryReserveError> {
    out.put(&[ESC, b'['])?;
    out.put_dec(row)?;
    out.put_byte(b';')?;
    out.put_dec(col)?;
    out.put_byte(b'H')
}

/// `CHA`: column move within the current row, 1-based.
pub fn cha(out: &mut OutBuf, col: u32) -> Result<(), TryReserveError> {
    out.put(&[ESC, b'['])?;
    out.put_dec(col)?;
    out.put_byte(b'G')
}

/// Save / restore cursor (DECSC / DECRC).
pub fn save_cursor(out: &mut OutBuf) -> Result<(), TryReserveError> {
    out.put(&[ESC, b'7'])
}

pub fn restore_cursor(out: &mut OutBuf) -> Result<(), TryReserveError> {
    out.put(&[ESC, b'8'])
}

/// Append the SGR sequence taking the terminal from `prev` to `next`.
/// `None` means the attribute state is unknown: reset and re-assert
/// everything. Appends nothing when no parameter is needed.
pub fn sgr_delta(
    out: &mut OutBuf,
    prev: Option<(Style, Rgb, Rgb)>,
    next: (Style, Rgb, Rgb),
) -> Result<(), TryReserveError> {
    let (style, fg, bg) = next;
    let mut params: Vec<u32> = Vec::new();
    match prev {
        None => {
            params.push(0);
            for (bit, on, _) in STYLE_CODES {
                if style.contains(bit) {
                    params.push(on);
                }
            }
            push_color(&mut params, 38, fg);
            push_color(&mut params, 48, bg);
        }
        Some((pstyle, pfg, pbg)) => {
            for (bit, on, off) in STYLE_CODES {
                if style.contains(bit) != pstyle.contains(bit) {
                    params.push(if style.contains(bit) { on } else { off });
                }
            }
            if fg != pfg {
                push_color(&mut params, 38, fg);
            }
            if bg != pbg {
                push_color(&mut params, 48, bg);
            }
        }
    }
    if params.is_empty() {
        return Ok(());
    }
    out.put(&[ESC, b'['])?;
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            out.put_byte(b';')?;
        }
        out.put_dec(*p)?;
    }
    out.put_byte(b'm')
}

fn push_color(params: &mut Vec<u32>, base: u32, rgb: Rgb) {
    params.extend_from_slice(&[base, 2, rgb[0] as u32, rgb[1] as u32, rgb[2] as u32]);
}
