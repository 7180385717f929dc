//! Sixel bitstream encoder.
//!
//! Single pass over each 6-row band: every column contributes up to six
//! distinct `(color, bitmask)` pairs (bit `r mod 6` per matching row). Each
//! color active in the band owns an extender: a contiguous same-bitmask run
//! is lengthened; anything else flushes the pending run (run-length encoded
//! as `!N<char>` when N ≥ 3) and pads the gap with zero columns. Colors of
//! one band are separated by `$` (graphics carriage return), bands by `-`.
//!
//! Stream framing: `ESC P ; P2 ; q " ah ; aw ; W ; H <palette> <bands> ESC \`
//! with `P2 = 1` iff any pixel in the rect was transparent, and palette
//! registers defined as `#i;2;R;G;B` in 0–99 space.

use crate::{Quantized, TRANSPARENT};

const ESC: u8 = 0x1b;

/// Append a decimal integer without heap traffic.
fn push_dec(out: &mut Vec<u8>, mut v: u32) {
    let mut buf = [0u8; 10];
    let mut i = buf.len();
    loop {
        i -= 1;
        buf[i] = b'0' + (v % 10) as u8;
        v /= 10;
        if v == 0 {
            break;
        }
    }
    out.extend_from_slice(&buf[i..]);
}

/// Append one run of a sixel character: raw repeats under 3, `!N<c>` above.
fn push_run(out: &mut Vec<u8>, bits: u8, n: u32) {
    if n == 0 {
        return;
    }
    let ch = 0x3f + bits;
    if n >= 3 {
        out.push(b'!');
        push_dec(out, n);
        out.push(ch);
    } else {
        for _ in 0..n {
            out.push(ch);
        }
    }
}

/// Per-color extender state within one band.
#[derive(Debug, Default)]
struct Extender {
    /// Columns already committed to `bytes` (runs and gaps).
    covered: u32,
    run_bits: u8,
    run_len: u32,
    bytes: Vec<u8>,
}

impl Extender {
    fn flush_run(&mut self) {
        if self.run_len > 0 {
            push_run(&mut self.bytes, self.run_bits, self.run_len);
            self.covered += self.run_len;
            self.run_len = 0;
        }
    }

    /// Feed the bitmask observed for this color at column `x`.
    fn feed(&mut self, x: u32, bits: u8) {
        if self.run_len > 0 && x == self.covered + self.run_len && bits == self.run_bits {
            self.run_len += 1;
            return;
        }
        self.flush_run();
        if x > self.covered {
            push_run(&mut self.bytes, 0, x - self.covered);
            self.covered = x;
        }
        self.run_bits = bits;
        self.run_len = 1;
    }
}

/// Encode a quantized rect as a complete DCS sixel stream appended to `out`.
pub fn encode(out: &mut Vec<u8>, q: &Quantized, aspect: (u16, u16)) {
    debug_assert_eq!(q.indices.len(), q.w * q.h);
    let p2: u8 = if q.has_transparent { 1 } else { 0 };

    out.extend_from_slice(&[ESC, b'P', b';']);
    push_dec(out, p2 as u32);
    out.extend_from_slice(b";q\"");
    push_dec(out, aspect.0 as u32);
    out.push(b';');
    push_dec(out, aspect.1 as u32);
    out.push(b';');
    push_dec(out, q.w as u32);
    out.push(b';');
    push_dec(out, q.h as u32);

    for (i, p) in q.palette.iter().enumerate() {
        out.push(b'#');
        push_dec(out, i as u32);
        out.extend_from_slice(b";2;");
        push_dec(out, p[0] as u32);
        out.push(b';');
        push_dec(out, p[1] as u32);
        out.push(b';');
        push_dec(out, p[2] as u32);
    }

    // Extender slots, one per palette register, reused across bands.
    let mut extenders: Vec<Extender> = Vec::new();
    extenders.resize_with(q.palette.len(), Extender::default);
    let mut active: Vec<u16> = Vec::with_capacity(6);

    let bands = q.h.div_ceil(6);
    for band in 0..bands {
        let y0 = band * 6;
        let rows = (q.h - y0).min(6);
        active.clear();

        for x in 0..q.w {
            // Up to six distinct colors in this column.
            let mut col_colors = [0u16; 6];
            let mut col_bits = [0u8; 6];
            let mut n = 0usize;
            for r in 0..rows {
                let idx = q.indices[(y0 + r) * q.w + x];
                if idx == TRANSPARENT {
                    continue;
                }
                match col_colors[..n].iter().position(|&c| c == idx) {
                    Some(slot) => col_bits[slot] |= 1 << r,
                    None => {
                        col_colors[n] = idx;
                        col_bits[n] = 1 << r;
                        n += 1;
                    }
                }
            }
            for slot in 0..n {
                let color = col_colors[slot];
                let ext = &mut extenders[color as usize];
                if ext.run_len == 0 && ext.covered == 0 && ext.bytes.is_empty() {
                    active.push(color);
                }
                ext.feed(x as u32, col_bits[slot]);
            }
        }

        for (i, &color) in active.iter().enumerate() {
            let ext = &mut extenders[color as usize];
            ext.flush_run();
            if i > 0 {
                out.push(b'$');
            }
            out.push(b'#');
            push_dec(out, color as u32);
            out.extend_from_slice(&ext.bytes);
            // Reset for the next band.
            ext.bytes.clear();
            ext.covered = 0;
            ext.run_bits = 0;
            ext.run_len = 0;
        }
        out.push(b'-');
    }

    out.extend_from_slice(&[ESC, b'\\']);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: usize, h: usize) -> Quantized {
        Quantized {
            palette: vec![[99, 0, 0]],
            indices: vec![0; w * h],
            w,
            h,
            has_transparent: false,
        }
    }

    fn stream(q: &Quantized) -> Vec<u8> {
        let mut out = Vec::new();
        encode(&mut out, q, (1, 1));
        out
    }

    #[test]
    fn framing_and_header() {
        let out = stream(&solid(4, 6));
        assert!(out.starts_with(b"\x1bP;0;q\"1;1;4;6"));
        assert!(out.ends_with(b"\x1b\\"));
        let body = String::from_utf8_lossy(&out);
        assert!(body.contains("#0;2;99;0;0"));
    }

    #[test]
    fn transparent_sets_p2() {
        let mut q = solid(2, 2);
        q.indices[3] = TRANSPARENT;
        q.has_transparent = true;
        let out = stream(&q);
        assert!(out.starts_with(b"\x1bP;1;q"));
    }

    #[test]
    fn run_length_at_three_and_above() {
        // Full 6-row column of one color is bitmask 63 -> '~'.
        let out = stream(&solid(5, 6));
        let body = String::from_utf8_lossy(&out);
        assert!(body.contains("!5~"), "missing RLE run: {body}");

        let out2 = stream(&solid(2, 6));
        let body2 = String::from_utf8_lossy(&out2);
        assert!(body2.contains("~~"), "short runs must stay raw: {body2}");
        assert!(!body2.contains('!'), "no RLE below 3: {body2}");
    }

    #[test]
    fn bands_end_with_dash_and_colors_join_with_dollar() {
        // Two colors split left/right, 12 rows -> 2 bands.
        let w = 4;
        let h = 12;
        let mut indices = Vec::with_capacity(w * h);
        for _y in 0..h {
            for x in 0..w {
                indices.push(if x < 2 { 0u16 } else { 1u16 });
            }
        }
        let q = Quantized {
            palette: vec![[99, 0, 0], [0, 0, 99]],
            indices,
            w,
            h,
            has_transparent: false,
        };
        let out = stream(&q);
        let body = String::from_utf8_lossy(&out);
        let dashes = body.matches('-').count();
        assert_eq!(dashes, 2, "one dash per band: {body}");
        // Each band has two colors -> one '$' separator per band.
        let dollars = body.matches('$').count();
        assert_eq!(dollars, 2, "colors - 1 separators per band: {body}");
    }

    #[test]
    fn partial_last_band_masks_missing_rows() {
        // Height 8: second band has only 2 live rows -> bitmask 0b11 = '?'+3.
        let out = stream(&solid(1, 8));
        let body = String::from_utf8_lossy(&out);
        // Band 1: full column '~'; band 2: bits 0b000011 -> 0x3f+3 = 'B'.
        assert!(body.contains('~'));
        assert!(body.contains('B'), "partial band bits wrong: {body}");
    }

    #[test]
    fn gap_columns_are_zero_filled() {
        // Color only in the last column of 4: three '?' gap columns first.
        let w = 4;
        let h = 6;
        let mut indices = vec![TRANSPARENT; w * h];
        for y in 0..h {
            indices[y * w + 3] = 0;
        }
        let q = Quantized {
            palette: vec![[50, 50, 50]],
            indices,
            w,
            h,
            has_transparent: true,
        };
        let out = stream(&q);
        let body = String::from_utf8_lossy(&out);
        assert!(
            body.contains("!3?~") || body.contains("???~"),
            "expected gap before run: {body}"
        );
    }
}
