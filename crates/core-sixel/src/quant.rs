//! Wu's color quantizer.
//!
//! Greedy orthogonal bipartition over a 33³ histogram: build counts and
//! first/second moments with each channel bucketed as `(c >> 3) + 1`,
//! convert to cumulative moments so any axis-aligned box sum is an
//! 8-point inclusion-exclusion query, then repeatedly split the box of
//! greatest weighted variance along the axis and position maximizing the
//! children's weighted squared means. Stops at the palette ceiling or when
//! no split improves the objective.
//!
//! The state (moment tables, tag grid) is allocated once and reused across
//! frames; `quantize` clears only the arrays.

use core_cell::Rgba;

use crate::{to_sixel, Quantized, PALETTE_MAX, TRANSPARENT};

const SIDE: usize = 33;
const VOLUME: usize = SIDE * SIDE * SIDE;

#[inline]
fn at(r: usize, g: usize, b: usize) -> usize {
    (r * SIDE + g) * SIDE + b
}

#[derive(Debug, Clone, Copy, Default)]
struct Cube {
    r0: usize,
    r1: usize,
    g0: usize,
    g1: usize,
    b0: usize,
    b1: usize,
    vol: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Red,
    Green,
    Blue,
}

/// Box sum of a cumulative moment table. Lower bounds are exclusive,
/// upper bounds inclusive, which is why bucket 0 stays empty.
fn vol(c: &Cube, m: &[i64]) -> i64 {
    m[at(c.r1, c.g1, c.b1)] - m[at(c.r1, c.g1, c.b0)] - m[at(c.r1, c.g0, c.b1)]
        + m[at(c.r1, c.g0, c.b0)]
        - m[at(c.r0, c.g1, c.b1)]
        + m[at(c.r0, c.g1, c.b0)]
        + m[at(c.r0, c.g0, c.b1)]
        - m[at(c.r0, c.g0, c.b0)]
}

fn vol_f(c: &Cube, m: &[f64]) -> f64 {
    m[at(c.r1, c.g1, c.b1)] - m[at(c.r1, c.g1, c.b0)] - m[at(c.r1, c.g0, c.b1)]
        + m[at(c.r1, c.g0, c.b0)]
        - m[at(c.r0, c.g1, c.b1)]
        + m[at(c.r0, c.g1, c.b0)]
        + m[at(c.r0, c.g0, c.b1)]
        - m[at(c.r0, c.g0, c.b0)]
}

/// Contribution of the lower face along `axis` (the part of the box sum
/// that does not depend on the cut position).
fn bottom(c: &Cube, axis: Axis, m: &[i64]) -> i64 {
    match axis {
        Axis::Red => {
            -m[at(c.r0, c.g1, c.b1)] + m[at(c.r0, c.g1, c.b0)] + m[at(c.r0, c.g0, c.b1)]
                - m[at(c.r0, c.g0, c.b0)]
        }
        Axis::Green => {
            -m[at(c.r1, c.g0, c.b1)] + m[at(c.r1, c.g0, c.b0)] + m[at(c.r0, c.g0, c.b1)]
                - m[at(c.r0, c.g0, c.b0)]
        }
        Axis::Blue => {
            -m[at(c.r1, c.g1, c.b0)] + m[at(c.r1, c.g0, c.b0)] + m[at(c.r0, c.g1, c.b0)]
                - m[at(c.r0, c.g0, c.b0)]
        }
    }
}

/// Upper-face contribution at candidate cut `pos`.
fn top(c: &Cube, axis: Axis, pos: usize, m: &[i64]) -> i64 {
    match axis {
        Axis::Red => {
            m[at(pos, c.g1, c.b1)] - m[at(pos, c.g1, c.b0)] - m[at(pos, c.g0, c.b1)]
                + m[at(pos, c.g0, c.b0)]
        }
        Axis::Green => {
            m[at(c.r1, pos, c.b1)] - m[at(c.r1, pos, c.b0)] - m[at(c.r0, pos, c.b1)]
                + m[at(c.r0, pos, c.b0)]
        }
        Axis::Blue => {
            m[at(c.r1, c.g1, pos)] - m[at(c.r1, c.g0, pos)] - m[at(c.r0, c.g1, pos)]
                + m[at(c.r0, c.g0, pos)]
        }
    }
}

pub struct WuQuantizer {
    wt: Vec<i64>,
    mr: Vec<i64>,
    mg: Vec<i64>,
    mb: Vec<i64>,
    m2: Vec<f64>,
    tag: Vec<u8>,
}

impl Default for WuQuantizer {
    fn default() -> Self {
        Self::new()
    }
}

impl WuQuantizer {
    pub fn new() -> Self {
        Self {
            wt: vec![0; VOLUME],
            mr: vec![0; VOLUME],
            mg: vec![0; VOLUME],
            mb: vec![0; VOLUME],
            m2: vec![0.0; VOLUME],
            tag: vec![0; VOLUME],
        }
    }

    fn clear(&mut self) {
        self.wt.fill(0);
        self.mr.fill(0);
        self.mg.fill(0);
        self.mb.fill(0);
        self.m2.fill(0.0);
        self.tag.fill(0);
    }

    /// Quantize a row-major RGBA buffer into a ≤256-entry palette (channels
    /// scaled to 0–99) and per-pixel indices. Alpha-0 pixels are excluded
    /// and marked [`TRANSPARENT`].
    pub fn quantize(&mut self, pixels: &[Rgba], w: usize, h: usize) -> Quantized {
        debug_assert_eq!(pixels.len(), w * h);
        self.clear();

        let mut has_transparent = false;
        let mut opaque = 0usize;
        for px in pixels {
            if px[3] == 0 {
                has_transparent = true;
                continue;
            }
            opaque += 1;
            let (r, g, b) = (px[0] as usize, px[1] as usize, px[2] as usize);
            let i = at((r >> 3) + 1, (g >> 3) + 1, (b >> 3) + 1);
            self.wt[i] += 1;
            self.mr[i] += r as i64;
            self.mg[i] += g as i64;
            self.mb[i] += b as i64;
            self.m2[i] += (r * r + g * g + b * b) as f64;
        }

        if opaque == 0 {
            return Quantized {
                palette: Vec::new(),
                indices: vec![TRANSPARENT; pixels.len()],
                w,
                h,
                has_transparent,
            };
        }

        self.cumulate();
        let boxes = self.partition(PALETTE_MAX);
        tracing::trace!(cubes = boxes.len(), opaque, "wu partition complete");

        let mut palette = Vec::with_capacity(boxes.len());
        for (k, cube) in boxes.iter().enumerate() {
            let weight = vol(cube, &self.wt);
            if weight > 0 {
                palette.push([
                    to_sixel((vol(cube, &self.mr) / weight) as u8),
                    to_sixel((vol(cube, &self.mg) / weight) as u8),
                    to_sixel((vol(cube, &self.mb) / weight) as u8),
                ]);
            } else {
                palette.push([0, 0, 0]);
            }
            for r in cube.r0 + 1..=cube.r1 {
                for g in cube.g0 + 1..=cube.g1 {
                    for b in cube.b0 + 1..=cube.b1 {
                        self.tag[at(r, g, b)] = k as u8;
                    }
                }
            }
        }

        let indices = pixels
            .iter()
            .map(|px| {
                if px[3] == 0 {
                    TRANSPARENT
                } else {
                    let i = at(
                        (px[0] as usize >> 3) + 1,
                        (px[1] as usize >> 3) + 1,
                        (px[2] as usize >> 3) + 1,
                    );
                    self.tag[i] as u16
                }
            })
            .collect();

        Quantized {
            palette,
            indices,
            w,
            h,
            has_transparent,
        }
    }

    /// Convert the raw histogram into cumulative moments.
    fn cumulate(&mut self) {
        let mut area = vec![0i64; SIDE];
        let mut area_r = vec![0i64; SIDE];
        let mut area_g = vec![0i64; SIDE];
        let mut area_b = vec![0i64; SIDE];
        let mut area2 = vec![0f64; SIDE];
        for r in 1..SIDE {
            area.fill(0);
            area_r.fill(0);
            area_g.fill(0);
            area_b.fill(0);
            area2.fill(0.0);
            for g in 1..SIDE {
                let mut line = 0i64;
                let mut line_r = 0i64;
                let mut line_g = 0i64;
                let mut line_b = 0i64;
                let mut line2 = 0f64;
                for b in 1..SIDE {
                    let i = at(r, g, b);
                    line += self.wt[i];
                    line_r += self.mr[i];
                    line_g += self.mg[i];
                    line_b += self.mb[i];
                    line2 += self.m2[i];
                    area[b] += line;
                    area_r[b] += line_r;
                    area_g[b] += line_g;
                    area_b[b] += line_b;
                    area2[b] += line2;
                    let j = at(r - 1, g, b);
                    self.wt[i] = self.wt[j] + area[b];
                    self.mr[i] = self.mr[j] + area_r[b];
                    self.mg[i] = self.mg[j] + area_g[b];
                    self.mb[i] = self.mb[j] + area_b[b];
                    self.m2[i] = self.m2[j] + area2[b];
                }
            }
        }
    }

    /// Weighted variance of a box; the split priority.
    fn variance(&self, c: &Cube) -> f64 {
        let dr = vol(c, &self.mr) as f64;
        let dg = vol(c, &self.mg) as f64;
        let db = vol(c, &self.mb) as f64;
        let dw = vol(c, &self.wt) as f64;
        if dw == 0.0 {
            return 0.0;
        }
        vol_f(c, &self.m2) - (dr * dr + dg * dg + db * db) / dw
    }

    /// Best cut of `cube` along `axis`: maximizes the sum of the children's
    /// squared mean magnitudes weighted by count. Returns (objective, pos).
    fn maximize(
        &self,
        cube: &Cube,
        axis: Axis,
        first: usize,
        last: usize,
        whole: (i64, i64, i64, i64),
    ) -> (f64, Option<usize>) {
        let base_r = bottom(cube, axis, &self.mr);
        let base_g = bottom(cube, axis, &self.mg);
        let base_b = bottom(cube, axis, &self.mb);
        let base_w = bottom(cube, axis, &self.wt);
        let (whole_r, whole_g, whole_b, whole_w) = whole;
        let mut max = 0.0f64;
        let mut cut = None;
        for pos in first..last {
            let mut half_r = base_r + top(cube, axis, pos, &self.mr);
            let mut half_g = base_g + top(cube, axis, pos, &self.mg);
            let mut half_b = base_b + top(cube, axis, pos, &self.mb);
            let mut half_w = base_w + top(cube, axis, pos, &self.wt);
            if half_w == 0 {
                continue;
            }
            let mut temp = ((half_r * half_r + half_g * half_g + half_b * half_b) as f64)
                / half_w as f64;
            half_r = whole_r - half_r;
            half_g = whole_g - half_g;
            half_b = whole_b - half_b;
            half_w = whole_w - half_w;
            if half_w == 0 {
                continue;
            }
            temp += ((half_r * half_r + half_g * half_g + half_b * half_b) as f64)
                / half_w as f64;
            if temp > max {
                max = temp;
                cut = Some(pos);
            }
        }
        (max, cut)
    }

    /// Split `set1`, writing the upper half into `set2`. False when no cut
    /// position separates any weight.
    fn cut(&self, set1: &mut Cube, set2: &mut Cube) -> bool {
        let whole = (
            vol(set1, &self.mr),
            vol(set1, &self.mg),
            vol(set1, &self.mb),
            vol(set1, &self.wt),
        );
        let (max_r, cut_r) = self.maximize(set1, Axis::Red, set1.r0 + 1, set1.r1, whole);
        let (max_g, cut_g) = self.maximize(set1, Axis::Green, set1.g0 + 1, set1.g1, whole);
        let (max_b, cut_b) = self.maximize(set1, Axis::Blue, set1.b0 + 1, set1.b1, whole);

        let axis = if max_r >= max_g && max_r >= max_b {
            if cut_r.is_none() {
                return false;
            }
            Axis::Red
        } else if max_g >= max_r && max_g >= max_b {
            Axis::Green
        } else {
            Axis::Blue
        };

        set2.r1 = set1.r1;
        set2.g1 = set1.g1;
        set2.b1 = set1.b1;
        match axis {
            Axis::Red => {
                let pos = match cut_r {
                    Some(p) => p,
                    None => return false,
                };
                set1.r1 = pos;
                set2.r0 = pos;
                set2.g0 = set1.g0;
                set2.b0 = set1.b0;
            }
            Axis::Green => {
                let pos = match cut_g {
                    Some(p) => p,
                    None => return false,
                };
                set1.g1 = pos;
                set2.g0 = pos;
                set2.r0 = set1.r0;
                set2.b0 = set1.b0;
            }
            Axis::Blue => {
                let pos = match cut_b {
                    Some(p) => p,
                    None => return false,
                };
                set1.b1 = pos;
                set2.b0 = pos;
                set2.r0 = set1.r0;
                set2.g0 = set1.g0;
            }
        }
        set1.vol =
            ((set1.r1 - set1.r0) * (set1.g1 - set1.g0) * (set1.b1 - set1.b0)) as i64;
        set2.vol =
            ((set2.r1 - set2.r0) * (set2.g1 - set2.g0) * (set2.b1 - set2.b0)) as i64;
        true
    }

    fn partition(&self, max_colors: usize) -> Vec<Cube> {
        let mut boxes = vec![Cube::default(); max_colors];
        boxes[0] = Cube {
            r0: 0,
            r1: SIDE - 1,
            g0: 0,
            g1: SIDE - 1,
            b0: 0,
            b1: SIDE - 1,
            vol: ((SIDE - 1) * (SIDE - 1) * (SIDE - 1)) as i64,
        };
        let mut vv = vec![0.0f64; max_colors];
        let mut next = 0usize;
        let mut n = 1usize;
        while n < max_colors {
            let (head, tail) = boxes.split_at_mut(n);
            if self.cut(&mut head[next], &mut tail[0]) {
                vv[next] = if head[next].vol > 1 {
                    self.variance(&head[next])
                } else {
                    0.0
                };
                vv[n] = if tail[0].vol > 1 {
                    self.variance(&tail[0])
                } else {
                    0.0
                };
                n += 1;
            } else {
                // This box can no longer be split; never pick it again.
                vv[next] = 0.0;
            }
            let mut best = 0usize;
            let mut best_v = vv[0];
            for (j, &v) in vv.iter().enumerate().take(n).skip(1) {
                if v > best_v {
                    best_v = v;
                    best = j;
                }
            }
            if best_v <= 0.0 {
                break;
            }
            next = best;
        }
        boxes.truncate(n);
        boxes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_sixel;

    #[test]
    fn palette_bounded_and_indices_valid() {
        // A gradient with many distinct colors.
        let mut pixels = Vec::new();
        for y in 0..64u16 {
            for x in 0..64u16 {
                pixels.push([(y * 4) as u8, (x * 4) as u8, ((y + x) * 2) as u8, 255]);
            }
        }
        let mut q = WuQuantizer::new();
        let out = q.quantize(&pixels, 64, 64);
        assert!(out.palette.len() <= PALETTE_MAX);
        assert!(!out.palette.is_empty());
        for &i in &out.indices {
            assert!((i as usize) < out.palette.len());
        }
        assert!(!out.has_transparent);
    }

    #[test]
    fn few_distinct_colors_preserved() {
        let colors: [[u8; 4]; 3] = [
            [200, 16, 16, 255],
            [16, 200, 16, 255],
            [16, 16, 200, 255],
        ];
        let mut pixels = Vec::with_capacity(100 * 100);
        for i in 0..100 * 100 {
            pixels.push(colors[i % 3]);
        }
        let mut q = WuQuantizer::new();
        let out = q.quantize(&pixels, 100, 100);
        assert_eq!(out.palette.len(), 3);
        for c in colors {
            let found = out.palette.iter().any(|p| {
                (from_sixel(p[0]) as i32 - c[0] as i32).abs() <= 2
                    && (from_sixel(p[1]) as i32 - c[1] as i32).abs() <= 2
                    && (from_sixel(p[2]) as i32 - c[2] as i32).abs() <= 2
            });
            assert!(found, "palette missing {c:?}: {:?}", out.palette);
        }
    }

    #[test]
    fn transparent_pixels_flagged_and_excluded() {
        let pixels = vec![
            [255, 0, 0, 255],
            [0, 0, 0, 0],
            [255, 0, 0, 255],
            [0, 0, 0, 0],
        ];
        let mut q = WuQuantizer::new();
        let out = q.quantize(&pixels, 2, 2);
        assert!(out.has_transparent);
        assert_eq!(out.indices[1], TRANSPARENT);
        assert_eq!(out.indices[3], TRANSPARENT);
        assert!(out.indices[0] != TRANSPARENT);
    }

    #[test]
    fn fully_transparent_rect_yields_empty_palette() {
        let pixels = vec![[0u8, 0, 0, 0]; 6];
        let mut q = WuQuantizer::new();
        let out = q.quantize(&pixels, 3, 2);
        assert!(out.palette.is_empty());
        assert!(out.indices.iter().all(|&i| i == TRANSPARENT));
    }

    #[test]
    fn state_reuse_is_clean() {
        let mut q = WuQuantizer::new();
        let red = vec![[250u8, 10, 10, 255]; 16];
        let blue = vec![[10u8, 10, 250, 255]; 16];
        let _ = q.quantize(&red, 4, 4);
        let out = q.quantize(&blue, 4, 4);
        assert_eq!(out.palette.len(), 1);
        let p = out.palette[0];
        assert!(from_sixel(p[2]) > 200, "blue channel lost: {p:?}");
        assert!(from_sixel(p[0]) < 40, "red residue from prior frame: {p:?}");
    }
}
