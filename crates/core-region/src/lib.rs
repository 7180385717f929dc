//! Region algebra: visible areas as y-sorted bands of non-overlapping
//! horizontal strips.
//!
//! A `Region` is an ordered list of `Band`s. Each band spans rows
//! `[y1, y2)` and carries a strictly increasing, even-length list of x
//! "walls"; consecutive wall pairs `(walls[2k], walls[2k+1])` delimit the
//! half-open column ranges inside the band. Set operations merge two
//! regions with a scanline sweep over the distinct y boundaries, zipping
//! the wall lists of the overlapping bands with a two-boolean state
//! machine, so no quadratic rectangle intersection is ever performed.
//!
//! Invariants (canonical form):
//! - Bands are sorted by `y1` and never overlap in y.
//! - `y1 < y2` for every band; no band has an empty wall list.
//! - Walls are strictly increasing and of even length.
//! - No two adjacent bands share identical walls and touch in y; the
//!   coalesce step after every merge re-establishes this.
//!
//! Canonical form makes structural equality coincide with set equality,
//! which the property tests rely on.

use std::ops::{BitAnd, BitOr, BitXor, Sub};

/// Grid position, row-major ordering: `y` first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub y: i32,
    pub x: i32,
}

impl Point {
    pub const fn new(y: i32, x: i32) -> Self {
        Self { y, x }
    }
}

/// Extent in rows and columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub h: i32,
    pub w: i32,
}

impl Size {
    pub const fn new(h: i32, w: i32) -> Self {
        Self { h, w }
    }

    pub fn is_empty(&self) -> bool {
        self.h <= 0 || self.w <= 0
    }
}

/// Half-open rectangle `[pos.y, pos.y + size.h) x [pos.x, pos.x + size.w)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub pos: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(pos: Point, size: Size) -> Self {
        Self { pos, size }
    }

    pub fn contains(&self, y: i32, x: i32) -> bool {
        y >= self.pos.y
            && y < self.pos.y + self.size.h
            && x >= self.pos.x
            && x < self.pos.x + self.size.w
    }
}

/// One horizontal strip of a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Band {
    pub y1: i32,
    pub y2: i32,
    /// Even-length, strictly increasing x coordinates. Pairs delimit the
    /// covered column ranges.
    pub walls: Vec<i32>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Op {
    Union,
    Intersect,
    Subtract,
    Xor,
}

impl Op {
    #[inline]
    fn eval(self, a: bool, b: bool) -> bool {
        match self {
            Op::Union => a | b,
            Op::Intersect => a & b,
            Op::Subtract => a & !b,
            Op::Xor => a ^ b,
        }
    }
}

/// A set of grid positions stored as canonical bands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Region {
    bands: Vec<Band>,
}

impl Region {
    /// The empty region.
    pub const fn new() -> Self {
        Self { bands: Vec::new() }
    }

    /// Region covering a single rectangle. Empty sizes produce the empty
    /// region.
    pub fn from_rect(pos: Point, size: Size) -> Self {
        if size.is_empty() {
            return Self::new();
        }
        Self {
            bands: vec![Band {
                y1: pos.y,
                y2: pos.y + size.h,
                walls: vec![pos.x, pos.x + size.w],
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Membership test for a single position.
    pub fn contains(&self, y: i32, x: i32) -> bool {
        let idx = self.bands.partition_point(|b| b.y2 <= y);
        let Some(band) = self.bands.get(idx) else {
            return false;
        };
        if y < band.y1 {
            return false;
        }
        // Position is inside iff an odd number of walls lie at or left of x.
        band.walls.partition_point(|&w| w <= x) % 2 == 1
    }

    /// Iterate the constituent rectangles in band order, left to right.
    pub fn rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.bands.iter().flat_map(|band| {
            band.walls.chunks_exact(2).map(move |pair| {
                Rect::new(
                    Point::new(band.y1, pair[0]),
                    Size::new(band.y2 - band.y1, pair[1] - pair[0]),
                )
            })
        })
    }

    /// Tight bounding rectangle, or `None` for the empty region.
    pub fn bbox(&self) -> Option<Rect> {
        let first = self.bands.first()?;
        let last = self.bands.last()?;
        let mut left = i32::MAX;
        let mut right = i32::MIN;
        for band in &self.bands {
            left = left.min(band.walls[0]);
            right = right.max(*band.walls.last().expect("non-empty walls"));
        }
        Some(Rect::new(
            Point::new(first.y1, left),
            Size::new(last.y2 - first.y1, right - left),
        ))
    }

    /// Append a band, coalescing with the previous one when walls match and
    /// the y-ranges touch.
    fn push_band(&mut self, y1: i32, y2: i32, walls: &[i32]) {
        debug_assert!(y1 < y2);
        debug_assert!(walls.len() % 2 == 0 && !walls.is_empty());
        if let Some(last) = self.bands.last_mut()
            && last.y2 == y1
            && last.walls == walls
        {
            last.y2 = y2;
            return;
        }
        self.bands.push(Band {
            y1,
            y2,
            walls: walls.to_vec(),
        });
    }

    fn merge(a: &Region, b: &Region, op: Op) -> Region {
        // Distinct y boundaries of both inputs define the elementary
        // scanline intervals; band edges never cross an interval interior.
        let mut ys: Vec<i32> = Vec::with_capacity(2 * (a.bands.len() + b.bands.len()));
        ys.extend(a.bands.iter().flat_map(|band| [band.y1, band.y2]));
        ys.extend(b.bands.iter().flat_map(|band| [band.y1, band.y2]));
        ys.sort_unstable();
        ys.dedup();

        let mut out = Region::new();
        let mut ai = 0;
        let mut bi = 0;
        let mut walls = Vec::new();
        for pair in ys.windows(2) {
            let (top, bottom) = (pair[0], pair[1]);
            while ai < a.bands.len() && a.bands[ai].y2 <= top {
                ai += 1;
            }
            while bi < b.bands.len() && b.bands[bi].y2 <= top {
                bi += 1;
            }
            let aw = a
                .bands
                .get(ai)
                .filter(|band| band.y1 <= top)
                .map(|band| band.walls.as_slice())
                .unwrap_or(&[]);
            let bw = b
                .bands
                .get(bi)
                .filter(|band| band.y1 <= top)
                .map(|band| band.walls.as_slice())
                .unwrap_or(&[]);
            walls.clear();
            merge_walls(aw, bw, op, &mut walls);
            if !walls.is_empty() {
                out.push_band(top, bottom, &walls);
            }
        }
        out
    }
}

/// Zipper walk over two wall lists. `inside_a`/`inside_b` toggle at each
/// wall; a wall is emitted whenever `op(inside_a, inside_b)` changes.
fn merge_walls(a: &[i32], b: &[i32], op: Op, out: &mut Vec<i32>) {
    let mut i = 0;
    let mut j = 0;
    let mut inside_a = false;
    let mut inside_b = false;
    let mut inside = false;
    while i < a.len() || j < b.len() {
        let x = match (a.get(i), b.get(j)) {
            (Some(&ax), Some(&bx)) => ax.min(bx),
            (Some(&ax), None) => ax,
            (None, Some(&bx)) => bx,
            (None, None) => unreachable!(),
        };
        if i < a.len() && a[i] == x {
            inside_a = !inside_a;
            i += 1;
        }
        if j < b.len() && b[j] == x {
            inside_b = !inside_b;
            j += 1;
        }
        let now = op.eval(inside_a, inside_b);
        if now != inside {
            out.push(x);
            inside = now;
        }
    }
    debug_assert!(out.len() % 2 == 0, "walls must close");
}

impl BitOr for &Region {
    type Output = Region;
    fn bitor(self, rhs: &Region) -> Region {
        Region::merge(self, rhs, Op::Union)
    }
}

impl BitAnd for &Region {
    type Output = Region;
    fn bitand(self, rhs: &Region) -> Region {
        Region::merge(self, rhs, Op::Intersect)
    }
}

impl Sub for &Region {
    type Output = Region;
    fn sub(self, rhs: &Region) -> Region {
        Region::merge(self, rhs, Op::Subtract)
    }
}

impl BitXor for &Region {
    type Output = Region;
    fn bitxor(self, rhs: &Region) -> Region {
        Region::merge(self, rhs, Op::Xor)
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Region::from_rect(rect.pos, rect.size)
    }
}
