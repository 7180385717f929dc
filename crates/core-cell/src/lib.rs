//! Cell model shared by the compositor, quantizer and emitter.
//!
//! A `Cell` is one terminal character position: a codepoint (or an index
//! into the owned grapheme-cluster pool), six style flags and truecolor
//! foreground/background. The per-cell `CellKind` tag tells the emitter
//! whether a cell is rendered from its glyph fields, from the pixel
//! overlay, or from a mixture of both.
//!
//! Invariants:
//! - `ord` values at or above `EGC_BASE` are pool indices; everything below
//!   is a plain codepoint. The pool is owned explicitly (one per
//!   compositor), never process-global.
//! - A continuation cell of a wide glyph has `ord == 0` and display width 0;
//!   width normalization heals orphaned continuations before emission.
//! - Default cells are fully zeroed so a freshly resized grid compares
//!   equal to "nothing drawn yet".

use ahash::AHashMap;
use bitflags::bitflags;

pub mod grid;
pub mod width;

pub use grid::Grid;

/// sRGB triple.
pub type Rgb = [u8; 3];
/// sRGB plus alpha, as stored in the pixel overlay.
pub type Rgba = [u8; 4];

bitflags! {
    /// Text attributes carried per cell, emitted as SGR toggles.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Style: u8 {
        const BOLD          = 0b0000_0001;
        const ITALIC        = 0b0000_0010;
        const UNDERLINE     = 0b0000_0100;
        const STRIKETHROUGH = 0b0000_1000;
        const OVERLINE      = 0b0001_0000;
        const REVERSE       = 0b0010_0000;
    }
}

/// One terminal character position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    /// Codepoint, or `EGC_BASE + index` into the cluster pool.
    pub ord: u32,
    pub style: Style,
    pub fg: Rgb,
    pub bg: Rgb,
}

impl Cell {
    pub const SPACE: u32 = 0x20;
    pub const BLANK_BRAILLE: u32 = 0x2800;

    /// A space glyph painted over a solid background. Foreground matches the
    /// background so the (invisible) glyph never introduces a color delta.
    pub fn space_on(bg: Rgb) -> Self {
        Self {
            ord: Self::SPACE,
            style: Style::empty(),
            fg: bg,
            bg,
        }
    }

    /// Whitespace for compositing purposes: untouched, space, or blank
    /// braille.
    pub fn is_whitespace(&self) -> bool {
        matches!(self.ord, 0 | Self::SPACE | Self::BLANK_BRAILLE)
    }
}

/// Per-cell emitter tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CellKind {
    /// Rendered solely from the `Cell` fields; overlay irrelevant.
    #[default]
    Glyph = 0,
    /// Rendered entirely from the pixel overlay; `bg` is advisory.
    Sixel,
    /// Overlay partially covers the cell; the glyph shows where overlay
    /// alpha is zero.
    Mixed,
    /// Background was composited through a low-variance sixel layer; the
    /// glyph is re-emitted with the quantized background after encoding.
    SeeThrough,
}

impl CellKind {
    /// Cells whose pixels participate in sixel emission.
    pub fn uses_overlay(self) -> bool {
        !matches!(self, CellKind::Glyph)
    }
}

/// `ord` values at or above this are indices into an [`EgcPool`].
pub const EGC_BASE: u32 = 0x18_0000;

/// Owned interner for multi-codepoint grapheme clusters.
///
/// Single codepoints never enter the pool; they are stored directly in
/// `Cell::ord`.
#[derive(Debug, Default)]
pub struct EgcPool {
    strings: Vec<String>,
    index: AHashMap<String, u32>,
}

impl EgcPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a cluster, returning the `ord` to store in a cell. A cluster
    /// that is a single codepoint is returned as that codepoint without
    /// touching the pool.
    pub fn intern(&mut self, egc: &str) -> u32 {
        let mut chars = egc.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return c as u32;
        }
        if let Some(&ord) = self.index.get(egc) {
            return ord;
        }
        let ord = EGC_BASE + self.strings.len() as u32;
        self.strings.push(egc.to_string());
        self.index.insert(egc.to_string(), ord);
        ord
    }

    /// Resolve a pooled `ord` back to its cluster.
    pub fn lookup(&self, ord: u32) -> Option<&str> {
        if ord < EGC_BASE {
            return None;
        }
        self.strings.get((ord - EGC_BASE) as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cell_is_zeroed() {
        let c = Cell::default();
        assert_eq!(c.ord, 0);
        assert_eq!(c.style, Style::empty());
        assert_eq!(c.fg, [0, 0, 0]);
        assert_eq!(c.bg, [0, 0, 0]);
    }

    #[test]
    fn pool_roundtrip() {
        let mut pool = EgcPool::new();
        let ord = pool.intern("e\u{0301}");
        assert!(ord >= EGC_BASE);
        assert_eq!(pool.lookup(ord), Some("e\u{0301}"));
        // Same cluster interns to the same ord.
        assert_eq!(pool.intern("e\u{0301}"), ord);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn single_codepoint_bypasses_pool() {
        let mut pool = EgcPool::new();
        assert_eq!(pool.intern("A"), 'A' as u32);
        assert_eq!(pool.intern("界"), '界' as u32);
        assert!(pool.is_empty());
    }

    #[test]
    fn whitespace_covers_blank_braille() {
        let mut c = Cell::default();
        assert!(c.is_whitespace());
        c.ord = Cell::BLANK_BRAILLE;
        assert!(c.is_whitespace());
        c.ord = 'x' as u32;
        assert!(!c.is_whitespace());
    }
}
