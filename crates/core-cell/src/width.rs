//! Display width of grapheme clusters.
//!
//! One authoritative function, `cluster_width`, decides how many terminal
//! columns a cluster occupies; no caller measures width any other way.
//! The baseline comes from `unicode-width`, with a conservative widening
//! pass: any cluster carrying a pictographic or regional-indicator signal
//! that still measures 1 is widened to 2. Over-estimation costs a blank
//! column; under-estimation drifts the whole row.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::{Cell, EgcPool};

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

// Primary emoji blocks plus the misc-symbols/dingbats range where legacy
// emoji live.
fn is_extended_pictographic(c: char) -> bool {
    ('\u{1F300}'..='\u{1FAFF}').contains(&c) || ('\u{2600}'..='\u{27BF}').contains(&c)
}

/// Split a string into extended grapheme clusters.
pub fn clusters(s: &str) -> impl Iterator<Item = &str> {
    s.graphemes(true)
}

/// Terminal column width of a single grapheme cluster.
pub fn cluster_width(egc: &str) -> i32 {
    if egc.is_empty() {
        return 0;
    }
    let base = egc.width() as i32;
    if base <= 1
        && egc
            .chars()
            .any(|c| is_extended_pictographic(c) || is_regional_indicator(c))
    {
        return 2;
    }
    base.max(1)
}

/// Width of a cell's glyph: pool lookup for cluster ords, codepoint width
/// otherwise. `ord == 0` is a continuation slot and has width 0.
pub fn cell_width(cell: &Cell, pool: &EgcPool) -> i32 {
    if cell.ord == 0 {
        return 0;
    }
    if let Some(egc) = pool.lookup(cell.ord) {
        return cluster_width(egc);
    }
    match char::from_u32(cell.ord) {
        Some(c) => c.width().unwrap_or(0).max(1) as i32,
        None => 1,
    }
}
