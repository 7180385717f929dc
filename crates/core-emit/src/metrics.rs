//! Frame emission metrics.
//!
//! Execution counters for the differential emitter: how many frames
//! actually produced bytes, how many were skipped as unchanged, how much
//! sixel traffic went out. Counters are atomic so probes can snapshot
//! them without borrowing the renderer.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct FrameMetrics {
    /// Frames presented (including skipped ones).
    pub frames: AtomicU64,
    /// Frames that flushed no bytes because nothing changed.
    pub skipped_frames: AtomicU64,
    /// Frames that included a sixel DCS block.
    pub sixel_frames: AtomicU64,
    /// Glyph cells written across all frames.
    pub cells_emitted: AtomicU64,
    /// Total bytes handed to the terminal.
    pub bytes_flushed: AtomicU64,
    /// Duration (ns) of the most recent present call.
    pub last_present_ns: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMetricsSnapshot {
    pub frames: u64,
    pub skipped_frames: u64,
    pub sixel_frames: u64,
    pub cells_emitted: u64,
    pub bytes_flushed: u64,
    pub last_present_ns: u64,
}

impl FrameMetrics {
    pub fn snapshot(&self) -> FrameMetricsSnapshot {
        FrameMetricsSnapshot {
            frames: self.frames.load(Ordering::Relaxed),
            skipped_frames: self.skipped_frames.load(Ordering::Relaxed),
            sixel_frames: self.sixel_frames.load(Ordering::Relaxed),
            cells_emitted: self.cells_emitted.load(Ordering::Relaxed),
            bytes_flushed: self.bytes_flushed.load(Ordering::Relaxed),
            last_present_ns: self.last_present_ns.load(Ordering::Relaxed),
        }
    }
}
