//! Differential frame emitter.
//!
//! Owns the compositor, the quantizer state and the output buffer; one
//! `present` call per frame compares the current and previous cell, kind
//! and pixel generations, and emits the minimal escape stream: cursor
//! moves + SGR deltas + glyphs for changed text cells, and a single sixel
//! DCS block over the bounding rect of changed overlay cells.
//!
//! Invariants:
//! - A frame's bytes leave in one all-or-nothing flush; the DCS framing is
//!   always balanced on the wire.
//! - Cursor and SGR tracking live only within one frame: `ESC 7`/`ESC 8`
//!   restore the saved cursor state, so nothing carries over.
//! - The renderer is single-threaded and non-suspending; no re-entrancy.
//!
//! Error taxonomy (fatal to the render pass): allocation failure while a
//! buffer grows, a failed terminal write, or an element region escaping
//! the grid. Everything else the pipeline can hit is handled locally.

use std::collections::TryReserveError;
use std::io;

use core_cell::{Rgb, Rgba, Style};
use core_compose::{Compositor, ComposeError, Element};
use core_sixel::quant::WuQuantizer;
use thiserror::Error;

pub mod escape;
pub mod metrics;
pub mod outbuf;

mod diff;

pub use metrics::{FrameMetrics, FrameMetricsSnapshot};
pub use outbuf::OutBuf;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("allocation failed while growing a render buffer")]
    OutOfMemory(#[from] TryReserveError),
    #[error("terminal write failed")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Geometry(#[from] ComposeError),
}

/// Renderer facade: compose elements between `begin_frame` and `present`.
pub struct Renderer {
    pub compositor: Compositor,
    quant: WuQuantizer,
    scratch: Vec<Rgba>,
    out: OutBuf,
    aspect: (u16, u16),
    metrics: FrameMetrics,
    // Per-frame emission tracking.
    cursor: Option<(usize, usize)>,
    last_sgr: Option<(Style, Rgb, Rgb)>,
    opened: bool,
}

impl Renderer {
    pub fn new(rows: usize, cols: usize, cell_h: usize, cell_w: usize) -> Self {
        Self {
            compositor: Compositor::new(rows, cols, cell_h, cell_w),
            quant: WuQuantizer::new(),
            scratch: Vec::new(),
            out: OutBuf::with_capacity(4096),
            aspect: (1, 1),
            metrics: FrameMetrics::default(),
            cursor: None,
            last_sgr: None,
            opened: false,
        }
    }

    /// Pixel aspect ratio reported by the terminal, forwarded into the
    /// sixel DCS header.
    pub fn set_aspect(&mut self, aspect: (u16, u16)) {
        self.aspect = aspect;
    }

    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.compositor.resize(rows, cols);
    }

    /// Start a new frame: the previous one becomes the diff baseline.
    pub fn begin_frame(&mut self) {
        self.compositor.begin_frame();
    }

    /// Composite one element, in draw order.
    pub fn render(&mut self, element: &Element<'_>) -> Result<(), RenderError> {
        self.compositor.render(element)?;
        Ok(())
    }

    pub fn metrics(&self) -> FrameMetricsSnapshot {
        self.metrics.snapshot()
    }
}
