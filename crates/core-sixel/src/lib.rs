//! Color quantization and sixel bitstream encoding.
//!
//! Two quantizers share the 0–99 palette space the sixel protocol uses:
//!
//! * [`quant::WuQuantizer`] — Wu's greedy orthogonal bipartition over a 33³
//!   RGB histogram. The per-frame path: the emitter hands it the pixel
//!   overlay subrect and gets a palette plus per-pixel indices back. State
//!   is reused across frames; only counts and tags are cleared.
//! * [`qstate::StreamQuantizer`] — a two-level index (base-10 decade table
//!   over an octree of sub-decade nodes) for incremental insertion, backing
//!   the one-shot [`encode_rgba`] helper.
//!
//! [`encoder::encode`] turns palette + indices into the DCS-wrapped sixel
//! byte stream with run-length encoding.

use core_cell::Rgba;
use thiserror::Error;

pub mod encoder;
pub mod qstate;
pub mod quant;

/// Palette ceiling fixed by the protocol's color registers.
pub const PALETTE_MAX: usize = 256;

/// Index marking a pixel excluded from every palette entry (alpha 0).
pub const TRANSPARENT: u16 = u16::MAX;

#[derive(Debug, Error)]
pub enum SixelError {
    #[error("pixel buffer length {got} does not match {w}x{h}")]
    BadGeometry { got: usize, w: usize, h: usize },
}

/// Scale an sRGB channel to the protocol's 0–99 register range.
///
/// Capped at 99 so every register fits in two digits; the pairing with
/// [`from_sixel`] is round-to-nearest both ways and exact at the endpoints,
/// which the see-through background reconciliation depends on.
#[inline]
pub fn to_sixel(v: u8) -> u8 {
    ((v as u16 * 99 + 127) / 255) as u8
}

/// Inverse of [`to_sixel`].
#[inline]
pub fn from_sixel(q: u8) -> u8 {
    ((q.min(99) as u16 * 255 + 49) / 99) as u8
}

/// Quantization output consumed by the encoder.
#[derive(Debug, Clone, Default)]
pub struct Quantized {
    /// Up to [`PALETTE_MAX`] entries, channels already in 0–99.
    pub palette: Vec<[u8; 3]>,
    /// One entry per pixel, row-major; [`TRANSPARENT`] for alpha-0 pixels.
    pub indices: Vec<u16>,
    pub w: usize,
    pub h: usize,
    pub has_transparent: bool,
}

/// One-shot convenience: quantize an RGBA image through the streaming
/// index and encode the full sixel stream.
pub fn encode_rgba(
    pixels: &[Rgba],
    w: usize,
    h: usize,
    aspect: (u16, u16),
) -> Result<Vec<u8>, SixelError> {
    if pixels.len() != w * h {
        return Err(SixelError::BadGeometry {
            got: pixels.len(),
            w,
            h,
        });
    }
    let mut qs = qstate::StreamQuantizer::new();
    for px in pixels {
        if px[3] != 0 {
            qs.add([px[0], px[1], px[2]]);
        }
    }
    let quantized = qs.finish(pixels, w, h);
    let mut out = Vec::new();
    encoder::encode(&mut out, &quantized, aspect);
    Ok(out)
}
