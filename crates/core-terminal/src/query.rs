//! Device status report probes.
//!
//! The renderer only writes these request sequences; parsing the replies
//! happens in whatever input layer the application runs. Reply grammar,
//! for reference:
//!
//! - cursor position: `ESC [ row ; col R`
//! - device attributes: `ESC [ ? p1 ; p2 ; ... c` (sixel is parameter 4)
//! - window / cell pixel size: `ESC [ 4 ; h ; w t` / `ESC [ 6 ; h ; w t`
//! - DECRPM: `ESC [ ? mode ; value $ y`
//! - OSC color: `ESC ] 1 0 ; rgb:rrrr/gggg/bbbb ESC \` (11 for background)
//!
//! Each probe gets [`DSR_TIMEOUT`] to answer before the asker defaults to
//! "not supported"; a bare ESC on the wire is disambiguated from a
//! sequence start after [`ESC_TIMEOUT`].

use std::time::Duration;

/// Per-request reply deadline.
pub const DSR_TIMEOUT: Duration = Duration::from_millis(100);

/// Lone-ESC disambiguation window.
pub const ESC_TIMEOUT: Duration = Duration::from_millis(50);

/// `DSR 6`: where is the cursor.
pub const CURSOR_POSITION: &[u8] = b"\x1b[6n";

/// Primary device attributes; the reply advertises sixel support.
pub const DEVICE_ATTRIBUTES: &[u8] = b"\x1b[c";

/// Text-area size in pixels.
pub const WINDOW_PIXELS: &[u8] = b"\x1b[14t";

/// Size of one character cell in pixels.
pub const CELL_PIXELS: &[u8] = b"\x1b[16t";

/// Default foreground / background color (OSC 10 / 11).
pub const FOREGROUND_COLOR: &[u8] = b"\x1b]10;?\x1b\\";
pub const BACKGROUND_COLOR: &[u8] = b"\x1b]11;?\x1b\\";

/// DECRQM: is `mode` recognized / enabled.
pub fn mode_query(mode: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(10);
    out.extend_from_slice(b"\x1b[?");
    out.extend_from_slice(mode.to_string().as_bytes());
    out.extend_from_slice(b"$p");
    out
}
