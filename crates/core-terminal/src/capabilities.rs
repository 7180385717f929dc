//! Terminal capability probing.
//!
//! Detection must be cheap: it runs once at startup. Sixel support is
//! assumed optimistically until a device-attributes reply proves
//! otherwise; the round trip (`ESC [ c`, 100 ms timeout, look for
//! parameter 4) belongs to the input side, which can downgrade the
//! capabilities it hands back in. The struct is non-exhaustive so later
//! probes can grow fields without breaking downstream code.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct TerminalCapabilities {
    /// Terminal accepts sixel DCS blocks (device attribute 4).
    pub supports_sixel: bool,
    /// Cell pixel geometry (h, w) when the terminal reports one.
    pub cell_pixels: Option<(u16, u16)>,
}

impl TerminalCapabilities {
    pub fn detect() -> Self {
        let cell_pixels = match crossterm::terminal::window_size() {
            Ok(ws) if ws.width > 0 && ws.height > 0 && ws.columns > 0 && ws.rows > 0 => {
                Some((ws.height / ws.rows, ws.width / ws.columns))
            }
            _ => None,
        };
        Self {
            supports_sixel: true,
            cell_pixels,
        }
    }

    /// Downgrade after a device-attributes reply without sixel support.
    pub fn without_sixel(mut self) -> Self {
        self.supports_sixel = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_is_optimistic_about_sixel() {
        let caps = TerminalCapabilities::detect();
        assert!(caps.supports_sixel);
    }

    #[test]
    fn downgrade_clears_sixel() {
        let caps = TerminalCapabilities::detect().without_sixel();
        assert!(!caps.supports_sixel);
    }
}
