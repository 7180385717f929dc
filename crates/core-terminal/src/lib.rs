//! Terminal session backend.
//!
//! Raw mode comes from crossterm; everything the renderer negotiates on
//! top (alternate screen, SGR-extended mouse, bracketed paste, focus
//! reporting, cursor visibility) is written as raw escape bytes, keeping
//! the byte stream in one grammar end to end. `TerminalGuard` restores
//! the console even when the caller
//! unwinds, so a crash never strands the user on the alternate screen
//! with a hidden cursor.

use std::io::{stdout, Write};

use anyhow::Result;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

pub mod capabilities;
pub mod query;

pub use capabilities::TerminalCapabilities;

const ALT_SCREEN_ON: &[u8] = b"\x1b[?1049h\x1b[1;1H";
const ALT_SCREEN_OFF: &[u8] = b"\x1b[?1049l";
const CURSOR_HIDE: &[u8] = b"\x1b[?25l";
const CURSOR_SHOW: &[u8] = b"\x1b[?25h";
// Any-event mouse with SGR-extended coordinates.
const MOUSE_ON: &[u8] = b"\x1b[?1000h\x1b[?1003h\x1b[?1006h";
const MOUSE_OFF: &[u8] = b"\x1b[?1006l\x1b[?1003l\x1b[?1000l";
const MOUSE_PIXELS_ON: &[u8] = b"\x1b[?1016h";
const MOUSE_PIXELS_OFF: &[u8] = b"\x1b[?1016l";
const PASTE_ON: &[u8] = b"\x1b[?2004h";
const PASTE_OFF: &[u8] = b"\x1b[?2004l";
const FOCUS_ON: &[u8] = b"\x1b[?1004h";
const FOCUS_OFF: &[u8] = b"\x1b[?1004l";
const SGR_RESET: &[u8] = b"\x1b[0m";

/// Which optional modes a session turns on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub mouse: bool,
    /// SGR-Pixels coordinate reporting on top of SGR mouse.
    pub pixel_mouse: bool,
    pub bracketed_paste: bool,
    pub focus_events: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            mouse: true,
            pixel_mouse: false,
            bracketed_paste: true,
            focus_events: true,
        }
    }
}

pub trait TerminalBackend {
    fn enter(&mut self, opts: SessionOptions) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    fn set_title(&mut self, title: &str) -> Result<()>;
}

pub struct CrosstermBackend {
    entered: bool,
    opts: SessionOptions,
}

/// RAII guard ensuring console restoration even if the caller early-returns
/// or panics.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
    active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub rows: usize,
    pub cols: usize,
    pub cell_h: usize,
    pub cell_w: usize,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self {
            entered: false,
            opts: SessionOptions::default(),
        }
    }

    /// Enter and return a guard that will leave on drop.
    pub fn enter_guard(&mut self, opts: SessionOptions) -> Result<TerminalGuard<'_>> {
        self.enter(opts)?;
        Ok(TerminalGuard {
            backend: self,
            active: true,
        })
    }

    /// Cell grid size plus per-cell pixel geometry. Falls back to a common
    /// cell size when the terminal does not report pixel dimensions.
    pub fn geometry(&self) -> Result<Geometry> {
        let (cols, rows) = crossterm::terminal::size()?;
        let (cell_w, cell_h) = match crossterm::terminal::window_size() {
            Ok(ws) if ws.width > 0 && ws.height > 0 && cols > 0 && rows > 0 => {
                ((ws.width / cols).max(1), (ws.height / rows).max(1))
            }
            _ => (8, 16),
        };
        Ok(Geometry {
            rows: rows as usize,
            cols: cols as usize,
            cell_h: cell_h as usize,
            cell_w: cell_w as usize,
        })
    }

    fn write_all(bytes: &[u8]) -> Result<()> {
        let mut out = stdout();
        out.write_all(bytes)?;
        out.flush()?;
        Ok(())
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self, opts: SessionOptions) -> Result<()> {
        if self.entered {
            return Ok(());
        }
        enable_raw_mode()?;
        let mut seq = Vec::new();
        seq.extend_from_slice(ALT_SCREEN_ON);
        seq.extend_from_slice(CURSOR_HIDE);
        if opts.mouse {
            seq.extend_from_slice(MOUSE_ON);
            if opts.pixel_mouse {
                seq.extend_from_slice(MOUSE_PIXELS_ON);
            }
        }
        if opts.bracketed_paste {
            seq.extend_from_slice(PASTE_ON);
        }
        if opts.focus_events {
            seq.extend_from_slice(FOCUS_ON);
        }
        Self::write_all(&seq)?;
        self.opts = opts;
        self.entered = true;
        tracing::debug!(?opts, "terminal session entered");
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if !self.entered {
            return Ok(());
        }
        let mut seq = Vec::new();
        if self.opts.focus_events {
            seq.extend_from_slice(FOCUS_OFF);
        }
        if self.opts.bracketed_paste {
            seq.extend_from_slice(PASTE_OFF);
        }
        if self.opts.mouse {
            if self.opts.pixel_mouse {
                seq.extend_from_slice(MOUSE_PIXELS_OFF);
            }
            seq.extend_from_slice(MOUSE_OFF);
        }
        seq.extend_from_slice(SGR_RESET);
        seq.extend_from_slice(CURSOR_SHOW);
        seq.extend_from_slice(ALT_SCREEN_OFF);
        Self::write_all(&seq)?;
        disable_raw_mode()?;
        self.entered = false;
        tracing::debug!("terminal session left");
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        let mut seq = Vec::with_capacity(title.len() + 8);
        seq.extend_from_slice(b"\x1b]2;");
        seq.extend_from_slice(title.as_bytes());
        seq.extend_from_slice(b"\x1b\\");
        Self::write_all(&seq)
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl<'a> Drop for TerminalGuard<'a> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.backend.leave();
        }
    }
}
