// ABOUTME: Local terminal types shared by the session relay.
// ABOUTME: Geometry, line speed, PTY request parameters and raw mode handling.

mod source;

pub use source::{EnvDir, GeometrySource, ProcessEnv, TtyGeometry};

use std::io::IsTerminal;

/// Line speed reported to the server in the PTY request.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Size of a terminal in character cells and pixels.
///
/// A zero field means "unknown". Zero columns or rows are passed to the
/// server as-is; substituting defaults is left to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminalGeometry {
    pub columns: u32,
    pub rows: u32,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl TerminalGeometry {
    pub fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows,
            pixel_width: 0,
            pixel_height: 0,
        }
    }

    pub fn with_pixels(mut self, width: u32, height: u32) -> Self {
        self.pixel_width = width;
        self.pixel_height = height;
        self
    }

    /// Whether the character-cell size matches. Pixel sizes are ignored.
    pub fn same_size(&self, other: &TerminalGeometry) -> bool {
        self.columns == other.columns && self.rows == other.rows
    }
}

/// Input and output baud rates for the pseudo-terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpeed {
    pub input: u32,
    pub output: u32,
}

impl LineSpeed {
    pub fn symmetric(baud: u32) -> Self {
        Self {
            input: baud,
            output: baud,
        }
    }
}

impl Default for LineSpeed {
    fn default() -> Self {
        Self::symmetric(DEFAULT_BAUD)
    }
}

/// Everything the server needs to allocate a pseudo-terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtyRequest {
    pub term: String,
    pub geometry: TerminalGeometry,
    pub line_speed: LineSpeed,
}

/// Puts the local terminal in raw mode until dropped.
///
/// Keystrokes then reach the remote shell unmodified; the remote PTY does
/// echo and line editing.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    /// Enable raw mode if stdin is a terminal. Returns `None` otherwise.
    pub fn enable() -> std::io::Result<Option<Self>> {
        if !std::io::stdin().is_terminal() {
            return Ok(None);
        }
        crossterm::terminal::enable_raw_mode()?;
        Ok(Some(Self { _private: () }))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = crossterm::terminal::disable_raw_mode() {
            tracing::warn!("failed to restore terminal mode: {}", e);
        }
    }
}
