// ABOUTME: Session state marker types for the type state pattern.
// ABOUTME: Each state carries the data the next transition needs.

use crate::filter::RemoteSink;
use crate::resize::ResizeHandle;
use crate::terminal::TerminalGeometry;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Channel open, nothing requested yet.
/// Available actions: `request_pty()`, `exec()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Created;

/// Pseudo-terminal requested (the server may have refused it).
/// Available actions: `shell()`
#[derive(Debug, Clone, Copy)]
pub struct PtyRequested {
    pub(crate) geometry: TerminalGeometry,
    pub(crate) granted: bool,
}

impl PtyRequested {
    /// Size the terminal was requested with.
    pub fn geometry(&self) -> TerminalGeometry {
        self.geometry
    }

    /// Whether the server allocated the pseudo-terminal.
    pub fn granted(&self) -> bool {
        self.granted
    }
}

/// Shell or command started; output is being relayed.
/// Available actions: `watch_resize()`, `wait()`
pub struct Running<O, E> {
    pub(crate) stdout: RemoteSink<O>,
    pub(crate) stderr: RemoteSink<E>,
    pub(crate) geometry: TerminalGeometry,
    pub(crate) input: JoinHandle<()>,
    pub(crate) resize: Option<(ResizeHandle, mpsc::Receiver<TerminalGeometry>)>,
}

/// Remote side exited and reported a status.
#[derive(Debug, Clone, Copy)]
pub struct Completed {
    pub(crate) exit_status: u32,
}

impl Completed {
    pub fn exit_status(&self) -> u32 {
        self.exit_status
    }
}
