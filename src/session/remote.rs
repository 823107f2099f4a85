// ABOUTME: Remote session parameterized by state marker.
// ABOUTME: Transitions consume the session and return it in the next state.

use super::channel::{ChannelEvent, ShellChannel};
use super::error::SessionError;
use super::state::{Completed, Created, PtyRequested, Running};
use crate::filter::RemoteSink;
use crate::resize::ResizeWatcher;
use crate::terminal::{GeometrySource, PtyRequest, TerminalGeometry};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Pending resize notifications before the watcher waits for the session.
const RESIZE_QUEUE: usize = 4;

/// Local streams the session is relayed to and from.
#[derive(Debug)]
pub struct SessionIo<R, O, E> {
    pub stdin: R,
    pub stdout: O,
    pub stderr: E,
}

impl SessionIo<tokio::io::Stdin, tokio::io::Stdout, tokio::io::Stderr> {
    /// The process's own standard streams.
    pub fn stdio() -> Self {
        Self {
            stdin: tokio::io::stdin(),
            stdout: tokio::io::stdout(),
            stderr: tokio::io::stderr(),
        }
    }
}

/// Copy `reader` into `writer` until end-of-stream, then shut the writer
/// down so the remote side sees EOF.
pub async fn forward_input<R, W>(mut reader: R, mut writer: W) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let copied = tokio::io::copy(&mut reader, &mut writer).await?;
    writer.shutdown().await?;
    Ok(copied)
}

/// A session on one SSH channel, parameterized by its current state.
///
/// A shell needs `Created -> PtyRequested -> Running`, a command goes
/// straight from `Created` to `Running`, so the types rule out starting both.
#[derive(Debug)]
pub struct RemoteSession<C, S> {
    channel: C,
    state: S,
}

impl<C, S> RemoteSession<C, S> {
    pub fn state(&self) -> &S {
        &self.state
    }
}

impl<C: ShellChannel> RemoteSession<C, Created> {
    pub fn new(channel: C) -> Self {
        RemoteSession {
            channel,
            state: Created,
        }
    }

    /// Request a pseudo-terminal.
    ///
    /// A refused or failed request is logged and the session carries on
    /// without one.
    pub async fn request_pty(mut self, request: &PtyRequest) -> RemoteSession<C, PtyRequested> {
        tracing::debug!(
            "requesting {} terminal {}x{} at {} baud",
            request.term,
            request.geometry.columns,
            request.geometry.rows,
            request.line_speed.output
        );
        let granted = match self.channel.request_terminal(request).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("continuing without a pseudo-terminal: {}", e);
                false
            }
        };
        RemoteSession {
            channel: self.channel,
            state: PtyRequested {
                geometry: request.geometry,
                granted,
            },
        }
    }

    /// Run exactly one command, without a pseudo-terminal.
    pub async fn exec<R, O, E>(
        mut self,
        command: &str,
        io: SessionIo<R, O, E>,
        strip_carriage_returns: bool,
    ) -> Result<RemoteSession<C, Running<O, E>>, SessionError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        tracing::debug!("running remote command: {}", command);
        self.channel.start_command(command).await?;
        Ok(self.start(io, strip_carriage_returns, TerminalGeometry::default()))
    }
}

impl<C: ShellChannel> RemoteSession<C, PtyRequested> {
    /// Start the remote login shell.
    pub async fn shell<R, O, E>(
        mut self,
        io: SessionIo<R, O, E>,
        strip_carriage_returns: bool,
    ) -> Result<RemoteSession<C, Running<O, E>>, SessionError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        if self.state.granted {
            tracing::debug!("starting remote shell");
        } else {
            tracing::debug!("starting remote shell without a terminal");
        }
        self.channel.start_shell().await?;
        let geometry = self.state.geometry;
        Ok(self.start(io, strip_carriage_returns, geometry))
    }
}

impl<C: ShellChannel, S> RemoteSession<C, S> {
    /// Wire the local streams to the started channel.
    fn start<R, O, E>(
        mut self,
        io: SessionIo<R, O, E>,
        strip_carriage_returns: bool,
        geometry: TerminalGeometry,
    ) -> RemoteSession<C, Running<O, E>>
    where
        R: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        let writer = self.channel.input_writer();
        let input = tokio::spawn(async move {
            match forward_input(io.stdin, writer).await {
                Ok(n) => tracing::debug!("local input closed after {} bytes", n),
                Err(e) => tracing::debug!("input forwarding stopped: {}", e),
            }
        });

        RemoteSession {
            channel: self.channel,
            state: Running {
                stdout: RemoteSink::new(io.stdout, strip_carriage_returns),
                stderr: RemoteSink::new(io.stderr, strip_carriage_returns),
                geometry,
                input,
                resize: None,
            },
        }
    }
}

impl<C: ShellChannel, O, E> RemoteSession<C, Running<O, E>>
where
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    /// Poll `source` every `interval` and forward size changes to the server
    /// until the session completes.
    pub fn watch_resize(mut self, source: Arc<dyn GeometrySource>, interval: Duration) -> Self {
        let (tx, rx) = mpsc::channel(RESIZE_QUEUE);
        let handle = ResizeWatcher::new(source, self.state.geometry).spawn(interval, tx);
        self.state.resize = Some((handle, rx));
        self
    }

    /// Relay remote output until the remote side is done.
    pub async fn wait(mut self) -> Result<RemoteSession<C, Completed>, SessionError> {
        let (resize_handle, mut resize_rx) = match self.state.resize.take() {
            Some((handle, rx)) => (Some(handle), Some(rx)),
            None => (None, None),
        };

        let relayed = relay(
            &mut self.channel,
            &mut self.state.stdout,
            &mut self.state.stderr,
            &mut resize_rx,
        )
        .await;

        if let Some(handle) = resize_handle {
            handle.stop().await;
        }
        // The input task ends on its own at local EOF or its next failed write.
        drop(self.state.input);

        let exit_status = relayed?;
        Ok(RemoteSession {
            channel: self.channel,
            state: Completed { exit_status },
        })
    }
}

async fn relay<C, O, E>(
    channel: &mut C,
    stdout: &mut RemoteSink<O>,
    stderr: &mut RemoteSink<E>,
    resize_rx: &mut Option<mpsc::Receiver<TerminalGeometry>>,
) -> Result<u32, SessionError>
where
    C: ShellChannel,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut exit_status = None;
    let mut signal = None;
    let mut got_eof = false;

    loop {
        tokio::select! {
            event = channel.next_event() => match event {
                Some(ChannelEvent::Stdout(data)) => stdout.write(&data).await?,
                Some(ChannelEvent::Stderr(data)) => stderr.write(&data).await?,
                Some(ChannelEvent::ExitStatus(status)) => {
                    exit_status = Some(status);
                    if got_eof {
                        break;
                    }
                }
                Some(ChannelEvent::ExitSignal { signal: name, message }) => {
                    tracing::debug!("remote process got signal {}: {}", name, message);
                    signal = Some((name, message));
                }
                Some(ChannelEvent::Eof) => {
                    got_eof = true;
                    if exit_status.is_some() {
                        break;
                    }
                }
                Some(ChannelEvent::Closed) | None => break,
            },
            resized = next_resize(resize_rx) => match resized {
                Some(geometry) => {
                    tracing::debug!("terminal resized to {}x{}", geometry.columns, geometry.rows);
                    if let Err(e) = channel.resize(geometry).await {
                        tracing::debug!("window change failed: {}", e);
                    }
                }
                None => *resize_rx = None,
            },
        }
    }

    match (exit_status, signal) {
        (Some(status), _) => Ok(status),
        (None, Some((signal, message))) => Err(SessionError::Signal { signal, message }),
        (None, None) => Err(SessionError::NoExitStatus),
    }
}

async fn next_resize(
    rx: &mut Option<mpsc::Receiver<TerminalGeometry>>,
) -> Option<TerminalGeometry> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
