// ABOUTME: Seam between the session logic and the SSH channel.
// ABOUTME: Requests are acknowledged by the server; events arrive in order.

use super::SessionError;
use crate::terminal::{PtyRequest, TerminalGeometry};
use async_trait::async_trait;
use bytes::Bytes;
use std::pin::Pin;
use tokio::io::AsyncWrite;

/// Something the remote side sent on the session channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Stdout(Bytes),
    Stderr(Bytes),
    ExitStatus(u32),
    ExitSignal { signal: String, message: String },
    /// The remote side will send no more data.
    Eof,
    /// The remote side closed the channel.
    Closed,
}

/// An open session channel.
#[async_trait]
pub trait ShellChannel: Send {
    /// Ask for a pseudo-terminal. A refusal is [`SessionError::PtyRejected`].
    async fn request_terminal(&mut self, request: &PtyRequest) -> Result<(), SessionError>;

    /// Start the user's login shell.
    async fn start_shell(&mut self) -> Result<(), SessionError>;

    /// Run exactly one command.
    async fn start_command(&mut self, command: &str) -> Result<(), SessionError>;

    /// Tell the server the terminal changed size.
    async fn resize(&mut self, geometry: TerminalGeometry) -> Result<(), SessionError>;

    /// Writer for the remote side's standard input. Shutting it down sends EOF.
    fn input_writer(&mut self) -> Pin<Box<dyn AsyncWrite + Send>>;

    /// Next event from the remote side, or `None` once the channel is gone.
    async fn next_event(&mut self) -> Option<ChannelEvent>;
}
