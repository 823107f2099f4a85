// ABOUTME: Session channel backed by a russh client channel.
// ABOUTME: Waits for request replies and buffers messages that arrive meanwhile.

use crate::session::{ChannelEvent, SessionError, ShellChannel};
use crate::terminal::{PtyRequest, TerminalGeometry};
use async_trait::async_trait;
use bytes::Bytes;
use russh::client::Msg;
use russh::{Channel, ChannelMsg, Pty};
use std::collections::VecDeque;
use std::pin::Pin;
use tokio::io::AsyncWrite;

/// Extended data type code for stderr.
const EXTENDED_DATA_STDERR: u32 = 1;

pub struct RemoteChannel {
    inner: Channel<Msg>,
    pending: VecDeque<ChannelMsg>,
}

impl std::fmt::Debug for RemoteChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteChannel")
            .field("id", &self.inner.id())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl RemoteChannel {
    pub(crate) fn new(inner: Channel<Msg>) -> Self {
        Self {
            inner,
            pending: VecDeque::new(),
        }
    }

    /// Wait for the server's answer to the last request sent with
    /// `want_reply`. Anything else that arrives first is kept for
    /// [`ShellChannel::next_event`].
    async fn await_reply(&mut self) -> Result<bool, SessionError> {
        loop {
            match self.inner.wait().await {
                Some(ChannelMsg::Success) => return Ok(true),
                Some(ChannelMsg::Failure) => return Ok(false),
                Some(ChannelMsg::Close) | None => {
                    return Err(SessionError::Channel(
                        "channel closed while waiting for a reply".to_string(),
                    ));
                }
                Some(msg) => self.pending.push_back(msg),
            }
        }
    }

    async fn next_message(&mut self) -> Option<ChannelMsg> {
        match self.pending.pop_front() {
            Some(msg) => Some(msg),
            None => self.inner.wait().await,
        }
    }
}

#[async_trait]
impl ShellChannel for RemoteChannel {
    async fn request_terminal(&mut self, request: &PtyRequest) -> Result<(), SessionError> {
        let geometry = request.geometry;
        self.inner
            .request_pty(
                true,
                &request.term,
                geometry.columns,
                geometry.rows,
                geometry.pixel_width,
                geometry.pixel_height,
                &[
                    (Pty::TTY_OP_ISPEED, request.line_speed.input),
                    (Pty::TTY_OP_OSPEED, request.line_speed.output),
                ],
            )
            .await?;
        if self.await_reply().await? {
            Ok(())
        } else {
            Err(SessionError::PtyRejected)
        }
    }

    async fn start_shell(&mut self) -> Result<(), SessionError> {
        self.inner.request_shell(true).await?;
        if self.await_reply().await? {
            Ok(())
        } else {
            Err(SessionError::Start("the shell".to_string()))
        }
    }

    async fn start_command(&mut self, command: &str) -> Result<(), SessionError> {
        self.inner.exec(true, command).await?;
        if self.await_reply().await? {
            Ok(())
        } else {
            Err(SessionError::Start(format!("command '{}'", command)))
        }
    }

    async fn resize(&mut self, geometry: TerminalGeometry) -> Result<(), SessionError> {
        self.inner
            .window_change(
                geometry.columns,
                geometry.rows,
                geometry.pixel_width,
                geometry.pixel_height,
            )
            .await?;
        Ok(())
    }

    fn input_writer(&mut self) -> Pin<Box<dyn AsyncWrite + Send>> {
        Box::pin(self.inner.make_writer())
    }

    async fn next_event(&mut self) -> Option<ChannelEvent> {
        loop {
            let event = match self.next_message().await? {
                ChannelMsg::Data { data } => ChannelEvent::Stdout(Bytes::copy_from_slice(&data)),
                ChannelMsg::ExtendedData { data, ext } if ext == EXTENDED_DATA_STDERR => {
                    ChannelEvent::Stderr(Bytes::copy_from_slice(&data))
                }
                ChannelMsg::ExitStatus { exit_status } => ChannelEvent::ExitStatus(exit_status),
                ChannelMsg::ExitSignal {
                    signal_name,
                    error_message,
                    ..
                } => ChannelEvent::ExitSignal {
                    signal: format!("{:?}", signal_name),
                    message: error_message,
                },
                ChannelMsg::Eof => ChannelEvent::Eof,
                ChannelMsg::Close => ChannelEvent::Closed,
                _ => continue,
            };
            return Some(event);
        }
    }
}
