// ABOUTME: Chooses between the interactive shell and the one-command path.
// ABOUTME: Drives a RemoteSession from channel open to the remote exit status.

use super::channel::ShellChannel;
use super::error::SessionError;
use super::remote::{RemoteSession, SessionIo};
use crate::config::SessionConfig;
use crate::terminal::{GeometrySource, LineSpeed, PtyRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Debug, Clone)]
pub struct SessionController {
    command: Option<String>,
    term: String,
    line_speed: LineSpeed,
    strip_carriage_returns: bool,
    auto_resize: bool,
    resize_interval: Duration,
}

impl SessionController {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            command: config.command().map(str::to_string),
            term: config.terminal.term.clone(),
            line_speed: LineSpeed::symmetric(config.terminal.baud),
            strip_carriage_returns: config.strip_carriage_returns,
            auto_resize: config.auto_resize,
            resize_interval: config.terminal.resize_interval,
        }
    }

    /// True when no command was given and a shell will be started.
    pub fn is_interactive(&self) -> bool {
        self.command.is_none()
    }

    /// Run the session to completion and return the remote exit status.
    ///
    /// A command runs without a pseudo-terminal. A shell gets one sized from
    /// `geometry`, kept in sync when auto-resize is on.
    pub async fn run<C, R, O, E>(
        &self,
        channel: C,
        io: SessionIo<R, O, E>,
        geometry: Arc<dyn GeometrySource>,
    ) -> Result<u32, SessionError>
    where
        C: ShellChannel,
        R: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin,
        E: AsyncWrite + Unpin,
    {
        let session = RemoteSession::new(channel);

        let running = match &self.command {
            Some(command) => session.exec(command, io, self.strip_carriage_returns).await?,
            None => {
                let request = PtyRequest {
                    term: self.term.clone(),
                    geometry: geometry.geometry().await.unwrap_or_default(),
                    line_speed: self.line_speed,
                };
                let session = session.request_pty(&request).await;
                let running = session.shell(io, self.strip_carriage_returns).await?;
                if self.auto_resize {
                    running.watch_resize(geometry, self.resize_interval)
                } else {
                    running
                }
            }
        };

        let completed = running.wait().await?;
        let status = completed.state().exit_status();
        tracing::debug!("remote side exited with status {}", status);
        Ok(status)
    }
}
