// ABOUTME: SSH transport error types.
// ABOUTME: Covers connecting, authentication, and opening the session channel.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not connect to {target}: {reason}")]
    Connection { target: String, reason: String },

    #[error("could not connect to {target}: timed out after {timeout:?}")]
    ConnectTimeout {
        target: String,
        timeout: std::time::Duration,
    },

    #[error("authentication failed: no method was accepted")]
    AuthenticationFailed,

    #[error("could not open session channel: {0}")]
    ChannelOpen(String),

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
