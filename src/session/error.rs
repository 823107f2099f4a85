// ABOUTME: Error types for a running remote session.
// ABOUTME: Request rejections, remote exit outcomes and relay I/O failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The server would not allocate a pseudo-terminal. Not fatal.
    #[error("server refused the pseudo-terminal request")]
    PtyRejected,

    #[error("server refused to start {0}")]
    Start(String),

    #[error("channel failure: {0}")]
    Channel(String),

    #[error("remote command exited with status {0}")]
    RemoteExit(u32),

    #[error("remote process terminated by signal {signal}")]
    Signal { signal: String, message: String },

    #[error("channel closed without an exit status")]
    NoExitStatus,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),
}
