// ABOUTME: Session configuration built once from the command line.
// ABOUTME: Validates user and server before any network activity.

mod target;

pub use target::Target;

use crate::resize::DEFAULT_INTERVAL;
use crate::ssh::ConnectConfig;
use crate::terminal::{DEFAULT_BAUD, EnvDir, GeometrySource, ProcessEnv, TtyGeometry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_TERM: &str = "xterm";
pub const DEFAULT_ENV_DIR: &str = "/env";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no user given (use -u or set USER)")]
    MissingUser,

    #[error("no server given (use -s or set SCPU)")]
    MissingServer,

    #[error("invalid server '{server}': {reason}")]
    InvalidTarget { server: String, reason: String },
}

/// Where the local terminal size is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometrySourceKind {
    /// The controlling terminal.
    Tty,
    /// `LINES` and `COLS` in the process environment.
    Env,
    /// `LINES` and `COLS` files in a directory.
    EnvDir(PathBuf),
}

impl GeometrySourceKind {
    pub fn build(&self) -> Arc<dyn GeometrySource> {
        match self {
            GeometrySourceKind::Tty => Arc::new(TtyGeometry),
            GeometrySourceKind::Env => Arc::new(ProcessEnv),
            GeometrySourceKind::EnvDir(dir) => Arc::new(EnvDir::new(dir)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TerminalConfig {
    pub term: String,
    pub baud: u32,
    pub geometry: GeometrySourceKind,
    pub resize_interval: Duration,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            term: DEFAULT_TERM.to_string(),
            baud: DEFAULT_BAUD,
            geometry: GeometrySourceKind::Tty,
            resize_interval: DEFAULT_INTERVAL,
        }
    }
}

/// How unknown server host keys are handled.
#[derive(Debug, Clone, Default)]
pub struct HostKeyPolicy {
    /// known_hosts file; None uses ~/.ssh/known_hosts.
    pub known_hosts: Option<PathBuf>,
    /// Record and accept keys of hosts not yet known.
    pub accept_new: bool,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub user: String,
    pub server: String,
    pub port: u16,
    pub command: Option<String>,
    pub strip_carriage_returns: bool,
    pub auto_resize: bool,
    pub verbose: bool,
    pub terminal: TerminalConfig,
    pub host_keys: HostKeyPolicy,
    pub connect_timeout: Option<Duration>,
    pub password_helper: Option<PathBuf>,
}

impl SessionConfig {
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: server.into(),
            port: DEFAULT_PORT,
            command: None,
            strip_carriage_returns: false,
            auto_resize: false,
            verbose: false,
            terminal: TerminalConfig::default(),
            host_keys: HostKeyPolicy::default(),
            connect_timeout: None,
            password_helper: None,
        }
    }

    /// Run `command` instead of a shell. An empty command means a shell.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref().filter(|c| !c.is_empty())
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Check user and server. Returns the parsed target.
    pub fn validate(&self) -> Result<Target, ConfigError> {
        if self.user.trim().is_empty() {
            return Err(ConfigError::MissingUser);
        }
        Target::parse(&self.server, self.port)
    }

    /// Connection settings for the validated `target`.
    pub fn connect_config(&self, target: &Target) -> ConnectConfig {
        ConnectConfig::new(&target.host, &self.user)
            .port(target.port)
            .trust_on_first_use(self.host_keys.accept_new)
            .known_hosts_path(self.host_keys.known_hosts.clone())
            .connect_timeout(self.connect_timeout)
    }
}
