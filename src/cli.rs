// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Flags fall back to environment variables and build a SessionConfig.

use clap::{Parser, ValueEnum};
use scpu::config::{
    DEFAULT_ENV_DIR, DEFAULT_PORT, DEFAULT_TERM, GeometrySourceKind, HostKeyPolicy,
    SessionConfig, TerminalConfig,
};
use scpu::terminal::DEFAULT_BAUD;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "scpu")]
#[command(about = "Remote shell over SSH with agent-held credentials")]
#[command(version)]
pub struct Cli {
    /// Remote user
    #[arg(short, long, env = "USER", default_value = "", hide_env_values = true)]
    pub user: String,

    /// Server to connect to, as host[:port]
    #[arg(short, long, env = "SCPU", default_value = "")]
    pub server: String,

    /// Port used when the server names none
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Run this command instead of a shell
    #[arg(short, long, default_value = "")]
    pub command: String,

    /// Strip carriage returns from remote output
    #[arg(short = 'r', long)]
    pub strip_cr: bool,

    /// Keep the remote terminal size in sync with the local one
    #[arg(short, long)]
    pub auto_resize: bool,

    /// Debug logging; also report session errors
    #[arg(short, long)]
    pub verbose: bool,

    /// Terminal type sent with the pseudo-terminal request
    #[arg(long, env = "TERM", default_value = DEFAULT_TERM)]
    pub term: String,

    /// Line speed sent with the pseudo-terminal request
    #[arg(long, default_value_t = DEFAULT_BAUD)]
    pub baud: u32,

    /// Where to read the local terminal size from
    #[arg(long, value_enum, default_value_t = GeometryArg::Tty)]
    pub geometry: GeometryArg,

    /// Directory holding LINES and COLS files for --geometry env-dir
    #[arg(long, default_value = DEFAULT_ENV_DIR)]
    pub env_dir: PathBuf,

    /// How often to check the terminal size, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub resize_interval_ms: u64,

    /// known_hosts file (default: ~/.ssh/known_hosts)
    #[arg(long)]
    pub known_hosts: Option<PathBuf>,

    /// Trust and record host keys of servers not seen before
    #[arg(long)]
    pub accept_new_host_keys: bool,

    /// Give up connecting after this many seconds
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// Program printing the password for the descriptor given as its argument
    #[arg(long, env = "SSH_ASKPASS")]
    pub password_helper: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeometryArg {
    /// The controlling terminal
    Tty,
    /// LINES and COLS environment variables
    Env,
    /// LINES and COLS files in --env-dir
    EnvDir,
}

impl Cli {
    pub fn into_config(self) -> SessionConfig {
        let geometry = match self.geometry {
            GeometryArg::Tty => GeometrySourceKind::Tty,
            GeometryArg::Env => GeometrySourceKind::Env,
            GeometryArg::EnvDir => GeometrySourceKind::EnvDir(self.env_dir),
        };

        SessionConfig {
            user: self.user,
            server: self.server,
            port: self.port,
            command: Some(self.command).filter(|c| !c.is_empty()),
            strip_carriage_returns: self.strip_cr,
            auto_resize: self.auto_resize,
            verbose: self.verbose,
            terminal: TerminalConfig {
                term: self.term,
                baud: self.baud,
                geometry,
                resize_interval: Duration::from_millis(self.resize_interval_ms.max(1)),
            },
            host_keys: HostKeyPolicy {
                known_hosts: self.known_hosts,
                accept_new: self.accept_new_host_keys,
            },
            connect_timeout: self.connect_timeout.map(Duration::from_secs),
            password_helper: self.password_helper,
        }
    }
}
