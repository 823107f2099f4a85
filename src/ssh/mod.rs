// ABOUTME: SSH transport glue over russh.
// ABOUTME: Connects with known_hosts verification, authenticates via the agent, opens the shell channel.

mod channel;
mod client;
mod error;

pub use channel::RemoteChannel;
pub use client::{ConnectConfig, Connection};
pub use error::{Error, Result};
