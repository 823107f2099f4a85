// ABOUTME: SSH connection management using russh.
// ABOUTME: Handles connecting, host key verification, agent-backed authentication and channel setup.

use super::channel::RemoteChannel;
use super::error::{Error, Result};
use crate::agent::Identity;
use crate::auth::{self, AuthMethod, AuthTransport, IdentitySigner};
use async_trait::async_trait;
use russh::Disconnect;
use russh::client::{self, Config, Handle};
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::ssh_key;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    /// Whether to accept and record unknown host keys.
    /// If false, connection to unknown hosts will fail.
    pub trust_on_first_use: bool,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    /// Give up connecting after this long. None waits indefinitely.
    pub connect_timeout: Option<Duration>,
}

impl ConnectConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            trust_on_first_use: false,
            known_hosts_path: None,
            connect_timeout: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: Option<PathBuf>) -> Self {
        self.known_hosts_path = path;
        self
    }

    pub fn connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// `host:port` for messages.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// russh client handler: verifies the server's host key.
pub struct ClientHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl ClientHandler {
    fn new(config: &ConnectConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        }
    }

    fn learn(&self, key: &ssh_key::PublicKey) {
        let learned = match &self.known_hosts_path {
            Some(path) => learn_known_hosts_path(&self.host, self.port, key, path),
            None => learn_known_hosts(&self.host, self.port, key),
        };
        if let Err(e) = learned {
            tracing::warn!("failed to save host key to known_hosts: {}", e);
        }
    }
}

impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let known = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match known {
            Ok(true) => Ok(true),
            Err(russh::keys::Error::KeyChanged { .. }) => {
                tracing::error!(
                    "host key for {}:{} does not match known_hosts",
                    self.host,
                    self.port
                );
                Ok(false)
            }
            Ok(false) | Err(_) if self.trust_on_first_use => {
                tracing::warn!(
                    "accepting new host key for {}:{} ({})",
                    self.host,
                    self.port,
                    server_public_key.fingerprint(ssh_key::HashAlg::Sha256)
                );
                self.learn(server_public_key);
                Ok(true)
            }
            Ok(false) | Err(_) => {
                tracing::warn!(
                    "unknown host key for {}:{}; use --accept-new-host-keys to trust it",
                    self.host,
                    self.port
                );
                Ok(false)
            }
        }
    }
}

// Authentication runs on the caller's task, so its futures need not be Send.
#[async_trait(?Send)]
impl AuthTransport for Handle<ClientHandler> {
    async fn offer_public_key(
        &mut self,
        user: &str,
        identity: &Identity,
        signer: &mut IdentitySigner,
    ) -> Result<bool> {
        match self
            .authenticate_publickey_with(
                user,
                identity.public_key().clone(),
                identity.hash_alg(),
                signer,
            )
            .await
        {
            Ok(result) => Ok(result.success()),
            Err(e) => {
                tracing::debug!("key {} not usable: {}", identity.index(), e);
                Ok(false)
            }
        }
    }

    async fn offer_password(&mut self, user: &str, password: &str) -> Result<bool> {
        let result = self.authenticate_password(user, password).await?;
        Ok(result.success())
    }
}

/// An authenticated SSH connection.
pub struct Connection {
    target: String,
    handle: Handle<ClientHandler>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("target", &self.target)
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

impl Connection {
    /// Connect to the server and authenticate with `methods`, in order.
    pub async fn open(config: &ConnectConfig, methods: &[AuthMethod]) -> Result<Self> {
        let target = config.target();

        // Interactive sessions may sit idle for a long time.
        let russh_config = Config {
            inactivity_timeout: None,
            ..Default::default()
        };

        tracing::debug!("connecting to {}", target);
        let connect = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            ClientHandler::new(config),
        );

        let connected = match config.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connect)
                .await
                .map_err(|_| Error::ConnectTimeout {
                    target: target.clone(),
                    timeout,
                })?,
            None => connect.await,
        };
        let mut handle = connected.map_err(|e| Error::Connection {
            target: target.clone(),
            reason: e.to_string(),
        })?;

        auth::authenticate(&mut handle, &config.user, methods).await?;

        Ok(Self { target, handle })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Open the session channel the shell or command runs in.
    pub async fn open_session(&self) -> Result<RemoteChannel> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::ChannelOpen(e.to_string()))?;
        Ok(RemoteChannel::new(channel))
    }

    /// Disconnect the session.
    pub async fn disconnect(self) -> Result<()> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)?;
        Ok(())
    }
}
