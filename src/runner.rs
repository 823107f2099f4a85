// ABOUTME: Top-level flow from validated config to remote exit status.
// ABOUTME: Connects, authenticates via the agent, runs the session, disconnects.

use crate::agent::CredentialAgent;
use crate::auth;
use crate::config::{SessionConfig, Target};
use crate::error::Result;
use crate::session::{SessionController, SessionError, SessionIo};
use crate::ssh::Connection;
use crate::terminal::RawModeGuard;
use std::sync::Arc;

pub struct Runner {
    config: SessionConfig,
    target: Target,
    agent: Arc<dyn CredentialAgent>,
}

impl Runner {
    /// Validate `config`. Fails before any network activity.
    pub fn new(config: SessionConfig, agent: Arc<dyn CredentialAgent>) -> Result<Self> {
        let target = config.validate()?;
        Ok(Self {
            config,
            target,
            agent,
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Run the session on the process's standard streams.
    ///
    /// Returns once the remote side exits with status 0. A non-zero status
    /// is [`SessionError::RemoteExit`].
    pub async fn run(&self) -> Result<()> {
        let methods = auth::auth_methods(
            Arc::clone(&self.agent),
            &self.config.user,
            &self.target.host,
        );
        let connection =
            Connection::open(&self.config.connect_config(&self.target), &methods).await?;
        tracing::debug!("connected to {}", connection.target());

        let channel = connection.open_session().await?;
        let controller = SessionController::new(&self.config);

        let status = match self.raw_mode(&controller) {
            Ok(_raw) => {
                controller
                    .run(
                        channel,
                        SessionIo::stdio(),
                        self.config.terminal.geometry.build(),
                    )
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = connection.disconnect().await {
            tracing::debug!("disconnect failed: {}", e);
        }

        match status? {
            0 => Ok(()),
            status => Err(SessionError::RemoteExit(status).into()),
        }
    }

    /// Raw mode for the interactive shell, restored when the guard drops.
    fn raw_mode(
        &self,
        controller: &SessionController,
    ) -> std::result::Result<Option<RawModeGuard>, SessionError> {
        if controller.is_interactive() {
            RawModeGuard::enable().map_err(SessionError::Io)
        } else {
            Ok(None)
        }
    }
}
