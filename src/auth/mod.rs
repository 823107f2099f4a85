// ABOUTME: Authentication methods offered to the SSH transport.
// ABOUTME: Public keys signed by the agent first, then the agent-stored password.

mod signer;

pub use signer::IdentitySigner;

use crate::agent::{AgentError, CredentialAgent, Identity, ServiceDescriptor};
use crate::ssh::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Public-key authentication with signatures produced by the agent.
#[derive(Clone)]
pub struct PublicKeyMethod {
    agent: Arc<dyn CredentialAgent>,
}

impl PublicKeyMethod {
    pub fn new(agent: Arc<dyn CredentialAgent>) -> Self {
        Self { agent }
    }

    /// Enumerate the agent's identities.
    pub async fn identities(&self) -> std::result::Result<Vec<Identity>, AgentError> {
        self.agent.list_identities().await
    }

    /// Signing callback bound to one identity. Signs nothing until challenged.
    pub fn signer(&self, identity: &Identity) -> IdentitySigner {
        IdentitySigner::new(Arc::clone(&self.agent), identity.index())
    }
}

/// Password authentication with the password looked up in the agent.
#[derive(Clone)]
pub struct PasswordMethod {
    agent: Arc<dyn CredentialAgent>,
    descriptor: ServiceDescriptor,
}

impl PasswordMethod {
    pub fn new(agent: Arc<dyn CredentialAgent>, descriptor: ServiceDescriptor) -> Self {
        Self { agent, descriptor }
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    pub async fn password(&self) -> std::result::Result<String, AgentError> {
        self.agent.password(&self.descriptor).await
    }
}

/// One way of proving the user's identity to the server.
#[derive(Clone)]
pub enum AuthMethod {
    PublicKey(PublicKeyMethod),
    Password(PasswordMethod),
}

impl AuthMethod {
    pub fn name(&self) -> &'static str {
        match self {
            AuthMethod::PublicKey(_) => "publickey",
            AuthMethod::Password(_) => "password",
        }
    }
}

/// Build the methods to try, in order: public key, then password.
///
/// Public keys need no interaction, so the password (and whatever prompting
/// the agent does to obtain it) is only reached when no key is accepted.
pub fn auth_methods(agent: Arc<dyn CredentialAgent>, user: &str, host: &str) -> Vec<AuthMethod> {
    vec![
        AuthMethod::PublicKey(PublicKeyMethod::new(Arc::clone(&agent))),
        AuthMethod::Password(PasswordMethod::new(
            agent,
            ServiceDescriptor::new(host, user),
        )),
    ]
}

/// Server side of the authentication exchange.
///
/// Each call returns `Ok(true)` when the server accepted the credential.
#[async_trait(?Send)]
pub trait AuthTransport {
    /// Offer a public key; the transport calls `signer` when the server
    /// challenges it.
    async fn offer_public_key(
        &mut self,
        user: &str,
        identity: &Identity,
        signer: &mut IdentitySigner,
    ) -> Result<bool>;

    async fn offer_password(&mut self, user: &str, password: &str) -> Result<bool>;
}

/// Try `methods` in order until the server accepts one.
///
/// Agent failures only skip the affected method. Returns the name of the
/// accepted method, or [`Error::AuthenticationFailed`] once all are used up.
pub async fn authenticate<T: AuthTransport + ?Sized>(
    transport: &mut T,
    user: &str,
    methods: &[AuthMethod],
) -> Result<&'static str> {
    for method in methods {
        let accepted = match method {
            AuthMethod::PublicKey(keys) => try_public_keys(transport, user, keys).await?,
            AuthMethod::Password(password) => try_password(transport, user, password).await?,
        };
        if accepted {
            tracing::debug!("authenticated as {} with {}", user, method.name());
            return Ok(method.name());
        }
    }
    Err(Error::AuthenticationFailed)
}

async fn try_public_keys<T: AuthTransport + ?Sized>(
    transport: &mut T,
    user: &str,
    method: &PublicKeyMethod,
) -> Result<bool> {
    let identities = match method.identities().await {
        Ok(identities) => identities,
        Err(e) => {
            tracing::debug!("skipping public key authentication: {}", e);
            return Ok(false);
        }
    };

    for identity in &identities {
        tracing::debug!(
            "offering {} key {} ({})",
            identity.format(),
            identity.index(),
            identity.fingerprint()
        );
        let mut signer = method.signer(identity);
        if transport.offer_public_key(user, identity, &mut signer).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn try_password<T: AuthTransport + ?Sized>(
    transport: &mut T,
    user: &str,
    method: &PasswordMethod,
) -> Result<bool> {
    match method.password().await {
        Ok(password) => transport.offer_password(user, &password).await,
        Err(e) => {
            tracing::debug!("skipping password authentication: {}", e);
            Ok(false)
        }
    }
}
