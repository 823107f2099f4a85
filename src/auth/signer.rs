// ABOUTME: Per-identity signing callback handed to the SSH transport.
// ABOUTME: Signs the server's challenge through the credential agent only when asked.

use crate::agent::{AgentError, CredentialAgent, Signature};
use russh::keys::ssh_key::{HashAlg, PublicKey};
use russh::{AgentAuthError, CryptoVec, Signer};
use std::future::Future;
use std::sync::Arc;

/// Signs challenges with one agent identity.
#[derive(Clone)]
pub struct IdentitySigner {
    agent: Arc<dyn CredentialAgent>,
    index: usize,
}

impl IdentitySigner {
    pub fn new(agent: Arc<dyn CredentialAgent>, index: usize) -> Self {
        Self { agent, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Have the agent sign `payload` with this identity.
    pub async fn sign(&self, payload: &[u8]) -> Result<Signature, AgentError> {
        self.agent.sign(self.index, payload).await
    }
}

impl Signer for IdentitySigner {
    type Error = AgentAuthError;

    // The reply is the challenge followed by the signature blob as an SSH
    // string, the same shape an ssh-agent sign response is turned into.
    fn auth_publickey_sign(
        &mut self,
        _key: &PublicKey,
        _hash_alg: Option<HashAlg>,
        to_sign: CryptoVec,
    ) -> impl Future<Output = Result<CryptoVec, Self::Error>> + Send {
        async move {
            let signature = self.sign(&to_sign).await.map_err(|e| {
                tracing::debug!("agent signing failed: {}", e);
                AgentAuthError::from(russh::keys::Error::from(std::io::Error::other(
                    e.to_string(),
                )))
            })?;

            let mut reply = to_sign;
            reply.extend(&signature.to_wire_string());
            Ok(reply)
        }
    }
}
