// ABOUTME: Credential agent backed by the running ssh-agent and a password helper program.
// ABOUTME: Keys are signed through SSH_AUTH_SOCK; passwords come from the helper's stdout.

use super::{AgentError, CredentialAgent, Identity, ServiceDescriptor, Signature, signing_hash};
use async_trait::async_trait;
use russh::CryptoVec;
use russh::keys::agent::client::AgentClient;
use russh::keys::ssh_key::PublicKey;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::net::UnixStream;
use tokio::process::Command;
use tokio::sync::Mutex;

/// Agent connection plus the identities from the latest listing.
#[derive(Default)]
struct KeyState {
    client: Option<AgentClient<UnixStream>>,
    identities: Vec<PublicKey>,
}

/// The user's agent: ssh-agent for keys, an askpass-style helper for passwords.
pub struct SystemAgent {
    keys: Mutex<KeyState>,
    password_helper: Option<PathBuf>,
}

impl std::fmt::Debug for SystemAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemAgent")
            .field("keys", &"<ssh-agent>")
            .field("password_helper", &self.password_helper)
            .finish()
    }
}

impl SystemAgent {
    pub fn new(password_helper: Option<PathBuf>) -> Self {
        Self {
            keys: Mutex::new(KeyState::default()),
            password_helper,
        }
    }
}

#[async_trait]
impl CredentialAgent for SystemAgent {
    async fn list_identities(&self) -> Result<Vec<Identity>, AgentError> {
        let mut state = self.keys.lock().await;

        if state.client.is_none() {
            let client = AgentClient::connect_env()
                .await
                .map_err(|e| AgentError::Unavailable(e.to_string()))?;
            state.client = Some(client);
        }
        let Some(client) = state.client.as_mut() else {
            return Err(AgentError::Unavailable("no agent connection".to_string()));
        };

        let keys = client
            .request_identities()
            .await
            .map_err(|e| AgentError::Unavailable(format!("failed to list agent keys: {}", e)))?;

        tracing::debug!("agent offers {} identities", keys.len());
        state.identities = keys.clone();

        Ok(keys
            .into_iter()
            .enumerate()
            .map(|(index, key)| Identity::new(index, key))
            .collect())
    }

    async fn sign(&self, index: usize, payload: &[u8]) -> Result<Signature, AgentError> {
        let mut state = self.keys.lock().await;

        let key = state
            .identities
            .get(index)
            .cloned()
            .ok_or_else(|| AgentError::SigningFailed {
                index,
                reason: "no identity at this index".to_string(),
            })?;
        let client = state
            .client
            .as_mut()
            .ok_or_else(|| AgentError::Unavailable("not connected".to_string()))?;

        let signed = client
            .sign_request(&key, signing_hash(&key), CryptoVec::from_slice(payload))
            .await
            .map_err(|e| AgentError::SigningFailed {
                index,
                reason: e.to_string(),
            })?;

        Signature::from_signed_payload(&signed, payload.len(), index)
    }

    async fn password(&self, descriptor: &ServiceDescriptor) -> Result<String, AgentError> {
        let Some(helper) = &self.password_helper else {
            return Err(AgentError::NoCredential(descriptor.to_string()));
        };

        tracing::debug!("asking {} for {}", helper.display(), descriptor);

        // The helper may prompt on the terminal, so only stdout is captured.
        let output = Command::new(helper)
            .arg(descriptor.to_string())
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit())
            .stdout(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                AgentError::Unavailable(format!(
                    "failed to run password helper {}: {}",
                    helper.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(AgentError::NoCredential(descriptor.to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.lines().next() {
            Some(line) if !line.is_empty() => Ok(line.to_string()),
            _ => Err(AgentError::NoCredential(descriptor.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn password_without_helper_is_no_credential() {
        let agent = SystemAgent::new(None);
        let err = agent
            .password(&ServiceDescriptor::new("host", "user"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::NoCredential(_)));
    }

    #[tokio::test]
    async fn sign_before_listing_fails() {
        let agent = SystemAgent::new(None);
        let err = agent.sign(0, b"payload").await.unwrap_err();
        assert!(matches!(err, AgentError::SigningFailed { index: 0, .. }));
    }
}
