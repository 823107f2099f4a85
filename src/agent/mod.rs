// ABOUTME: Interface to the external credential agent.
// ABOUTME: Lists signing identities, signs payloads by identity index, and looks up passwords.

mod signature;
mod system;

pub use signature::Signature;
pub use system::SystemAgent;

use async_trait::async_trait;
use russh::keys::ssh_key::{HashAlg, PublicKey};
use std::fmt;
use thiserror::Error;

/// Failures talking to the credential agent.
///
/// None of these are fatal to the program: the affected authentication
/// method is skipped and the next one is tried.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("credential agent unavailable: {0}")]
    Unavailable(String),

    #[error("agent refused to sign with identity {index}: {reason}")]
    SigningFailed { index: usize, reason: String },

    #[error("no stored credential for '{0}'")]
    NoCredential(String),
}

/// A public key held by the agent, addressed by its position in the listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    index: usize,
    public_key: PublicKey,
}

impl Identity {
    pub fn new(index: usize, public_key: PublicKey) -> Self {
        Self { index, public_key }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Key format, e.g. `ssh-ed25519` or `ssh-rsa`.
    pub fn format(&self) -> String {
        self.public_key.algorithm().to_string()
    }

    pub fn fingerprint(&self) -> String {
        self.public_key.fingerprint(HashAlg::Sha256).to_string()
    }

    /// Digest used when signing with this identity.
    ///
    /// RSA keys always sign with SHA-256 (`rsa-sha2-256`); other key types
    /// carry their own digest.
    pub fn hash_alg(&self) -> Option<HashAlg> {
        signing_hash(&self.public_key)
    }
}

pub(crate) fn signing_hash(key: &PublicKey) -> Option<HashAlg> {
    if key.algorithm().is_rsa() {
        Some(HashAlg::Sha256)
    } else {
        None
    }
}

/// Lookup key for a stored password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub server: String,
    pub user: String,
}

impl ServiceDescriptor {
    pub fn new(server: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            user: user.into(),
        }
    }
}

impl fmt::Display for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "proto=pass service=ssh role=client server={} user={}",
            self.server, self.user
        )
    }
}

/// Out-of-process agent holding keys and stored passwords.
#[async_trait]
pub trait CredentialAgent: Send + Sync {
    /// Enumerate the signing identities, freshly on every call.
    async fn list_identities(&self) -> Result<Vec<Identity>, AgentError>;

    /// Sign `payload` with the identity at `index` of the latest listing.
    async fn sign(&self, index: usize, payload: &[u8]) -> Result<Signature, AgentError>;

    /// Retrieve the stored password for `descriptor`.
    async fn password(&self, descriptor: &ServiceDescriptor) -> Result<String, AgentError>;
}
