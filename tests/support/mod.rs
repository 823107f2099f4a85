// ABOUTME: Test support utilities.
// ABOUTME: Scripted agent, auth transport, channel and geometry doubles.

use async_trait::async_trait;
use russh::keys::ssh_key::PublicKey;
use russh::keys::ssh_key::public::{Ed25519PublicKey, KeyData};
use scpu::agent::{AgentError, CredentialAgent, Identity, ServiceDescriptor, Signature};
use scpu::auth::{AuthTransport, IdentitySigner};
use scpu::session::{ChannelEvent, SessionError, ShellChannel};
use scpu::terminal::{GeometrySource, PtyRequest, TerminalGeometry};
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Once};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::time::Instant;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("scpu=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Distinct Ed25519 public key per seed.
#[allow(dead_code)]
pub fn test_key(seed: u8) -> PublicKey {
    PublicKey::new(KeyData::Ed25519(Ed25519PublicKey([seed; 32])), "test")
}

// =============================================================================
// Credential agent
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum AgentCall {
    List,
    Sign(usize),
    Password(String),
}

/// Agent with a fixed key list and optional stored password.
#[allow(dead_code)]
pub struct MockAgent {
    /// `None` means the agent cannot be reached.
    keys: Option<Vec<PublicKey>>,
    password: Option<String>,
    calls: Arc<Mutex<Vec<AgentCall>>>,
}

#[allow(dead_code)]
impl MockAgent {
    pub fn with_keys(count: u8) -> Self {
        Self {
            keys: Some((0..count).map(test_key).collect()),
            password: None,
            calls: Arc::default(),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            keys: None,
            password: None,
            calls: Arc::default(),
        }
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<AgentCall>>> {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: AgentCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CredentialAgent for MockAgent {
    async fn list_identities(&self) -> Result<Vec<Identity>, AgentError> {
        self.record(AgentCall::List);
        let keys = self
            .keys
            .as_ref()
            .ok_or_else(|| AgentError::Unavailable("no agent in tests".to_string()))?;
        Ok(keys
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, k)| Identity::new(i, k))
            .collect())
    }

    async fn sign(&self, index: usize, payload: &[u8]) -> Result<Signature, AgentError> {
        self.record(AgentCall::Sign(index));
        match &self.keys {
            Some(keys) if index < keys.len() => {
                Ok(Signature::new("ssh-ed25519", payload.to_vec()))
            }
            _ => Err(AgentError::SigningFailed {
                index,
                reason: "unknown identity".to_string(),
            }),
        }
    }

    async fn password(&self, descriptor: &ServiceDescriptor) -> Result<String, AgentError> {
        self.record(AgentCall::Password(descriptor.to_string()));
        self.password
            .clone()
            .ok_or_else(|| AgentError::NoCredential(descriptor.to_string()))
    }
}

// =============================================================================
// Auth transport
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Offer {
    PublicKey(usize),
    Password(String),
}

/// Server side of authentication that accepts configured credentials.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockTransport {
    /// Challenge offered keys, making the signer run.
    pub challenge_keys: bool,
    pub accept_key: Option<usize>,
    pub accept_password: Option<String>,
    pub offers: Vec<Offer>,
}

#[async_trait(?Send)]
impl AuthTransport for MockTransport {
    async fn offer_public_key(
        &mut self,
        _user: &str,
        identity: &Identity,
        signer: &mut IdentitySigner,
    ) -> scpu::ssh::Result<bool> {
        self.offers.push(Offer::PublicKey(identity.index()));
        if !self.challenge_keys {
            return Ok(false);
        }
        if signer.sign(b"session-id").await.is_err() {
            return Ok(false);
        }
        Ok(self.accept_key == Some(identity.index()))
    }

    async fn offer_password(&mut self, _user: &str, password: &str) -> scpu::ssh::Result<bool> {
        self.offers.push(Offer::Password(password.to_string()));
        Ok(self.accept_password.as_deref() == Some(password))
    }
}

// =============================================================================
// Session channel
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum ChannelCall {
    RequestPty(PtyRequest),
    Shell,
    Exec(String),
    Resize(TerminalGeometry),
}

/// What the remote side received on its standard input.
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct RemoteInput {
    pub bytes: Vec<u8>,
    pub eof: bool,
}

#[allow(dead_code)]
struct RecordingWriter(Arc<Mutex<RemoteInput>>);

impl AsyncWrite for RecordingWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.0.lock().unwrap().bytes.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.0.lock().unwrap().eof = true;
        Poll::Ready(Ok(()))
    }
}

/// Channel that replays scripted events, each after its delay.
#[allow(dead_code)]
pub struct MockChannel {
    pub pty_accepted: bool,
    events: VecDeque<(Duration, ChannelEvent)>,
    current: Option<(Instant, ChannelEvent)>,
    calls: Arc<Mutex<Vec<ChannelCall>>>,
    input: Arc<Mutex<RemoteInput>>,
}

#[allow(dead_code)]
impl MockChannel {
    pub fn new() -> Self {
        Self {
            pty_accepted: true,
            events: VecDeque::new(),
            current: None,
            calls: Arc::default(),
            input: Arc::default(),
        }
    }

    pub fn reject_pty(mut self) -> Self {
        self.pty_accepted = false;
        self
    }

    pub fn event(self, event: ChannelEvent) -> Self {
        self.event_after(Duration::ZERO, event)
    }

    pub fn event_after(mut self, delay: Duration, event: ChannelEvent) -> Self {
        self.events.push_back((delay, event));
        self
    }

    /// Normal end of the remote process with `status`.
    pub fn exits_with(self, status: u32) -> Self {
        self.event(ChannelEvent::ExitStatus(status))
            .event(ChannelEvent::Eof)
            .event(ChannelEvent::Closed)
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<ChannelCall>>> {
        Arc::clone(&self.calls)
    }

    pub fn input(&self) -> Arc<Mutex<RemoteInput>> {
        Arc::clone(&self.input)
    }

    fn record(&self, call: ChannelCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ShellChannel for MockChannel {
    async fn request_terminal(&mut self, request: &PtyRequest) -> Result<(), SessionError> {
        self.record(ChannelCall::RequestPty(request.clone()));
        if self.pty_accepted {
            Ok(())
        } else {
            Err(SessionError::PtyRejected)
        }
    }

    async fn start_shell(&mut self) -> Result<(), SessionError> {
        self.record(ChannelCall::Shell);
        Ok(())
    }

    async fn start_command(&mut self, command: &str) -> Result<(), SessionError> {
        self.record(ChannelCall::Exec(command.to_string()));
        Ok(())
    }

    async fn resize(&mut self, geometry: TerminalGeometry) -> Result<(), SessionError> {
        self.record(ChannelCall::Resize(geometry));
        Ok(())
    }

    fn input_writer(&mut self) -> Pin<Box<dyn AsyncWrite + Send>> {
        Box::pin(RecordingWriter(Arc::clone(&self.input)))
    }

    // Cancel safe: the relay drops this future whenever a resize arrives.
    async fn next_event(&mut self) -> Option<ChannelEvent> {
        if self.current.is_none() {
            let (delay, event) = self.events.pop_front()?;
            self.current = Some((Instant::now() + delay, event));
        }
        if let Some((deadline, _)) = &self.current {
            tokio::time::sleep_until(*deadline).await;
        }
        self.current.take().map(|(_, event)| event)
    }
}

// =============================================================================
// Terminal geometry
// =============================================================================

/// Reports scripted sizes in order, then repeats the last one.
#[allow(dead_code)]
pub struct ScriptedGeometry {
    sizes: Mutex<VecDeque<TerminalGeometry>>,
    last: Mutex<Option<TerminalGeometry>>,
}

#[allow(dead_code)]
impl ScriptedGeometry {
    pub fn new(sizes: &[(u32, u32)]) -> Self {
        Self {
            sizes: Mutex::new(
                sizes
                    .iter()
                    .map(|&(c, r)| TerminalGeometry::new(c, r))
                    .collect(),
            ),
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl GeometrySource for ScriptedGeometry {
    async fn geometry(&self) -> Option<TerminalGeometry> {
        let next = self.sizes.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if next.is_some() {
            *last = next;
        }
        *last
    }
}
