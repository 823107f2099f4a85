// ABOUTME: Signature values produced by the credential agent.
// ABOUTME: Converts between the format-tagged signature and its SSH wire blob.

use super::AgentError;

/// A signature tagged with its format, e.g. `rsa-sha2-256` or `ssh-ed25519`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub format: String,
    pub bytes: Vec<u8>,
}

impl Signature {
    pub fn new(format: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            format: format.into(),
            bytes: bytes.into(),
        }
    }

    /// SSH signature blob: `string format || string bytes`.
    pub fn to_blob(&self) -> Vec<u8> {
        let mut blob = Vec::with_capacity(8 + self.format.len() + self.bytes.len());
        put_string(&mut blob, self.format.as_bytes());
        put_string(&mut blob, &self.bytes);
        blob
    }

    /// The blob wrapped as an SSH string, as it follows a signed payload.
    pub fn to_wire_string(&self) -> Vec<u8> {
        let blob = self.to_blob();
        let mut out = Vec::with_capacity(4 + blob.len());
        put_string(&mut out, &blob);
        out
    }

    /// Parse an SSH signature blob.
    pub fn from_blob(blob: &[u8]) -> Option<Self> {
        let (format, rest) = take_string(blob)?;
        let (bytes, _) = take_string(rest)?;
        let format = std::str::from_utf8(format).ok()?;
        Some(Self::new(format, bytes))
    }

    /// Parse the agent's reply for identity `index`, shaped `payload || string blob`.
    pub(crate) fn from_signed_payload(
        signed: &[u8],
        payload_len: usize,
        index: usize,
    ) -> Result<Self, AgentError> {
        signed
            .get(payload_len..)
            .and_then(take_string)
            .and_then(|(blob, _)| Self::from_blob(blob))
            .ok_or_else(|| AgentError::SigningFailed {
                index,
                reason: "malformed signature from agent".to_string(),
            })
    }
}

fn put_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

/// Split a length-prefixed string off the front of `input`.
fn take_string(input: &[u8]) -> Option<(&[u8], &[u8])> {
    let (len, rest) = input.split_first_chunk::<4>()?;
    let len = u32::from_be_bytes(*len) as usize;
    if rest.len() < len {
        return None;
    }
    Some(rest.split_at(len))
}
