// ABOUTME: Output filtering for remote stdout and stderr.
// ABOUTME: Strips carriage returns before bytes reach the local terminal.

use tokio::io::{AsyncWrite, AsyncWriteExt};

const CR: u8 = b'\r';

/// Copy of `input` with every `\r` byte removed.
///
/// Purely byte based: a `\r` that is not part of `\r\n` is dropped as well.
pub fn strip_carriage_returns(input: &[u8]) -> Vec<u8> {
    input.iter().copied().filter(|&b| b != CR).collect()
}

/// Writer adapter that drops `\r` bytes and flushes after every write.
#[derive(Debug)]
pub struct CrStripper<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> CrStripper<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write `data` without carriage returns, then flush.
    ///
    /// Returns the length of `data`, dropped bytes included.
    pub async fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        if data.contains(&CR) {
            self.inner.write_all(&strip_carriage_returns(data)).await?;
        } else {
            self.inner.write_all(data).await?;
        }
        self.inner.flush().await?;
        Ok(data.len())
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Destination for one remote output stream.
#[derive(Debug)]
pub enum RemoteSink<W> {
    /// Bytes go to the local stream unchanged.
    Direct(W),
    /// Bytes go through a [`CrStripper`].
    Stripped(CrStripper<W>),
}

impl<W: AsyncWrite + Unpin> RemoteSink<W> {
    pub fn new(inner: W, strip_carriage_returns: bool) -> Self {
        if strip_carriage_returns {
            RemoteSink::Stripped(CrStripper::new(inner))
        } else {
            RemoteSink::Direct(inner)
        }
    }

    /// Forward one chunk of remote output and flush it.
    pub async fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        match self {
            RemoteSink::Direct(inner) => {
                inner.write_all(data).await?;
                inner.flush().await
            }
            RemoteSink::Stripped(stripper) => stripper.write(data).await.map(|_| ()),
        }
    }

    pub fn into_inner(self) -> W {
        match self {
            RemoteSink::Direct(inner) => inner,
            RemoteSink::Stripped(stripper) => stripper.into_inner(),
        }
    }
}
