//! Async stream abstraction for tokio.

use std::pin::Pin;

use bytes::Bytes;
use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

use crate::error::Result;
use crate::protocol::codec::{HEADER_LEN, frame_payload_len, split_frame};

/// Any byte transport a connection can run over.
pub trait Io: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Io for T {}

pub enum Stream {
    Tcp(BufReader<TcpStream>),
    #[cfg(unix)]
    Unix(BufReader<UnixStream>),
    Io(BufReader<Box<dyn Io>>),
}

impl Stream {
    pub fn tcp(stream: TcpStream) -> Self {
        Self::Tcp(BufReader::new(stream))
    }

    #[cfg(unix)]
    pub fn unix(stream: UnixStream) -> Self {
        Self::Unix(BufReader::new(stream))
    }

    pub fn io(stream: impl Io + 'static) -> Self {
        Self::Io(BufReader::new(Box::new(stream)))
    }

    pub async fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.read_exact(buf).await.map(|_| ()),
            #[cfg(unix)]
            Stream::Unix(r) => r.read_exact(buf).await.map(|_| ()),
            Stream::Io(r) => r.read_exact(buf).await.map(|_| ()),
        }
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.get_mut().write_all(buf).await,
            #[cfg(unix)]
            Stream::Unix(r) => r.get_mut().write_all(buf).await,
            Stream::Io(r) => r.get_mut().write_all(buf).await,
        }
    }

    pub async fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.get_mut().flush().await,
            #[cfg(unix)]
            Stream::Unix(r) => r.get_mut().flush().await,
            Stream::Io(r) => r.get_mut().flush().await,
        }
    }

    pub async fn shutdown(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Tcp(r) => r.get_mut().shutdown().await,
            #[cfg(unix)]
            Stream::Unix(r) => r.get_mut().shutdown().await,
            Stream::Io(r) => r.get_mut().shutdown().await,
        }
    }

    /// Bytes already read from the transport and not yet consumed.
    fn buffer(&self) -> &[u8] {
        match self {
            Stream::Tcp(r) => r.buffer(),
            #[cfg(unix)]
            Stream::Unix(r) => r.buffer(),
            Stream::Io(r) => r.buffer(),
        }
    }

    fn consume(&mut self, amount: usize) {
        match self {
            Stream::Tcp(r) => Pin::new(r).consume(amount),
            #[cfg(unix)]
            Stream::Unix(r) => Pin::new(r).consume(amount),
            Stream::Io(r) => Pin::new(r).consume(amount),
        }
    }

    /// Read one framed message, returning its tag and payload.
    ///
    /// The length field is checked before anything is allocated for the
    /// payload.
    pub async fn read_frame(&mut self) -> Result<(u8, Bytes)> {
        if let Some((tag, payload, _)) = split_frame(self.buffer())? {
            let payload = Bytes::copy_from_slice(payload);
            self.consume(HEADER_LEN + payload.len());
            return Ok((tag, payload));
        }

        let mut header = [0u8; HEADER_LEN];
        self.read_exact(&mut header).await?;
        let tag = header[0];
        let len = frame_payload_len(&header[1..])?;

        let mut payload = vec![0u8; len];
        self.read_exact(&mut payload).await?;
        Ok((tag, Bytes::from(payload)))
    }
}
