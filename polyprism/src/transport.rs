//! The [`Transport`] trait.
use bytes::{Bytes, BytesMut};
use std::{fmt, io};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    Result,
    common::verbose,
    connection::Address,
    net::Socket,
};

/// Receive buffer growth step.
const READ_CHUNK: usize = 64 * 1024;

/// A duplex channel which exchange whole prism messages.
///
/// Exactly one request is in flight at a time, callers never interleave
/// [`send`][Transport::send] and [`recv`][Transport::recv] of different requests.
pub trait Transport: Send {
    /// Send one message.
    fn send(&mut self, payload: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Receive one message.
    fn recv(&mut self) -> impl Future<Output = Result<Bytes>> + Send;

    /// Close the channel, calling it again is a no-op.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Which handshake token a stream expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Plain tcp socket.
    Plain,
    /// Unix domain socket.
    Unix,
}

impl TransportKind {
    /// Version token, including the trailing newline.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Plain => "plain-v1@polypheny.com\n",
            Self::Unix => "unix-v1@polypheny.com\n",
        }
    }
}

/// Length prefixed message stream over any async byte stream.
///
/// ```text
/// ┏━━━━━━━━━━━━━━━━━━━━━━━━━━┳━━━━━━━━━┓
/// ┃          Length          ┃ Payload ┃
/// ┣━━━━━━━━━━━━━━━━━━━━━━━━━━╋━━━━━━━━━┫
/// ┃          u64 LE          ┃  [u8]   ┃
/// ┗━━━━━━━━━━━━━━━━━━━━━━━━━━┻━━━━━━━━━┛
/// ```
pub struct Stream<S = Socket> {
    io: Option<S>,
    kind: TransportKind,
}

impl Stream<Socket> {
    /// Connect to `address` and perform the version handshake.
    pub async fn connect(address: &Address) -> Result<Self> {
        let (socket, kind) = match address {
            Address::Tcp { host, port } => {
                (Socket::connect_tcp(host, *port).await?, TransportKind::Plain)
            }
            Address::Unix(path) => (Socket::connect_unix(path).await?, TransportKind::Unix),
        };
        Stream::handshake(socket, kind).await
    }
}

impl<S> Stream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Read the server version token, verify it, then echo it back.
    pub async fn handshake(mut io: S, kind: TransportKind) -> Result<Self> {
        let len = io.read_u8().await?;
        if len > 127 {
            return Err(HandshakeError::TooLong(len).into());
        }

        let mut token = vec![0u8; len as usize];
        io.read_exact(&mut token).await?;
        check_token(&token, kind)?;

        verbose!(token = kind.token().trim_end(), "handshake");

        io.write_u8(len).await?;
        io.write_all(&token).await?;
        io.flush().await?;

        Ok(Self { io: Some(io), kind })
    }

    /// Returns the handshake kind of this stream.
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Returns `true` if [`close`][Transport::close] was called.
    pub fn is_closed(&self) -> bool {
        self.io.is_none()
    }

    fn io(&mut self) -> io::Result<&mut S> {
        self.io
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "transport is closed"))
    }
}

impl<S> Transport for Stream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, payload: &[u8]) -> Result<()> {
        let io = self.io()?;
        io.write_u64_le(payload.len() as u64).await?;
        io.write_all(payload).await?;
        io.flush().await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Bytes> {
        let io = self.io()?;
        let len = io.read_u64_le().await?;
        let expect = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "message length overflow"))?;

        // the prefix is peer controlled, grow only as bytes arrive
        let mut buf = BytesMut::with_capacity(expect.min(READ_CHUNK));
        let mut body = io.take(len);
        while buf.len() < expect {
            buf.reserve((expect - buf.len()).min(READ_CHUNK));
            if body.read_buf(&mut buf).await? == 0 {
                let err = io::Error::new(io::ErrorKind::UnexpectedEof, "message truncated");
                return Err(err.into());
            }
        }
        Ok(buf.freeze())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut io) = self.io.take() {
            io.shutdown().await?;
        }
        Ok(())
    }
}

impl<S> fmt::Debug for Stream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("kind", &self.kind)
            .field("closed", &self.io.is_none())
            .finish()
    }
}

/// Verify a received version token against the expected one.
pub fn check_token(token: &[u8], kind: TransportKind) -> Result<(), HandshakeError> {
    if token.last() != Some(&b'\n') {
        return Err(HandshakeError::MissingTerminator);
    }
    if token != kind.token().as_bytes() {
        return Err(HandshakeError::Mismatch {
            expect: kind.token(),
            found: String::from_utf8_lossy(token).into_owned(),
        });
    }
    Ok(())
}

/// Version handshake failure.
pub enum HandshakeError {
    /// Token length byte exceed 127.
    TooLong(u8),
    /// Token does not end with a newline.
    MissingTerminator,
    /// Server speaks another transport version.
    Mismatch {
        expect: &'static str,
        found: String,
    },
}

impl std::error::Error for HandshakeError { }

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong(len) => write!(f, "handshake token too long ({len} bytes)"),
            Self::MissingTerminator => f.write_str("handshake token is not newline terminated"),
            Self::Mismatch { expect, found } => write!(
                f,
                "unsupported transport version, expected {:?} found {:?}",
                expect.trim_end(),
                found.trim_end(),
            ),
        }
    }
}

impl fmt::Debug for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
