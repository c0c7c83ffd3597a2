//! Prism Request and Response Protocol
//!
//! ## Handshake
//!
//! Immediately after the stream is connected, the server sends its version token,
//! a one byte length followed by an ascii token terminated by newline. The client
//! verifies it and echoes the same bytes back.
//!
//! ```text
//! ┏━━━━━┳━━━━━━━━━━━━━━━━━━━━━━━━━━┓
//! ┃ Len ┃          Token           ┃
//! ┣━━━━━╋━━━━━━━━━━━━━━━━━━━━━━━━━━┫
//! ┃  u8 ┃ ascii, ends with `\n`    ┃
//! ┗━━━━━┻━━━━━━━━━━━━━━━━━━━━━━━━━━┛
//! ```
//!
//! ## Messaging Overview
//!
//! All further communication is through a stream of length prefixed messages.
//! The length is little-endian and does not include itself.
//!
//! ```text
//! ┏━━━━━━━━━━━━━━━━━━━━━━━━━━┳━━━━━━━━━━┓
//! ┃          Length          ┃ Envelope ┃
//! ┣━━━━━━━━━━━━━━━━━━━━━━━━━━╋━━━━━━━━━━┫
//! ┃          u64 LE          ┃   [u8]   ┃
//! ┗━━━━━━━━━━━━━━━━━━━━━━━━━━┻━━━━━━━━━━┛
//! ```
//!
//! Each payload is an [`Envelope`] carrying a request id, a `last` flag, and a
//! [`Request`] or [`Response`]. Fields inside the envelope are big-endian;
//! strings and blobs are prefixed with their `u32` length, optional fields with a
//! presence byte.

mod error;

pub mod value;
pub mod request;
pub mod response;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::ext::BytesExt;

pub use error::ProtocolError;
pub use value::{WireDecimal, WireDocument, WireInterval, WireValue};
pub use request::Request;
pub use response::{
    ColumnMeta, ConnectionResponse, ErrorResponse, Frame, FrameData, Response, StatementResult,
};

/// Major version of the prism api this client speaks.
pub const API_MAJOR: i32 = 2;

/// Minor version of the prism api this client speaks.
pub const API_MINOR: i32 = 0;

/// A type with a fixed byte layout in a prism message.
pub trait Wire: Sized {
    /// Append the encoded form to `buf`.
    fn encode(&self, buf: &mut BytesMut);

    /// Read one value from the front of `buf`.
    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError>;

    /// Encode into a fresh buffer.
    fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decode a complete message, rejecting trailing bytes.
    fn from_bytes(mut bytes: Bytes) -> Result<Self, ProtocolError> {
        let me = Self::decode(&mut bytes)?;
        match bytes.remaining() {
            0 => Ok(me),
            n => Err(ProtocolError::TrailingBytes(n)),
        }
    }
}

/// Outer message structure of every request and response.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<P> {
    /// Correlates a response with its request.
    pub id: u64,
    /// Marks the terminal envelope of a response.
    pub last: bool,
    pub payload: P,
}

impl<P> Envelope<P> {
    pub fn new(id: u64, payload: P) -> Self {
        Self { id, last: true, payload }
    }
}

impl<P: Wire> Wire for Envelope<P> {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u64(self.id);
        buf.put_u8(self.last as u8);
        self.payload.encode(buf);
    }

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: buf.read_u64()?,
            last: buf.read_flag()?,
            payload: P::decode(buf)?,
        })
    }
}

/// Server assigned statement handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementId(i32);

impl StatementId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for StatementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::fmt::Debug for StatementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StatementId").field(&self.0).finish()
    }
}
