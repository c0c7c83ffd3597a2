//! `polyprism` error types.
use std::{backtrace::Backtrace, borrow::Cow, fmt, io};

use crate::{
    codec::{EncodeError, MalformedValue},
    connection::{Incompatible, ParseError},
    prism::{ErrorResponse, ProtocolError},
    row::DecodeError,
    transport::HandshakeError,
};

/// A specialized [`Result`] type for `polyprism` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from `polyprism` library.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Prefix the error message with `context`.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Returns the database api error category.
    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    /// Returns the SQLSTATE when the server reported one.
    pub fn sqlstate(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::Server(e) => e.state.as_deref(),
            _ => None,
        }
    }
}

/// All possible error kind from `polyprism` library.
pub enum ErrorKind {
    Config(ParseError),
    /// Transport failure, including unexpected end of stream.
    Io(io::Error),
    Handshake(HandshakeError),
    Protocol(ProtocolError),
    /// The server answered with an error response.
    Server(ServerError),
    Incompatible(Incompatible),
    Usage(UsageError),
    Encode(EncodeError),
    Malformed(MalformedValue),
    Decode(DecodeError),
    NotSupported(NotSupported),
}

/// Error categories of the database api, PEP 249.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Interface,
    Programming,
    Operational,
    Data,
    Integrity,
    Internal,
    NotSupported,
}

impl ErrorKind {
    /// Returns the database api error category.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_)
            | Self::Io(_)
            | Self::Handshake(_)
            | Self::Protocol(_)
            | Self::Incompatible(_)
            | Self::Malformed(_) => ErrorClass::Interface,
            Self::Usage(_) | Self::Decode(_) => ErrorClass::Programming,
            Self::Encode(_) => ErrorClass::Data,
            Self::Server(e) => e.class(),
            Self::NotSupported(_) => ErrorClass::NotSupported,
        }
    }
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = std::backtrace::Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<ParseError>e => ErrorKind::Config(e));
from!(<io::Error>e => ErrorKind::Io(e));
from!(<HandshakeError>e => ErrorKind::Handshake(e));
from!(<ProtocolError>e => ErrorKind::Protocol(e));
from!(<ServerError>e => ErrorKind::Server(e));
from!(<ErrorResponse>e => ErrorKind::Server(e.into()));
from!(<Incompatible>e => ErrorKind::Incompatible(e));
from!(<UsageError>e => ErrorKind::Usage(e));
from!(<EncodeError>e => ErrorKind::Encode(e));
from!(<MalformedValue>e => ErrorKind::Malformed(e));
from!(<DecodeError>e => ErrorKind::Decode(e));
from!(<NotSupported>e => ErrorKind::NotSupported(e));

impl std::error::Error for Error { }

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::Io(e) => e.fmt(f),
            Self::Handshake(e) => e.fmt(f),
            Self::Protocol(e) => e.fmt(f),
            Self::Server(e) => e.fmt(f),
            Self::Incompatible(e) => e.fmt(f),
            Self::Usage(e) => e.fmt(f),
            Self::Encode(e) => e.fmt(f),
            Self::Malformed(e) => e.fmt(f),
            Self::Decode(e) => e.fmt(f),
            Self::NotSupported(e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Error reported by the prism server.
///
/// The connection stays usable after a server error.
pub struct ServerError {
    pub message: String,
    /// Five character SQLSTATE, when present.
    pub state: Option<String>,
    /// Vendor error code, when present.
    pub code: Option<i32>,
}

impl ServerError {
    /// Classify by the two character SQLSTATE class.
    pub fn class(&self) -> ErrorClass {
        match self.state.as_deref().and_then(|s| s.get(..2)) {
            Some("22") => ErrorClass::Data,
            Some("23") => ErrorClass::Integrity,
            Some("XX") => ErrorClass::Internal,
            Some("0A") => ErrorClass::NotSupported,
            _ => ErrorClass::Operational,
        }
    }
}

impl From<ErrorResponse> for ServerError {
    fn from(e: ErrorResponse) -> Self {
        Self { message: e.message, state: e.state, code: e.code }
    }
}

impl std::error::Error for ServerError { }

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            Some(state) => write!(f, "[{state}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl fmt::Debug for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Misuse of connection or cursor.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum UsageError {
    /// The connection was closed.
    ConnectionClosed,
    /// The cursor was closed, or its connection was.
    CursorClosed,
    /// Fetch before any statement was executed.
    NotExecuted,
    /// Fetch after a statement that produced no result set.
    NoResultSet,
}

impl std::error::Error for UsageError { }

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ConnectionClosed => "connection is closed",
            Self::CursorClosed => "cursor is closed",
            Self::NotExecuted => "no statement was executed",
            Self::NoResultSet => "previous statement did not produce a result set",
        })
    }
}

impl fmt::Debug for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Feature the client does not implement.
pub struct NotSupported {
    what: Cow<'static, str>,
}

impl NotSupported {
    pub(crate) fn new(what: impl Into<Cow<'static, str>>) -> Self {
        Self { what: what.into() }
    }
}

impl std::error::Error for NotSupported { }

impl fmt::Display for NotSupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is not supported", self.what)
    }
}

impl fmt::Debug for NotSupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
