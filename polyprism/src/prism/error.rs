//! Protocol error
use std::{fmt, str::Utf8Error};

/// An error when translating buffer from prism server.
pub enum ProtocolError {
    /// Message ended before a field could be read.
    Truncated {
        requested: usize,
        available: usize,
    },
    /// Unknown discriminant byte.
    UnknownTag {
        what: &'static str,
        tag: u8,
    },
    /// String field is not valid utf8.
    Utf8(Utf8Error),
    /// Bytes left over after a complete message.
    TrailingBytes(usize),
    /// Value nesting exceed [`MAX_DEPTH`][super::value::MAX_DEPTH].
    TooDeep,
    /// Response id does not correlate with the request.
    IdMismatch {
        expect: u64,
        found: u64,
    },
    /// Expected the terminal envelope of a response.
    NotLast {
        id: u64,
    },
    /// Response kind does not answer the request.
    Unexpected {
        expect: &'static str,
        found: &'static str,
    },
}

impl std::error::Error for ProtocolError { }

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { requested, available } => write!(
                f,
                "message truncated, requested {requested} bytes but {available} available"
            ),
            Self::UnknownTag { what, tag } => write!(f, "unknown {what} tag `{tag}`"),
            Self::Utf8(e) => write!(f, "invalid utf8 string: {e}"),
            Self::TrailingBytes(n) => write!(f, "{n} trailing bytes after message"),
            Self::TooDeep => f.write_str("value nesting too deep"),
            Self::IdMismatch { expect, found } => {
                write!(f, "expected response for request `{expect}` found `{found}`")
            }
            Self::NotLast { id } => write!(f, "response for request `{id}` is not terminal"),
            Self::Unexpected { expect, found } => {
                write!(f, "expected response `{expect}` found `{found}`")
            }
        }
    }
}

impl fmt::Debug for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<bytes::TryGetError> for ProtocolError {
    fn from(e: bytes::TryGetError) -> Self {
        Self::Truncated { requested: e.requested, available: e.available }
    }
}

impl ProtocolError {
    pub(crate) fn unknown(what: &'static str, tag: u8) -> ProtocolError {
        Self::UnknownTag { what, tag }
    }

    pub(crate) fn unexpected(expect: &'static str, found: &'static str) -> ProtocolError {
        Self::Unexpected { expect, found }
    }
}
