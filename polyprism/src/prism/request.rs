//! Prism Request Messages
use bytes::{BufMut, Bytes, BytesMut};

use super::{ProtocolError, StatementId, Wire, WireValue};
use crate::ext::{BufMutExt, BytesExt, UsizeExt};

/// Requests a client can send.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Authenticate and negotiate api version.
    Connection {
        username: Option<String>,
        password: Option<String>,
        major_api_version: i32,
        minor_api_version: i32,
        /// Always `false` for this client.
        auto_commit: bool,
    },
    Disconnect,
    Commit,
    Rollback,
    /// Answered by two envelopes, an acknowledgement and the result.
    ExecuteUnparameterized {
        language: String,
        statement: String,
        fetch_size: Option<i32>,
        namespace: Option<String>,
    },
    PrepareIndexed {
        language: String,
        statement: String,
        namespace: Option<String>,
    },
    ExecuteIndexed {
        statement_id: StatementId,
        parameters: Vec<WireValue>,
        fetch_size: Option<i32>,
    },
    PrepareNamed {
        language: String,
        statement: String,
        namespace: Option<String>,
    },
    ExecuteNamed {
        statement_id: StatementId,
        parameters: Vec<(String, WireValue)>,
        fetch_size: Option<i32>,
    },
    Fetch {
        statement_id: StatementId,
        fetch_size: Option<i32>,
    },
    CloseStatement {
        statement_id: StatementId,
    },
}

macro_rules! kinds {
    ($($name:ident = $tag:literal,)*) => {
        impl Request {
            /// Message kind byte.
            pub fn kind(&self) -> u8 {
                match self {
                    $(Self::$name { .. } => $tag,)*
                }
            }

            /// Get message name from kind byte.
            ///
            /// Returns `"Unknown"` for unknown kind.
            pub fn message_name(kind: u8) -> &'static str {
                match kind {
                    $($tag => stringify!($name),)*
                    _ => "Unknown",
                }
            }
        }
    };
}

kinds! {
    Connection = 1,
    Disconnect = 2,
    Commit = 3,
    Rollback = 4,
    ExecuteUnparameterized = 5,
    PrepareIndexed = 6,
    ExecuteIndexed = 7,
    PrepareNamed = 8,
    ExecuteNamed = 9,
    Fetch = 10,
    CloseStatement = 11,
}

fn put_prepare(buf: &mut BytesMut, language: &str, statement: &str, namespace: Option<&str>) {
    buf.put_string(language);
    buf.put_string(statement);
    buf.put_option(namespace, |b, n| b.put_string(n));
}

fn put_fetch_size(buf: &mut BytesMut, fetch_size: Option<i32>) {
    buf.put_option(fetch_size, |b, n| b.put_i32(n));
}

fn read_statement_id(buf: &mut Bytes) -> Result<StatementId, ProtocolError> {
    buf.read_i32().map(StatementId::new)
}

impl Wire for Request {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.kind());
        match self {
            Self::Connection {
                username,
                password,
                major_api_version,
                minor_api_version,
                auto_commit,
            } => {
                buf.put_option(username.as_deref(), |b, u| b.put_string(u));
                buf.put_option(password.as_deref(), |b, p| b.put_string(p));
                buf.put_i32(*major_api_version);
                buf.put_i32(*minor_api_version);
                buf.put_flag(*auto_commit);
            }
            Self::Disconnect | Self::Commit | Self::Rollback => {}
            Self::ExecuteUnparameterized { language, statement, fetch_size, namespace } => {
                put_prepare(buf, language, statement, namespace.as_deref());
                put_fetch_size(buf, *fetch_size);
            }
            Self::PrepareIndexed { language, statement, namespace }
            | Self::PrepareNamed { language, statement, namespace } => {
                put_prepare(buf, language, statement, namespace.as_deref());
            }
            Self::ExecuteIndexed { statement_id, parameters, fetch_size } => {
                buf.put_i32(statement_id.get());
                buf.put_u32(parameters.len().to_u32());
                for param in parameters {
                    param.encode(buf);
                }
                put_fetch_size(buf, *fetch_size);
            }
            Self::ExecuteNamed { statement_id, parameters, fetch_size } => {
                buf.put_i32(statement_id.get());
                buf.put_u32(parameters.len().to_u32());
                for (name, param) in parameters {
                    buf.put_string(name);
                    param.encode(buf);
                }
                put_fetch_size(buf, *fetch_size);
            }
            Self::Fetch { statement_id, fetch_size } => {
                buf.put_i32(statement_id.get());
                put_fetch_size(buf, *fetch_size);
            }
            Self::CloseStatement { statement_id } => buf.put_i32(statement_id.get()),
        }
    }

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        let request = match buf.read_u8()? {
            1 => Self::Connection {
                username: buf.read_option(|b| b.read_string())?,
                password: buf.read_option(|b| b.read_string())?,
                major_api_version: buf.read_i32()?,
                minor_api_version: buf.read_i32()?,
                auto_commit: buf.read_flag()?,
            },
            2 => Self::Disconnect,
            3 => Self::Commit,
            4 => Self::Rollback,
            5 => Self::ExecuteUnparameterized {
                language: buf.read_string()?,
                statement: buf.read_string()?,
                namespace: buf.read_option(|b| b.read_string())?,
                fetch_size: buf.read_option(|b| b.read_i32())?,
            },
            6 => Self::PrepareIndexed {
                language: buf.read_string()?,
                statement: buf.read_string()?,
                namespace: buf.read_option(|b| b.read_string())?,
            },
            7 => {
                let statement_id = read_statement_id(buf)?;
                let len = buf.read_u32()?;
                let mut parameters = Vec::new();
                for _ in 0..len {
                    parameters.push(WireValue::decode(buf)?);
                }
                Self::ExecuteIndexed {
                    statement_id,
                    parameters,
                    fetch_size: buf.read_option(|b| b.read_i32())?,
                }
            }
            8 => Self::PrepareNamed {
                language: buf.read_string()?,
                statement: buf.read_string()?,
                namespace: buf.read_option(|b| b.read_string())?,
            },
            9 => {
                let statement_id = read_statement_id(buf)?;
                let len = buf.read_u32()?;
                let mut parameters = Vec::new();
                for _ in 0..len {
                    let name = buf.read_string()?;
                    parameters.push((name, WireValue::decode(buf)?));
                }
                Self::ExecuteNamed {
                    statement_id,
                    parameters,
                    fetch_size: buf.read_option(|b| b.read_i32())?,
                }
            }
            10 => Self::Fetch {
                statement_id: read_statement_id(buf)?,
                fetch_size: buf.read_option(|b| b.read_i32())?,
            },
            11 => Self::CloseStatement {
                statement_id: read_statement_id(buf)?,
            },
            kind => return Err(ProtocolError::unknown("request", kind)),
        };
        Ok(request)
    }
}
