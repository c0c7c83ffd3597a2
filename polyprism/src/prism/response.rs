//! Prism Response Messages
use bytes::{BufMut, Bytes, BytesMut};

use super::{ProtocolError, StatementId, Wire, WireDocument, WireValue};
use crate::ext::{BufMutExt, BytesExt, UsizeExt};

/// Responses a server can send.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The request failed on the server.
    Error(ErrorResponse),
    Connection(ConnectionResponse),
    Disconnect,
    Commit,
    Rollback,
    /// Answer of an unparameterized execute.
    ///
    /// The acknowledgement carries no result, the terminal envelope does.
    Statement {
        statement_id: StatementId,
        result: Option<StatementResult>,
    },
    PreparedStatementSignature {
        statement_id: StatementId,
    },
    StatementResult(StatementResult),
    Frame(Frame),
    CloseStatement,
}

/// Server reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub message: String,
    /// SQLSTATE, when the server classified the error.
    pub state: Option<String>,
    pub code: Option<i32>,
}

/// Answer to the connection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionResponse {
    pub is_compatible: bool,
    pub major_api_version: i32,
    pub minor_api_version: i32,
}

/// Outcome of an executed statement, rows or an update count.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementResult {
    pub scalar: i64,
    pub frame: Option<Frame>,
}

/// One page of result rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub is_last: bool,
    pub offset: u64,
    pub data: FrameData,
}

/// Rows of a [`Frame`], depending on the data model of the statement.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameData {
    Relational {
        columns: Vec<ColumnMeta>,
        rows: Vec<Vec<WireValue>>,
    },
    Document(Vec<WireDocument>),
    /// Graph results, carried opaquely.
    Graph(Bytes),
}

/// Server reported column metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub label: String,
    pub precision: i32,
    pub scale: i32,
    pub nullable: bool,
}

macro_rules! kinds {
    ($($name:ident = $tag:literal,)*) => {
        impl Response {
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

            /// Name of this message.
            pub fn name(&self) -> &'static str {
                Self::message_name(self.kind())
            }
        }
    };
}

kinds! {
    Error = 0,
    Connection = 1,
    Disconnect = 2,
    Commit = 3,
    Rollback = 4,
    Statement = 5,
    PreparedStatementSignature = 6,
    StatementResult = 7,
    Frame = 8,
    CloseStatement = 9,
}

impl Wire for Response {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.kind());
        match self {
            Self::Error(e) => {
                buf.put_string(&e.message);
                buf.put_option(e.state.as_deref(), |b, s| b.put_string(s));
                buf.put_option(e.code, |b, c| b.put_i32(c));
            }
            Self::Connection(c) => {
                buf.put_flag(c.is_compatible);
                buf.put_i32(c.major_api_version);
                buf.put_i32(c.minor_api_version);
            }
            Self::Disconnect | Self::Commit | Self::Rollback | Self::CloseStatement => {}
            Self::Statement { statement_id, result } => {
                buf.put_i32(statement_id.get());
                buf.put_option(result.as_ref(), |b, r| r.encode(b));
            }
            Self::PreparedStatementSignature { statement_id } => buf.put_i32(statement_id.get()),
            Self::StatementResult(r) => r.encode(buf),
            Self::Frame(f) => f.encode(buf),
        }
    }

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        let response = match buf.read_u8()? {
            0 => Self::Error(ErrorResponse {
                message: buf.read_string()?,
                state: buf.read_option(|b| b.read_string())?,
                code: buf.read_option(|b| b.read_i32())?,
            }),
            1 => Self::Connection(ConnectionResponse {
                is_compatible: buf.read_flag()?,
                major_api_version: buf.read_i32()?,
                minor_api_version: buf.read_i32()?,
            }),
            2 => Self::Disconnect,
            3 => Self::Commit,
            4 => Self::Rollback,
            5 => Self::Statement {
                statement_id: StatementId::new(buf.read_i32()?),
                result: buf.read_option(StatementResult::decode)?,
            },
            6 => Self::PreparedStatementSignature {
                statement_id: StatementId::new(buf.read_i32()?),
            },
            7 => Self::StatementResult(StatementResult::decode(buf)?),
            8 => Self::Frame(Frame::decode(buf)?),
            9 => Self::CloseStatement,
            kind => return Err(ProtocolError::unknown("response", kind)),
        };
        Ok(response)
    }
}

impl Wire for StatementResult {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i64(self.scalar);
        buf.put_option(self.frame.as_ref(), |b, f| f.encode(b));
    }

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            scalar: buf.read_i64()?,
            frame: buf.read_option(Frame::decode)?,
        })
    }
}

impl Wire for Frame {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_flag(self.is_last);
        buf.put_u64(self.offset);
        match &self.data {
            FrameData::Relational { columns, rows } => {
                buf.put_u8(1);
                buf.put_u32(columns.len().to_u32());
                for column in columns {
                    column.encode(buf);
                }
                buf.put_u32(rows.len().to_u32());
                for row in rows {
                    WireValue::List(row.clone()).encode(buf);
                }
            }
            FrameData::Document(documents) => {
                buf.put_u8(2);
                buf.put_u32(documents.len().to_u32());
                for doc in documents {
                    WireValue::Document(doc.clone()).encode(buf);
                }
            }
            FrameData::Graph(raw) => {
                buf.put_u8(3);
                buf.put_blob(raw);
            }
        }
    }

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        let is_last = buf.read_flag()?;
        let offset = buf.read_u64()?;
        let data = match buf.read_u8()? {
            1 => {
                let len = buf.read_u32()?;
                let mut columns = Vec::new();
                for _ in 0..len {
                    columns.push(ColumnMeta::decode(buf)?);
                }
                let len = buf.read_u32()?;
                let mut rows = Vec::new();
                for _ in 0..len {
                    match WireValue::decode(buf)? {
                        WireValue::List(row) => rows.push(row),
                        other => return Err(ProtocolError::unexpected("list", other.kind())),
                    }
                }
                FrameData::Relational { columns, rows }
            }
            2 => {
                let len = buf.read_u32()?;
                let mut documents = Vec::new();
                for _ in 0..len {
                    match WireValue::decode(buf)? {
                        WireValue::Document(doc) => documents.push(doc),
                        other => return Err(ProtocolError::unexpected("document", other.kind())),
                    }
                }
                FrameData::Document(documents)
            }
            3 => FrameData::Graph(buf.read_blob()?),
            kind => return Err(ProtocolError::unknown("frame", kind)),
        };
        Ok(Self { is_last, offset, data })
    }
}

impl Wire for ColumnMeta {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_string(&self.label);
        buf.put_i32(self.precision);
        buf.put_i32(self.scale);
        buf.put_flag(self.nullable);
    }

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Ok(Self {
            label: buf.read_string()?,
            precision: buf.read_i32()?,
            scale: buf.read_i32()?,
            nullable: buf.read_flag()?,
        })
    }
}

impl FrameData {
    /// Number of rows in the frame.
    pub fn len(&self) -> usize {
        match self {
            Self::Relational { rows, .. } => rows.len(),
            Self::Document(docs) => docs.len(),
            Self::Graph(_) => 0,
        }
    }

    /// Returns `true` if the frame carries no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Data model name, for diagnostics.
    pub fn model(&self) -> &'static str {
        match self {
            Self::Relational { .. } => "relational",
            Self::Document(_) => "document",
            Self::Graph(_) => "graph",
        }
    }
}
