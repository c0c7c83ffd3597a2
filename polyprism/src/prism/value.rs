//! Prism value union.
//!
//! Every value on the wire is a tag byte followed by the body of exactly one arm.
//!
//! ```text
//! ┏━━━━━┳━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┓
//! ┃ Tag ┃ Body                                ┃
//! ┣━━━━━╋━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┫
//! ┃  u8 ┃ depends on tag, empty for null      ┃
//! ┗━━━━━┻━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛
//! ```
use bytes::{BufMut, Bytes, BytesMut};

use super::{ProtocolError, Wire};
use crate::ext::{BufMutExt, BytesExt, UsizeExt};

/// Maximum nesting of lists and documents accepted from the wire.
pub const MAX_DEPTH: usize = 64;

/// Wire representation of a single scalar or composite value.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// No arm set.
    Unset,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    BigDecimal(WireDecimal),
    Float(f32),
    Double(f64),
    /// Days since 1970-01-01.
    Date(i64),
    /// Milliseconds since midnight.
    Time(i32),
    /// Milliseconds since the unix epoch, UTC.
    Timestamp(i64),
    Interval(WireInterval),
    String(String),
    Binary(Bytes),
    Null,
    List(Vec<WireValue>),
    Document(WireDocument),
    /// Server side file content, not decodable to a native value.
    File(Bytes),
}

/// Arbitrary precision decimal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireDecimal {
    /// Big-endian two's complement unscaled value.
    pub unscaled_value: Bytes,
    pub scale: i32,
}

/// Interval carrying months, milliseconds, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireInterval {
    pub months: Option<i64>,
    pub milliseconds: Option<i64>,
}

/// Ordered document entries, keys are values themselves.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WireDocument {
    pub entries: Vec<(WireValue, WireValue)>,
}

macro_rules! tags {
    ($($name:ident = $tag:literal, $kind:literal;)*) => {
        mod tag {
            $(pub const $name: u8 = $tag;)*
        }

        /// Returns the arm name of a value tag.
        ///
        /// Returns `"unknown"` for unknown tag.
        pub fn kind_name(tag: u8) -> &'static str {
            match tag {
                $($tag => $kind,)*
                _ => "unknown",
            }
        }
    };
}

tags! {
    UNSET = 0, "unset";
    BOOLEAN = 1, "boolean";
    INTEGER = 2, "integer";
    LONG = 3, "long";
    BIG_DECIMAL = 4, "big_decimal";
    FLOAT = 5, "float";
    DOUBLE = 6, "double";
    DATE = 7, "date";
    TIME = 8, "time";
    TIMESTAMP = 9, "timestamp";
    INTERVAL = 10, "interval";
    STRING = 11, "string";
    BINARY = 12, "binary";
    NULL = 13, "null";
    LIST = 14, "list";
    DOCUMENT = 15, "document";
    FILE = 16, "file";
}

impl WireValue {
    /// Returns the tag byte of this value.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Unset => tag::UNSET,
            Self::Boolean(_) => tag::BOOLEAN,
            Self::Integer(_) => tag::INTEGER,
            Self::Long(_) => tag::LONG,
            Self::BigDecimal(_) => tag::BIG_DECIMAL,
            Self::Float(_) => tag::FLOAT,
            Self::Double(_) => tag::DOUBLE,
            Self::Date(_) => tag::DATE,
            Self::Time(_) => tag::TIME,
            Self::Timestamp(_) => tag::TIMESTAMP,
            Self::Interval(_) => tag::INTERVAL,
            Self::String(_) => tag::STRING,
            Self::Binary(_) => tag::BINARY,
            Self::Null => tag::NULL,
            Self::List(_) => tag::LIST,
            Self::Document(_) => tag::DOCUMENT,
            Self::File(_) => tag::FILE,
        }
    }

    /// Returns the arm name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        kind_name(self.tag())
    }

    fn decode_depth(buf: &mut Bytes, depth: usize) -> Result<Self, ProtocolError> {
        if depth > MAX_DEPTH {
            return Err(ProtocolError::TooDeep);
        }

        let value = match buf.read_u8()? {
            tag::UNSET => Self::Unset,
            tag::BOOLEAN => Self::Boolean(buf.read_flag()?),
            tag::INTEGER => Self::Integer(buf.read_i32()?),
            tag::LONG => Self::Long(buf.read_i64()?),
            tag::BIG_DECIMAL => Self::BigDecimal(WireDecimal {
                unscaled_value: buf.read_blob()?,
                scale: buf.read_i32()?,
            }),
            tag::FLOAT => Self::Float(buf.read_f32()?),
            tag::DOUBLE => Self::Double(buf.read_f64()?),
            tag::DATE => Self::Date(buf.read_i64()?),
            tag::TIME => Self::Time(buf.read_i32()?),
            tag::TIMESTAMP => Self::Timestamp(buf.read_i64()?),
            tag::INTERVAL => Self::Interval(WireInterval {
                months: buf.read_option(|b| b.read_i64())?,
                milliseconds: buf.read_option(|b| b.read_i64())?,
            }),
            tag::STRING => Self::String(buf.read_string()?),
            tag::BINARY => Self::Binary(buf.read_blob()?),
            tag::NULL => Self::Null,
            tag::LIST => {
                let len = buf.read_u32()?;
                let mut values = Vec::new();
                for _ in 0..len {
                    values.push(Self::decode_depth(buf, depth + 1)?);
                }
                Self::List(values)
            }
            tag::DOCUMENT => {
                let len = buf.read_u32()?;
                let mut entries = Vec::new();
                for _ in 0..len {
                    let key = Self::decode_depth(buf, depth + 1)?;
                    let value = Self::decode_depth(buf, depth + 1)?;
                    entries.push((key, value));
                }
                Self::Document(WireDocument { entries })
            }
            tag::FILE => Self::File(buf.read_blob()?),
            tag => return Err(ProtocolError::unknown("value", tag)),
        };

        Ok(value)
    }
}

impl Wire for WireValue {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.tag());
        match self {
            Self::Unset | Self::Null => {}
            Self::Boolean(b) => buf.put_flag(*b),
            Self::Integer(i) => buf.put_i32(*i),
            Self::Long(l) => buf.put_i64(*l),
            Self::BigDecimal(d) => {
                buf.put_blob(&d.unscaled_value);
                buf.put_i32(d.scale);
            }
            Self::Float(f) => buf.put_f32(*f),
            Self::Double(d) => buf.put_f64(*d),
            Self::Date(d) => buf.put_i64(*d),
            Self::Time(t) => buf.put_i32(*t),
            Self::Timestamp(t) => buf.put_i64(*t),
            Self::Interval(i) => {
                buf.put_option(i.months, |b, m| b.put_i64(m));
                buf.put_option(i.milliseconds, |b, m| b.put_i64(m));
            }
            Self::String(s) => buf.put_string(s),
            Self::Binary(b) | Self::File(b) => buf.put_blob(b),
            Self::List(values) => {
                buf.put_u32(values.len().to_u32());
                for value in values {
                    value.encode(buf);
                }
            }
            Self::Document(doc) => {
                buf.put_u32(doc.entries.len().to_u32());
                for (key, value) in &doc.entries {
                    key.encode(buf);
                    value.encode(buf);
                }
            }
        }
    }

    fn decode(buf: &mut Bytes) -> Result<Self, ProtocolError> {
        Self::decode_depth(buf, 0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nested_document_layout() {
        let value = WireValue::Document(WireDocument {
            entries: vec![
                (WireValue::String("a".into()), WireValue::List(vec![WireValue::Integer(1), WireValue::Null])),
                (WireValue::String("b".into()), WireValue::Interval(WireInterval { months: Some(3), milliseconds: None })),
            ],
        });
        let mut bytes = value.to_bytes();
        assert_eq!(bytes[0], tag::DOCUMENT);
        assert_eq!(WireValue::decode(&mut bytes).unwrap(), value);
        assert!(bytes.is_empty());
    }

    #[test]
    fn unknown_tag_is_protocol_error() {
        let mut bytes = Bytes::from_static(&[200]);
        assert!(matches!(
            WireValue::decode(&mut bytes),
            Err(ProtocolError::UnknownTag { what: "value", tag: 200 })
        ));
    }

    #[test]
    fn nesting_limit() {
        let mut value = WireValue::Null;
        for _ in 0..=MAX_DEPTH {
            value = WireValue::List(vec![value]);
        }
        let mut bytes = value.to_bytes();
        assert!(matches!(WireValue::decode(&mut bytes), Err(ProtocolError::TooDeep)));
    }

    #[test]
    fn unset_survives_the_wire() {
        let mut bytes = WireValue::Unset.to_bytes();
        assert_eq!(WireValue::decode(&mut bytes).unwrap(), WireValue::Unset);
        assert_eq!(WireValue::Unset.kind(), "unset");
        assert_eq!(kind_name(250), "unknown");
    }
}
