//! Native value representation.
use bigdecimal::BigDecimal;
use bytes::Bytes;
use num_bigint::BigInt;
use std::fmt;
use time::{Date, OffsetDateTime, Time};

/// A value sent as statement parameter or received in a row.
///
/// Rust integers convert with the narrowest arm that holds them, a value that
/// does not fit `i64` becomes a [`Value::Decimal`] with scale zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i32),
    Long(i64),
    Decimal(BigDecimal),
    /// Sent on the `float` arm as is, not widened to `double`.
    Float(f32),
    Double(f64),
    Date(Date),
    /// Time of day, millisecond precision on the wire.
    Time(Time),
    /// Point in time, millisecond precision on the wire.
    Timestamp(OffsetDateTime),
    Interval(Interval),
    String(String),
    Binary(Bytes),
    List(Vec<Value>),
    Document(Document),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Long(_) => "long",
            Self::Decimal(_) => "decimal",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::Interval(_) => "interval",
            Self::String(_) => "string",
            Self::Binary(_) => "binary",
            Self::List(_) => "list",
            Self::Document(_) => "document",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer when the value is any integer arm that fits `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i as i64),
            Self::Long(l) => Some(*l),
            _ => None,
        }
    }
}

/// Interval of months and milliseconds.
///
/// Months and milliseconds are never normalized into each other, an interval
/// of one month differs from an interval of thirty days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Interval {
    pub months: i64,
    pub milliseconds: i64,
}

impl Interval {
    pub const fn new(months: i64, milliseconds: i64) -> Self {
        Self { months, milliseconds }
    }

    pub const fn from_months(months: i64) -> Self {
        Self { months, milliseconds: 0 }
    }

    pub const fn from_millis(milliseconds: i64) -> Self {
        Self { months: 0, milliseconds }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn unit(f: &mut fmt::Formatter<'_>, count: i64, word: &str) -> fmt::Result {
            match count {
                1 => write!(f, "1 {word}"),
                n => write!(f, "{n} {word}s"),
            }
        }

        let (years, months) = (self.months / 12, self.months % 12);
        let mut sep = false;
        if years != 0 {
            unit(f, years, "year")?;
            sep = true;
        }
        if months != 0 {
            if sep {
                f.write_str(" and ")?;
            }
            unit(f, months, "month")?;
            sep = true;
        }
        if self.milliseconds != 0 || !sep {
            if sep {
                f.write_str(" and ")?;
            }
            unit(f, self.milliseconds, "millisecond")?;
        }
        Ok(())
    }
}

/// Ordered document with string keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    entries: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace `key`, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, old)) => Some(std::mem::replace(old, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_entries(self) -> Vec<(String, Value)> {
        self.entries
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Value {
            fn from($pat: $ty) -> Self {
                $body
            }
        }
    };
}

from!(<bool>v => Value::Boolean(v));
from!(<i8>v => Value::Integer(v.into()));
from!(<i16>v => Value::Integer(v.into()));
from!(<i32>v => Value::Integer(v));
from!(<u8>v => Value::Integer(v.into()));
from!(<u16>v => Value::Integer(v.into()));
from!(<u32>v => Value::from(i64::from(v)));
from!(<i64>v => match i32::try_from(v) {
    Ok(i) => Value::Integer(i),
    Err(_) => Value::Long(v),
});
from!(<u64>v => Value::from(i128::from(v)));
from!(<i128>v => match i64::try_from(v) {
    Ok(i) => Value::from(i),
    Err(_) => Value::Decimal(BigDecimal::from(v)),
});
from!(<BigInt>v => match i64::try_from(&v) {
    Ok(i) => Value::from(i),
    Err(_) => Value::Decimal(BigDecimal::new(v, 0)),
});
from!(<BigDecimal>v => Value::Decimal(v));
from!(<f32>v => Value::Float(v));
from!(<f64>v => Value::Double(v));
from!(<Date>v => Value::Date(v));
from!(<Time>v => Value::Time(v));
from!(<OffsetDateTime>v => Value::Timestamp(v));
from!(<time::PrimitiveDateTime>v => Value::Timestamp(v.assume_utc()));
from!(<Interval>v => Value::Interval(v));
from!(<String>v => Value::String(v));
from!(<&str>v => Value::String(v.to_owned()));
from!(<Bytes>v => Value::Binary(v));
from!(<&[u8]>v => Value::Binary(Bytes::copy_from_slice(v)));
from!(<Document>v => Value::Document(v));

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}
