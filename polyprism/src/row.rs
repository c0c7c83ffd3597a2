//! Result row operation.
//!
//! - [`Row`]
//! - [`FromRow`]
//! - [`Decode`]
//!
//! - [`Index`]
//! - [`DecodeError`]
use bytes::Bytes;
use std::{borrow::Cow, fmt, sync::Arc};

use crate::{
    cursor::ColumnDescriptor,
    value::{Document, Interval, Value},
};

/// A single result row.
///
/// A document result is a row with a single [`Value::Document`] and no columns.
#[derive(Clone, PartialEq)]
pub struct Row {
    columns: Option<Arc<[ColumnDescriptor]>>,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn new(columns: Option<Arc<[ColumnDescriptor]>>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Returns `true` if row contains no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Column metadata, `None` for document results.
    pub fn columns(&self) -> Option<&[ColumnDescriptor]> {
        self.columns.as_deref()
    }

    /// Returns value by position or column label.
    pub fn get<I: Index>(&self, idx: I) -> Option<&Value> {
        idx.position(self).ok().map(|i| &self.values[i])
    }

    /// Try get and decode value.
    pub fn try_get<I: Index, R: Decode>(&self, idx: I) -> Result<R, DecodeError> {
        let i = idx.position(self)?;
        R::decode(self.values[i].clone())
    }

    /// Try decode type using [`FromRow`] implementation.
    pub fn decode<D: FromRow>(self) -> Result<D, DecodeError> {
        D::from_row(self)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }
}

impl IntoIterator for Row {
    type Item = Value;

    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Value;

    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.columns {
            Some(columns) => {
                let mut dbg = f.debug_map();
                for (column, value) in columns.iter().zip(&self.values) {
                    dbg.entry(&column.label, value);
                }
                dbg.finish()
            }
            None => f.debug_list().entries(&self.values).finish(),
        }
    }
}

// ===== Traits =====

/// Type that can be constructed from a row.
pub trait FromRow: Sized {
    /// Construct self from row.
    fn from_row(row: Row) -> Result<Self, DecodeError>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> Result<Self, DecodeError> {
        Ok(row)
    }
}

impl FromRow for () {
    fn from_row(_: Row) -> Result<Self, DecodeError> {
        Ok(())
    }
}

impl FromRow for Vec<Value> {
    fn from_row(row: Row) -> Result<Self, DecodeError> {
        Ok(row.values)
    }
}

macro_rules! from_row_tuple {
    ($($t:ident $i:literal),*) => {
        impl<$($t),*> FromRow for ($($t),*,)
        where
            $($t: Decode),*
        {
            fn from_row(row: Row) -> Result<Self, DecodeError> {
                Ok((
                    $(row.try_get($i)?),*,
                ))
            }
        }
    };
}

from_row_tuple!(T0 0);
from_row_tuple!(T0 0, T1 1);
from_row_tuple!(T0 0, T1 1, T2 2);
from_row_tuple!(T0 0, T1 1, T2 2, T3 3);

/// A type that can be constructed from [`Value`].
pub trait Decode: Sized {
    /// Try decode self from value.
    fn decode(value: Value) -> Result<Self, DecodeError>;
}

impl Decode for Value {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        Ok(value)
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(None),
            value => T::decode(value).map(Some),
        }
    }
}

/// Implement [`Decode`] by matching value variants.
macro_rules! decode {
    ($ty:ty, $expect:literal, $($pat:pat => $body:expr),* $(,)?) => {
        impl Decode for $ty {
            fn decode(value: Value) -> Result<Self, DecodeError> {
                match value {
                    $($pat => Ok($body),)*
                    Value::Null => Err(DecodeError::Null),
                    other => Err(DecodeError::mismatch($expect, &other)),
                }
            }
        }
    };
}

pub(crate) use decode;

decode!(bool, "boolean", Value::Boolean(b) => b);
decode!(i32, "integer", Value::Integer(i) => i);
decode!(i64, "long", Value::Integer(i) => i.into(), Value::Long(l) => l);
decode!(f32, "float", Value::Float(f) => f);
decode!(f64, "double", Value::Double(d) => d, Value::Float(f) => f.into());
decode!(String, "string", Value::String(s) => s);
decode!(Bytes, "binary", Value::Binary(b) => b);
decode!(Vec<u8>, "binary", Value::Binary(b) => b.into());
decode!(Interval, "interval", Value::Interval(i) => i);
decode!(Document, "document", Value::Document(d) => d);

impl<T: Decode> Decode for Vec<T> {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::List(values) => values.into_iter().map(T::decode).collect(),
            Value::Null => Err(DecodeError::Null),
            other => Err(DecodeError::mismatch("list", &other)),
        }
    }
}

/// Type that can be used for indexing column.
pub trait Index: Sized + sealed::Sealed {
    /// Returns the value position.
    fn position(self, row: &Row) -> Result<usize, DecodeError>;
}

impl Index for usize {
    fn position(self, row: &Row) -> Result<usize, DecodeError> {
        match self < row.values.len() {
            true => Ok(self),
            false => Err(DecodeError::IndexOutOfBounds(self)),
        }
    }
}

impl Index for &str {
    fn position(self, row: &Row) -> Result<usize, DecodeError> {
        row.columns
            .as_deref()
            .and_then(|columns| columns.iter().position(|c| c.label == self))
            .filter(|i| *i < row.values.len())
            .ok_or_else(|| DecodeError::ColumnNotFound(String::from(self).into()))
    }
}

mod sealed {
    pub trait Sealed { }
    impl Sealed for usize { }
    impl Sealed for &str { }
}

/// An error when decoding row value.
pub enum DecodeError {
    /// Column requested not found.
    ColumnNotFound(Cow<'static, str>),
    /// Index requested is out of bounds.
    IndexOutOfBounds(usize),
    /// Value variant does not match the requested type.
    Mismatch {
        expect: &'static str,
        found: &'static str,
    },
    /// Value is null.
    Null,
    /// Value does not fit the requested type.
    OutOfRange(&'static str),
    /// Failed to deserialize using `serde_json`.
    #[cfg(feature = "json")]
    Json(serde_json::error::Error),
}

impl DecodeError {
    pub(crate) fn mismatch(expect: &'static str, found: &Value) -> Self {
        Self::Mismatch { expect, found: found.kind() }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::ColumnNotFound(name) => write!(f, "column not found: {name:?}"),
            Self::IndexOutOfBounds(u) => write!(f, "index out of bounds: {u:?}"),
            Self::Mismatch { expect, found } => write!(f, "expected {expect} found {found}"),
            Self::Null => write!(f, "unexpected NULL value"),
            Self::OutOfRange(ty) => write!(f, "value out of range for {ty}"),
            #[cfg(feature = "json")]
            Self::Json(e) => write!(f, "{e}"),
        }
    }
}

#[cfg(feature = "json")]
impl From<serde_json::error::Error> for DecodeError {
    fn from(e: serde_json::error::Error) -> Self {
        Self::Json(e)
    }
}

impl std::error::Error for DecodeError { }

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
