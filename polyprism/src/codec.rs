//! Conversion between native [`Value`] and [`WireValue`].
//!
//! Both directions are pure and recursive.
//!
//! | native                | wire                                   |
//! |-----------------------|----------------------------------------|
//! | `Date`                | days since 1970-01-01                  |
//! | `Time`                | milliseconds since midnight, truncated |
//! | `OffsetDateTime`      | milliseconds since unix epoch, floored |
//! | `BigDecimal`          | two's complement unscaled value, scale |
//! | `Interval`            | the non zero units, at least one       |
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::fmt;
use time::{Date, OffsetDateTime, Time};

use crate::{
    prism::{WireDecimal, WireDocument, WireInterval, WireValue, value::MAX_DEPTH},
    value::{Document, Interval, Value},
};

/// Julian day number of 1970-01-01.
const UNIX_EPOCH_JULIAN_DAY: i64 = 2_440_588;

const MILLIS_PER_DAY: i32 = 86_400_000;

/// Longest string, blob or collection a `u32` length prefix can carry.
const MAX_LEN: usize = u32::MAX as usize;

/// Reject a length the wire can not prefix.
pub(crate) fn check_len(len: usize, kind: &'static str) -> Result<(), EncodeError> {
    if len > MAX_LEN {
        return Err(EncodeError::TooLong(kind));
    }
    Ok(())
}

/// Encode a native value to its wire form.
pub fn encode(value: &Value) -> Result<WireValue, EncodeError> {
    encode_depth(value, 0)
}

/// Decode a wire value to its native form.
pub fn decode(value: WireValue) -> Result<Value, MalformedValue> {
    let value = match value {
        WireValue::Boolean(b) => Value::Boolean(b),
        WireValue::Integer(i) => Value::Integer(i),
        WireValue::Long(l) => Value::Long(l),
        WireValue::BigDecimal(d) => Value::Decimal(decode_decimal(&d)),
        WireValue::Float(f) => Value::Float(f),
        WireValue::Double(d) => Value::Double(d),
        WireValue::Date(days) => Value::Date(decode_date(days)?),
        WireValue::Time(ms) => Value::Time(decode_time(ms)?),
        WireValue::Timestamp(ms) => Value::Timestamp(decode_timestamp(ms)?),
        WireValue::Interval(i) => Value::Interval(decode_interval(i)?),
        WireValue::String(s) => Value::String(s),
        WireValue::Binary(b) => Value::Binary(b),
        WireValue::Null => Value::Null,
        WireValue::List(values) => {
            Value::List(values.into_iter().map(decode).collect::<Result<_, _>>()?)
        }
        WireValue::Document(doc) => Value::Document(decode_document(doc)?),
        v @ (WireValue::Unset | WireValue::File(_)) => {
            return Err(MalformedValue::Unsupported(v.kind()));
        }
    };
    Ok(value)
}

fn encode_depth(value: &Value, depth: usize) -> Result<WireValue, EncodeError> {
    if depth > MAX_DEPTH {
        return Err(EncodeError::TooDeep);
    }

    let value = match value {
        Value::Null => WireValue::Null,
        Value::Boolean(b) => WireValue::Boolean(*b),
        Value::Integer(i) => WireValue::Integer(*i),
        Value::Long(l) => WireValue::Long(*l),
        Value::Decimal(d) => WireValue::BigDecimal(encode_decimal(d)?),
        Value::Float(f) => WireValue::Float(*f),
        Value::Double(d) => WireValue::Double(*d),
        Value::Date(d) => WireValue::Date(d.to_julian_day() as i64 - UNIX_EPOCH_JULIAN_DAY),
        Value::Time(t) => WireValue::Time(encode_time(*t)),
        Value::Timestamp(t) => WireValue::Timestamp(encode_timestamp(*t)?),
        Value::Interval(i) => WireValue::Interval(encode_interval(*i)),
        Value::String(s) => {
            check_len(s.len(), "string")?;
            WireValue::String(s.clone())
        }
        Value::Binary(b) => {
            check_len(b.len(), "binary")?;
            WireValue::Binary(b.clone())
        }
        Value::List(values) => {
            check_len(values.len(), "list")?;
            WireValue::List(
                values
                    .iter()
                    .map(|v| encode_depth(v, depth + 1))
                    .collect::<Result<_, _>>()?,
            )
        }
        Value::Document(doc) => {
            check_len(doc.len(), "document")?;
            let mut entries = Vec::with_capacity(doc.len());
            for (key, value) in doc.iter() {
                check_len(key.len(), "document key")?;
                entries.push((WireValue::String(key.to_owned()), encode_depth(value, depth + 1)?));
            }
            WireValue::Document(WireDocument { entries })
        }
    };
    Ok(value)
}

fn encode_decimal(value: &BigDecimal) -> Result<WireDecimal, EncodeError> {
    let (unscaled, scale) = value.as_bigint_and_exponent();
    let Ok(scale) = i32::try_from(scale) else {
        return Err(EncodeError::ScaleOutOfRange(scale));
    };
    Ok(WireDecimal {
        unscaled_value: unscaled.to_signed_bytes_be().into(),
        scale,
    })
}

fn decode_decimal(value: &WireDecimal) -> BigDecimal {
    let unscaled = BigInt::from_signed_bytes_be(&value.unscaled_value);
    BigDecimal::new(unscaled, value.scale.into())
}

fn encode_time(value: Time) -> i32 {
    let (h, m, s, nanos) = value.as_hms_nano();
    let seconds = h as i32 * 3600 + m as i32 * 60 + s as i32;
    seconds * 1000 + (nanos / 1_000_000) as i32
}

fn encode_timestamp(value: OffsetDateTime) -> Result<i64, EncodeError> {
    let millis = value.unix_timestamp_nanos().div_euclid(1_000_000);
    i64::try_from(millis).map_err(|_| EncodeError::OutOfRange("timestamp"))
}

fn encode_interval(value: Interval) -> WireInterval {
    let months = (value.months != 0).then_some(value.months);
    let milliseconds = match (months, value.milliseconds) {
        (None, 0) => Some(0),
        (_, 0) => None,
        (_, ms) => Some(ms),
    };
    WireInterval { months, milliseconds }
}

fn decode_date(days: i64) -> Result<Date, MalformedValue> {
    let out_of_range = || MalformedValue::OutOfRange { kind: "date", value: days };
    let julian = days.checked_add(UNIX_EPOCH_JULIAN_DAY).ok_or_else(out_of_range)?;
    let julian = i32::try_from(julian).map_err(|_| out_of_range())?;
    Date::from_julian_day(julian).map_err(|_| out_of_range())
}

fn decode_time(ms: i32) -> Result<Time, MalformedValue> {
    if !(0..MILLIS_PER_DAY).contains(&ms) {
        return Err(MalformedValue::OutOfRange { kind: "time", value: ms.into() });
    }
    let (h, rest) = (ms / 3_600_000, ms % 3_600_000);
    let (m, rest) = (rest / 60_000, rest % 60_000);
    let (s, milli) = (rest / 1000, rest % 1000);
    Time::from_hms_milli(h as u8, m as u8, s as u8, milli as u16)
        .map_err(|_| MalformedValue::OutOfRange { kind: "time", value: ms.into() })
}

fn decode_timestamp(ms: i64) -> Result<OffsetDateTime, MalformedValue> {
    OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
        .map_err(|_| MalformedValue::OutOfRange { kind: "timestamp", value: ms })
}

fn decode_interval(value: WireInterval) -> Result<Interval, MalformedValue> {
    if value.months.is_none() && value.milliseconds.is_none() {
        return Err(MalformedValue::IntervalUnit);
    }
    Ok(Interval {
        months: value.months.unwrap_or(0),
        milliseconds: value.milliseconds.unwrap_or(0),
    })
}

fn decode_document(doc: WireDocument) -> Result<Document, MalformedValue> {
    let mut out = Document::new();
    for (key, value) in doc.entries {
        let key = match key {
            WireValue::String(key) => key,
            other => return Err(MalformedValue::NonStringKey(other.kind())),
        };
        out.insert(key, decode(value)?);
    }
    Ok(out)
}

/// Native value that can not be expressed on the wire.
pub enum EncodeError {
    /// Decimal scale does not fit `i32`.
    ScaleOutOfRange(i64),
    /// Temporal value outside the wire range.
    OutOfRange(&'static str),
    /// Nesting exceed [`MAX_DEPTH`].
    TooDeep,
    /// Length does not fit the `u32` prefix.
    TooLong(&'static str),
}

impl std::error::Error for EncodeError { }

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScaleOutOfRange(scale) => write!(f, "decimal scale `{scale}` out of range"),
            Self::OutOfRange(kind) => write!(f, "{kind} out of range"),
            Self::TooDeep => f.write_str("value nesting too deep"),
            Self::TooLong(kind) => write!(f, "{kind} too long for a message"),
        }
    }
}

impl fmt::Debug for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Wire value that has no native counterpart.
pub enum MalformedValue {
    /// Value arm that can not be decoded, `unset` or `file`.
    Unsupported(&'static str),
    /// Interval without months and milliseconds.
    IntervalUnit,
    /// Document key that is not a string.
    NonStringKey(&'static str),
    /// Temporal value outside the native range.
    OutOfRange {
        kind: &'static str,
        value: i64,
    },
}

impl std::error::Error for MalformedValue { }

impl fmt::Display for MalformedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported(kind) => write!(f, "unsupported value `{kind}`"),
            Self::IntervalUnit => f.write_str("interval without unit"),
            Self::NonStringKey(kind) => write!(f, "document key must be string, found `{kind}`"),
            Self::OutOfRange { kind, value } => write!(f, "{kind} `{value}` out of range"),
        }
    }
}

impl fmt::Debug for MalformedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;
    use time::macros::{date, datetime, time};

    fn round_trip(value: Value) -> Value {
        decode(encode(&value).unwrap()).unwrap()
    }

    #[test]
    fn large_integer_uses_decimal_arm() {
        let big = BigInt::from(1) << 70u32;
        let wire = encode(&Value::from(big.clone())).unwrap();
        let WireValue::BigDecimal(d) = &wire else {
            panic!("expected decimal arm, got {}", wire.kind());
        };
        assert_eq!(d.scale, 0);
        assert_eq!(&d.unscaled_value[..], &big.to_signed_bytes_be()[..]);
        assert_eq!(d.unscaled_value[0], 0x40);
        assert_eq!(decode(wire).unwrap(), Value::Decimal(BigDecimal::new(big, 0)));
    }

    #[test]
    fn decimal_keeps_scale() {
        let value = BigDecimal::from_str("-123.4500").unwrap();
        let WireValue::BigDecimal(d) = encode(&Value::Decimal(value.clone())).unwrap() else {
            panic!("expected decimal arm");
        };
        assert_eq!(d.scale, 4);
        assert_eq!(round_trip(Value::Decimal(value.clone())), Value::Decimal(value));
    }

    #[test]
    fn every_variant_round_trips() {
        let mut doc = Document::new();
        doc.insert("k", 1);
        let values = [
            Value::Null,
            Value::Boolean(false),
            Value::Integer(i32::MIN),
            Value::Long(i64::MAX),
            Value::Decimal(BigDecimal::new(BigInt::from(1), -3)),
            Value::Decimal(BigDecimal::new(-(BigInt::from(1) << 70u32), 0)),
            Value::Float(-0.5),
            Value::Double(f64::MAX),
            Value::Date(date!(1970 - 01 - 01)),
            Value::Date(date!(1900 - 01 - 01)),
            Value::Date(date!(2100 - 12 - 31)),
            Value::Time(time!(0:00)),
            Value::Timestamp(datetime!(1900-01-01 00:00:00.001 UTC)),
            Value::Interval(Interval { months: 14, milliseconds: 5 }),
            Value::String(String::new()),
            Value::Binary(bytes::Bytes::new()),
            Value::List(vec![]),
            Value::Document(Document::new()),
            Value::Document(doc),
        ];
        for value in values {
            assert_eq!(round_trip(value.clone()), value);
        }
    }

    #[test]
    fn wire_arms() {
        assert_eq!(encode(&Value::Integer(-7)).unwrap(), WireValue::Integer(-7));
        assert_eq!(encode(&Value::Float(0.1)).unwrap(), WireValue::Float(0.1));
        assert_eq!(encode(&Value::Double(0.1)).unwrap(), WireValue::Double(0.1));
        assert_eq!(encode(&Value::List(vec![])).unwrap(), WireValue::List(vec![]));

        let WireValue::BigDecimal(d) = encode(&Value::Decimal(BigDecimal::new(BigInt::from(1), -3))).unwrap()
        else {
            panic!("expected decimal arm");
        };
        assert_eq!(d.scale, -3);
        assert_eq!(&d.unscaled_value[..], [1]);
        assert_eq!(decode_decimal(&d), BigDecimal::from(1000));

        let negative = -(BigInt::from(1) << 70u32);
        let WireValue::BigDecimal(d) = encode(&Value::from(negative.clone())).unwrap() else {
            panic!("expected decimal arm");
        };
        assert_eq!(d.unscaled_value[0], 0xc0);
        assert_eq!(decode(WireValue::BigDecimal(d)).unwrap(), Value::Decimal(BigDecimal::new(negative, 0)));
    }

    #[test]
    fn date_decodes_before_epoch() {
        assert_eq!(encode(&Value::Date(date!(1900 - 01 - 01))).unwrap(), WireValue::Date(-25_567));
        assert_eq!(decode(WireValue::Date(-25_567)).unwrap(), Value::Date(date!(1900 - 01 - 01)));
        assert_eq!(decode(WireValue::Date(-1)).unwrap(), Value::Date(date!(1969 - 12 - 31)));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn length_prefix_limit() {
        assert!(check_len(MAX_LEN, "string").is_ok());
        assert!(matches!(check_len(MAX_LEN + 1, "binary"), Err(EncodeError::TooLong("binary"))));
        assert_eq!(
            EncodeError::TooLong("string").to_string(),
            "string too long for a message"
        );
    }

    #[test]
    fn temporal_values() {
        assert_eq!(encode(&Value::Date(date!(1970 - 01 - 02))).unwrap(), WireValue::Date(1));
        assert_eq!(encode(&Value::Date(date!(1969 - 12 - 31))).unwrap(), WireValue::Date(-1));
        assert_eq!(
            encode(&Value::Time(time!(1:02:03.004999))).unwrap(),
            WireValue::Time(3_723_004)
        );
        assert_eq!(round_trip(Value::Time(time!(23:59:59.999))), Value::Time(time!(23:59:59.999)));

        let ts = datetime!(1969-12-31 23:59:59.9995 UTC);
        assert_eq!(encode(&Value::Timestamp(ts)).unwrap(), WireValue::Timestamp(-1));
        let ts = datetime!(2024-02-29 12:00:00.123 UTC);
        assert_eq!(round_trip(Value::Timestamp(ts)), Value::Timestamp(ts));
    }

    #[test]
    fn intervals_stay_distinct() {
        let months = encode(&Value::Interval(Interval::from_months(1))).unwrap();
        let millis = encode(&Value::Interval(Interval::from_millis(1))).unwrap();
        assert_eq!(months, WireValue::Interval(WireInterval { months: Some(1), milliseconds: None }));
        assert_eq!(millis, WireValue::Interval(WireInterval { months: None, milliseconds: Some(1) }));
        assert_ne!(decode(months).unwrap(), decode(millis).unwrap());

        let zero = encode(&Value::Interval(Interval::default())).unwrap();
        assert_eq!(zero, WireValue::Interval(WireInterval { months: None, milliseconds: Some(0) }));

        let unitless = WireValue::Interval(WireInterval { months: None, milliseconds: None });
        assert!(matches!(decode(unitless), Err(MalformedValue::IntervalUnit)));
    }

    #[test]
    fn nested_round_trip() {
        let mut doc = Document::new();
        doc.insert("name", "Pear");
        doc.insert("tags", Value::List(vec![Value::Null, Value::Boolean(true), Value::Double(1.5)]));
        doc.insert("raw", Value::Binary(bytes::Bytes::from_static(b"\x00\xff")));
        let value = Value::List(vec![Value::Document(doc), Value::Float(0.25), Value::Long(i64::MIN)]);
        assert_eq!(round_trip(value.clone()), value);
    }

    #[test]
    fn undecodable_values() {
        assert!(matches!(decode(WireValue::Unset), Err(MalformedValue::Unsupported("unset"))));
        assert!(matches!(
            decode(WireValue::File(bytes::Bytes::new())),
            Err(MalformedValue::Unsupported("file"))
        ));
        let doc = WireDocument { entries: vec![(WireValue::Integer(1), WireValue::Null)] };
        assert!(matches!(
            decode(WireValue::Document(doc)),
            Err(MalformedValue::NonStringKey("integer"))
        ));
        assert!(matches!(decode(WireValue::Time(MILLIS_PER_DAY)), Err(MalformedValue::OutOfRange { .. })));
        assert!(matches!(decode(WireValue::Date(i64::MAX)), Err(MalformedValue::OutOfRange { .. })));
    }

    #[test]
    fn scale_out_of_range() {
        let value = BigDecimal::new(BigInt::from(1), i64::from(i32::MAX) + 1);
        assert!(matches!(encode(&Value::Decimal(value)), Err(EncodeError::ScaleOutOfRange(_))));
    }
}
