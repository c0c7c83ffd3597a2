use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::{Decode, DecodeError, Value, row::decode};

decode!(Date, "date", Value::Date(d) => d);
decode!(Time, "time", Value::Time(t) => t);
decode!(OffsetDateTime, "timestamp", Value::Timestamp(t) => t);

/// Timestamp in UTC without the offset.
impl Decode for PrimitiveDateTime {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        let ts = OffsetDateTime::decode(value)?.to_offset(UtcOffset::UTC);
        Ok(PrimitiveDateTime::new(ts.date(), ts.time()))
    }
}
