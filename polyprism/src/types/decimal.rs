use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::{Decode, DecodeError, Value, row::decode};

decode!(
    BigDecimal,
    "decimal",
    Value::Decimal(d) => d,
    Value::Integer(i) => i.into(),
    Value::Long(l) => l.into(),
);

/// Integer of any width, a decimal is accepted only when it has no fraction.
impl Decode for BigInt {
    fn decode(value: Value) -> Result<Self, DecodeError> {
        let decimal = BigDecimal::decode(value)?;
        if !decimal.is_integer() {
            return Err(DecodeError::OutOfRange("BigInt"));
        }
        let (int, _) = decimal.with_scale(0).into_bigint_and_exponent();
        Ok(int)
    }
}
