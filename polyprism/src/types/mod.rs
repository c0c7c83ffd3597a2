//! Type integration with external types
//!
//! Implementation [`Decode`][d] for external types.
//!
//! Available for:
//!
//! - [`time`][::time]'s [`Date`][td], [`Time`][tt], [`OffsetDateTime`][to], [`PrimitiveDateTime`][tp]
//! - [`bigdecimal`]'s [`BigDecimal`][bd] and [`num_bigint`]'s [`BigInt`][bi]
//! - [`serde`]'s [`Deserialize`][sd] via [`Json`], requires `json` feature
//!
//! [d]: crate::Decode
//! [td]: ::time::Date
//! [tt]: ::time::Time
//! [to]: ::time::OffsetDateTime
//! [tp]: ::time::PrimitiveDateTime
//! [bd]: bigdecimal::BigDecimal
//! [bi]: num_bigint::BigInt
//! [sd]: serde::Deserialize

#[cfg(feature = "json")]
mod json;
#[cfg(feature = "json")]
pub use json::Json;

mod decimal;
mod time;
