//! Money rounding helpers.
//!
//! All money values in this service are exact decimals rounded half-up to
//! two places before they are stored, compared, or serialized.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serializer;

/// Round a money value half-up to two decimal places.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Render a money value as a fixed two-decimal string, e.g. "29.99", "0.00".
pub fn to_money_string(value: Decimal) -> String {
    format!("{:.2}", round_money(value))
}

/// Serde helper so response DTOs always carry two-decimal money strings.
pub fn serialize_money<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&to_money_string(*value))
}
