//! Money helpers shared by the reimbursement and pricing crates.
//!
//! Prices travel as euros (`Decimal`), every computed amount is an
//! integer number of eurocents.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round half away from zero to the nearest integer.
pub fn round_to_integer(value: Decimal) -> i64 {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Convert an amount in euros to eurocents.
pub fn to_eurocents(euros: Decimal) -> i64 {
    round_to_integer(euros * Decimal::ONE_HUNDRED)
}
