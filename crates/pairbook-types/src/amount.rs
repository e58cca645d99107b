//! Exact integer arithmetic for order amounts.
//!
//! Amounts are 256-bit unsigned integers. Every product that feeds a
//! comparison or a division is widened to 512 bits first, so nothing
//! overflows and no division rounds.

use std::cmp::Ordering;

pub use primitive_types::{U256, U512};

/// Compare the prices `a1 / a0` and `b1 / b0` without dividing.
///
/// Returns the ordering of price `a` relative to price `b`, computed as
/// `a1 * b0` versus `b1 * a0` on 512-bit products.
#[must_use]
pub fn compare_price(a0: U256, a1: U256, b0: U256, b1: U256) -> Ordering {
    a1.full_mul(b0).cmp(&b1.full_mul(a0))
}

/// `a * b / d` when the division leaves no remainder.
///
/// Returns `None` on a zero divisor, a non-zero remainder or a quotient
/// wider than 256 bits.
#[must_use]
pub fn mul_div_exact(a: U256, b: U256, d: U256) -> Option<U256> {
    if d.is_zero() {
        return None;
    }
    let (quotient, remainder) = a.full_mul(b).div_mod(U512::from(d));
    if !remainder.is_zero() {
        return None;
    }
    U256::try_from(quotient).ok()
}

/// `10^exp` as a 256-bit integer.
#[must_use]
pub fn pow10(exp: u8) -> U256 {
    U256::exp10(usize::from(exp))
}
