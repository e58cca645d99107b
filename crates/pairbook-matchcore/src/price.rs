//! Side-aware price ranking.
//!
//! Every ordering and matching decision in the engine goes through
//! [`compare_price`], which cross-multiplies on 512-bit products. Nothing
//! here ever divides.

use std::cmp::Ordering;

use pairbook_types::{Side, U256, compare_price};

/// Rank price `a` against price `b` from the point of view of `side`'s list.
///
/// `Less` means `a` sorts strictly ahead of `b` (lower ask, higher bid),
/// `Equal` means the prices are identical, `Greater` means `a` sorts behind.
#[must_use]
pub fn rank(side: Side, a0: U256, a1: U256, b0: U256, b1: U256) -> Ordering {
    let by_price = compare_price(a0, a1, b0, b1);
    match side {
        Side::Ask => by_price,
        Side::Bid => by_price.reverse(),
    }
}

/// Whether a taker on `taker_side` with price `t1 / t0` can trade against a
/// maker resting at `m1 / m0`.
///
/// A bid taker needs the ask at or below its price; an ask taker needs the
/// bid at or above its price.
#[must_use]
pub fn overlaps(taker_side: Side, t0: U256, t1: U256, m0: U256, m1: U256) -> bool {
    let maker_vs_taker = compare_price(m0, m1, t0, t1);
    match taker_side {
        Side::Bid => maker_vs_taker != Ordering::Greater,
        Side::Ask => maker_vs_taker != Ordering::Less,
    }
}
