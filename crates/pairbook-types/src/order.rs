//! Order model for the Pairbook matching engine.
//!
//! A [`LimitOrder`] carries its *remaining* amounts. The implied price is
//! `amount1 / amount0` and is never materialized as a fraction.

use serde::{Deserialize, Serialize};

use crate::{Identity, OrderId, U256};

/// Which list an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Side {
    /// Sells asset0 for asset1. Sorted by ascending price.
    Ask,
    /// Buys asset0 with asset1. Sorted by descending price.
    Bid,
}

impl Side {
    #[must_use]
    pub fn from_is_ask(is_ask: bool) -> Self {
        if is_ask { Self::Ask } else { Self::Bid }
    }

    #[must_use]
    pub fn is_ask(self) -> bool {
        self == Self::Ask
    }

    /// The side a taker on `self` matches against.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Ask => Self::Bid,
            Self::Bid => Self::Ask,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ask => write!(f, "ASK"),
            Self::Bid => write!(f, "BID"),
        }
    }
}

/// A resting order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrder {
    pub id: OrderId,
    pub owner: Identity,
    /// Unfilled asset0 quantity.
    pub amount0: U256,
    /// Unfilled asset1 quantity.
    pub amount1: U256,
}

impl LimitOrder {
    #[must_use]
    pub fn new(id: OrderId, owner: Identity, amount0: U256, amount1: U256) -> Self {
        Self {
            id,
            owner,
            amount0,
            amount1,
        }
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.amount0.is_zero()
    }

    /// Amount held in custody for this order: asset0 for asks, asset1 for bids.
    #[must_use]
    pub fn escrowed(&self, side: Side) -> U256 {
        match side {
            Side::Ask => self.amount0,
            Side::Bid => self.amount1,
        }
    }
}

/// Read-only view of every active order in a book, asks first then bids.
///
/// Columns are parallel: index `i` of each vector describes the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrderSnapshot {
    pub ids: Vec<OrderId>,
    pub owners: Vec<Identity>,
    pub amount0s: Vec<U256>,
    pub amount1s: Vec<U256>,
    pub is_asks: Vec<bool>,
}

impl LimitOrderSnapshot {
    pub fn push(&mut self, order: &LimitOrder, side: Side) {
        self.ids.push(order.id);
        self.owners.push(order.owner);
        self.amount0s.push(order.amount0);
        self.amount1s.push(order.amount1);
        self.is_asks.push(side.is_ask());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl LimitOrder {
    pub fn dummy(id: u32, amount0: u64, amount1: u64) -> Self {
        Self::new(
            OrderId(id),
            Identity([1u8; 20]),
            U256::from(amount0),
            U256::from(amount1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_helpers() {
        assert_eq!(Side::from_is_ask(true), Side::Ask);
        assert_eq!(Side::from_is_ask(false), Side::Bid);
        assert_eq!(Side::Ask.opposite(), Side::Bid);
        assert_eq!(format!("{}", Side::Bid), "BID");
    }

    #[test]
    fn escrow_follows_side() {
        let order = LimitOrder::dummy(2, 10, 100);
        assert_eq!(order.escrowed(Side::Ask), U256::from(10));
        assert_eq!(order.escrowed(Side::Bid), U256::from(100));
        assert!(!order.is_filled());
    }

    #[test]
    fn snapshot_columns_stay_parallel() {
        let mut snap = LimitOrderSnapshot::default();
        snap.push(&LimitOrder::dummy(2, 10, 100), Side::Ask);
        snap.push(&LimitOrder::dummy(3, 5, 40), Side::Bid);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.ids, vec![OrderId(2), OrderId(3)]);
        assert_eq!(snap.is_asks, vec![true, false]);
    }
}
