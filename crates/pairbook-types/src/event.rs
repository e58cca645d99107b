//! Notifications emitted by an order book for external observers.
//!
//! Every state change an operation makes is reported as a [`BookEvent`],
//! in execution order. Amounts are absolute (post-tick) values.

use serde::{Deserialize, Serialize};

use crate::{BookId, Identity, OrderId, Side, U256};

/// A single book notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookEvent {
    LimitOrderCreated {
        book_id: BookId,
        id: OrderId,
        owner: Identity,
        amount0: U256,
        amount1: U256,
        side: Side,
    },
    LimitOrderUpdated {
        book_id: BookId,
        id: OrderId,
        owner: Identity,
        amount0: U256,
        amount1: U256,
        side: Side,
    },
    LimitOrderCanceled {
        book_id: BookId,
        id: OrderId,
        owner: Identity,
        amount0: U256,
        amount1: U256,
        side: Side,
    },
    MarketOrderCreated {
        book_id: BookId,
        id: OrderId,
        owner: Identity,
        amount0: U256,
        amount1: U256,
        side: Side,
    },
    /// A fill between a resting order and a taker, at the maker's price.
    Swap {
        book_id: BookId,
        ask_id: OrderId,
        ask_owner: Identity,
        bid_id: OrderId,
        bid_owner: Identity,
        amount0: U256,
        amount1: U256,
    },
}

impl BookEvent {
    #[must_use]
    pub fn book_id(&self) -> BookId {
        match self {
            Self::LimitOrderCreated { book_id, .. }
            | Self::LimitOrderUpdated { book_id, .. }
            | Self::LimitOrderCanceled { book_id, .. }
            | Self::MarketOrderCreated { book_id, .. }
            | Self::Swap { book_id, .. } => *book_id,
        }
    }

    #[must_use]
    pub fn is_swap(&self) -> bool {
        matches!(self, Self::Swap { .. })
    }

    /// Stable one-byte tag used when hashing events.
    #[must_use]
    pub fn tag(&self) -> u8 {
        match self {
            Self::LimitOrderCreated { .. } => 1,
            Self::LimitOrderUpdated { .. } => 2,
            Self::LimitOrderCanceled { .. } => 3,
            Self::MarketOrderCreated { .. } => 4,
            Self::Swap { .. } => 5,
        }
    }
}

impl std::fmt::Display for BookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LimitOrderCreated { book_id, id, side, amount0, amount1, .. } => {
                write!(f, "{book_id} created {side} {id} {amount0}/{amount1}")
            }
            Self::LimitOrderUpdated { book_id, id, side, amount0, amount1, .. } => {
                write!(f, "{book_id} updated {side} {id} {amount0}/{amount1}")
            }
            Self::LimitOrderCanceled { book_id, id, side, amount0, amount1, .. } => {
                write!(f, "{book_id} canceled {side} {id} {amount0}/{amount1}")
            }
            Self::MarketOrderCreated { book_id, id, side, amount0, amount1, .. } => {
                write!(f, "{book_id} market {side} {id} {amount0}/{amount1}")
            }
            Self::Swap { book_id, ask_id, bid_id, amount0, amount1, .. } => {
                write!(f, "{book_id} swap ask {ask_id} bid {bid_id} {amount0}/{amount1}")
            }
        }
    }
}
