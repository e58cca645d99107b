//! The fill loop, split into a read-only planner and a list mutator.
//!
//! [`plan_fills`] walks the opposing list from its best order and computes
//! every swap a taker would make, without touching anything. Because all
//! exactness checks happen here, a plan that comes back `Ok` can always be
//! applied. [`apply_fills`] then writes the plan onto the list: fully
//! filled makers are retired, a partially filled maker gets its reduced
//! amounts, and the head sentinel is relinked once past every retired node.
//!
//! ```text
//! swap0 = min(taker.amount0, maker.amount0)
//! swap1 = swap0 * maker.amount1 / maker.amount0      (maker's price, exact)
//! used1 = taker.amount1 * swap0 / taker.amount0      (taker's price, exact)
//! ```
//!
//! Ledger movements are the caller's business; see
//! [`OrderBook`](crate::OrderBook).

use pairbook_types::{
    Identity, LimitOrder, OrderId, PairbookError, Result, Side, U256, mul_div_exact,
};

use crate::order_list::OrderList;
use crate::price::overlaps;

/// One maker touched by a taker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub maker_id: OrderId,
    pub maker_owner: Identity,
    /// asset0 traded.
    pub swap0: U256,
    /// asset1 traded, at the maker's price.
    pub swap1: U256,
    /// asset1 the taker's own price allotted to this fill.
    pub used1: U256,
    /// Whether the maker has nothing left after this fill.
    pub filled: bool,
}

impl Fill {
    /// Quote saved by trading at the maker's better price.
    #[must_use]
    pub fn price_improvement(&self) -> U256 {
        self.used1.saturating_sub(self.swap1)
    }
}

/// The full outcome of matching one taker against one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillPlan {
    pub taker_side: Side,
    pub fills: Vec<Fill>,
    /// First maker that survives the fill, or `TAIL`.
    pub next_head: OrderId,
    /// Taker asset0 left unmatched.
    pub remaining0: U256,
    /// Taker asset1 left unmatched, still at the taker's price.
    pub remaining1: U256,
}

impl FillPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    /// Whether the taker was matched in full.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remaining0.is_zero()
    }

    #[must_use]
    pub fn total_swap0(&self) -> U256 {
        self.fills.iter().fold(U256::zero(), |acc, f| acc + f.swap0)
    }

    #[must_use]
    pub fn total_swap1(&self) -> U256 {
        self.fills.iter().fold(U256::zero(), |acc, f| acc + f.swap1)
    }

    /// Sum of [`Fill::price_improvement`] across every fill.
    #[must_use]
    pub fn total_improvement(&self) -> U256 {
        self.fills
            .iter()
            .fold(U256::zero(), |acc, f| acc + f.price_improvement())
    }
}

/// Compute the fills a taker of `taker_side` offering `amount0` for
/// `amount1` would make against `makers`.
///
/// Stops at the first maker without price overlap, when the taker is
/// exhausted, or after a maker that survives partially filled.
pub fn plan_fills(
    makers: &OrderList,
    taker_side: Side,
    amount0: U256,
    amount1: U256,
) -> Result<FillPlan> {
    debug_assert_eq!(makers.side(), taker_side.opposite());

    let mut fills = Vec::new();
    let mut remaining0 = amount0;
    let mut remaining1 = amount1;
    let mut cursor = makers.first_node();

    while cursor != OrderId::TAIL && !remaining0.is_zero() {
        let maker = makers
            .get(cursor)
            .ok_or(PairbookError::OrderNotFound(cursor))?;
        if !overlaps(taker_side, remaining0, remaining1, maker.amount0, maker.amount1) {
            break;
        }

        let swap0 = remaining0.min(maker.amount0);
        let swap1 = mul_div_exact(swap0, maker.amount1, maker.amount0).ok_or_else(|| {
            PairbookError::TickMismatch {
                reason: format!("maker {cursor}: {swap0} x {} / {}", maker.amount1, maker.amount0),
            }
        })?;
        let used1 = mul_div_exact(remaining1, swap0, remaining0).ok_or_else(|| {
            PairbookError::TickMismatch {
                reason: format!("taker: {remaining1} x {swap0} / {remaining0}"),
            }
        })?;

        remaining0 -= swap0;
        remaining1 -= used1;
        let filled = swap0 == maker.amount0;
        fills.push(Fill {
            maker_id: cursor,
            maker_owner: maker.owner,
            swap0,
            swap1,
            used1,
            filled,
        });

        if !filled {
            break;
        }
        cursor = makers.next_of(cursor);
    }

    Ok(FillPlan {
        taker_side,
        fills,
        next_head: cursor,
        remaining0,
        remaining1,
    })
}

/// Write `plan` onto the maker list. Returns the makers removed, in fill
/// order.
///
/// The plan must have been produced by [`plan_fills`] against this list
/// with no mutation in between.
pub fn apply_fills(makers: &mut OrderList, plan: &FillPlan) -> Result<Vec<LimitOrder>> {
    if plan.fills.is_empty() {
        return Ok(Vec::new());
    }

    let mut retired = Vec::new();
    for fill in &plan.fills {
        if fill.filled {
            let order = makers
                .retire(fill.maker_id)
                .ok_or(PairbookError::OrderNotFound(fill.maker_id))?;
            retired.push(order);
        } else {
            let maker = makers
                .order_mut(fill.maker_id)
                .ok_or(PairbookError::OrderNotFound(fill.maker_id))?;
            maker.amount0 -= fill.swap0;
            maker.amount1 -= fill.swap1;
        }
    }
    makers.relink_head(plan.next_head);
    Ok(retired)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    fn asks(orders: &[(u32, u64, u64)]) -> OrderList {
        let mut list = OrderList::new(Side::Ask);
        for &(id, a0, a1) in orders {
            list.insert(LimitOrder::dummy(id, a0, a1), OrderId::HEAD).unwrap();
        }
        list
    }

    #[test]
    fn full_fill_empties_list() {
        let mut list = asks(&[(2, 10, 100)]);
        let plan = plan_fills(&list, Side::Bid, u(10), u(100)).unwrap();
        assert_eq!(plan.fills.len(), 1);
        assert_eq!(plan.fills[0].swap0, u(10));
        assert_eq!(plan.fills[0].swap1, u(100));
        assert!(plan.fills[0].filled);
        assert_eq!(plan.next_head, OrderId::TAIL);
        assert!(plan.is_complete());

        let retired = apply_fills(&mut list, &plan).unwrap();
        assert_eq!(retired.len(), 1);
        assert!(list.is_empty());
        assert_eq!(list.first_node(), OrderId::TAIL);
        list.assert_consistent();
    }

    #[test]
    fn partial_fill_keeps_maker_at_head() {
        let mut list = asks(&[(2, 10, 100)]);
        let plan = plan_fills(&list, Side::Bid, u(4), u(40)).unwrap();
        assert_eq!(plan.fills[0].swap0, u(4));
        assert_eq!(plan.fills[0].swap1, u(40));
        assert!(!plan.fills[0].filled);
        assert_eq!(plan.next_head, OrderId(2));

        apply_fills(&mut list, &plan).unwrap();
        let head = list.top_order().unwrap();
        assert_eq!(head.id, OrderId(2));
        assert_eq!((head.amount0, head.amount1), (u(6), u(60)));
        list.assert_consistent();
    }

    #[test]
    fn walks_levels_and_stops_at_limit() {
        // asks at 10, 11, 13; bid for 25 @ 12
        let mut list = asks(&[(2, 10, 100), (3, 10, 110), (4, 10, 130)]);
        let plan = plan_fills(&list, Side::Bid, u(25), u(300)).unwrap();
        assert_eq!(plan.fills.len(), 2);
        assert_eq!(plan.total_swap0(), u(20));
        assert_eq!(plan.total_swap1(), u(210));
        // taker allotted 240 at its own price
        assert_eq!(plan.total_improvement(), u(30));
        assert_eq!(plan.remaining0, u(5));
        assert_eq!(plan.remaining1, u(60));
        assert_eq!(plan.next_head, OrderId(4));

        apply_fills(&mut list, &plan).unwrap();
        assert_eq!(list.ids(), vec![OrderId(4)]);
        list.assert_consistent();
    }

    #[test]
    fn time_priority_within_a_price() {
        let list = asks(&[(2, 5, 50), (3, 5, 50)]);
        let plan = plan_fills(&list, Side::Bid, u(7), u(70)).unwrap();
        assert_eq!(plan.fills[0].maker_id, OrderId(2));
        assert!(plan.fills[0].filled);
        assert_eq!(plan.fills[1].maker_id, OrderId(3));
        assert_eq!(plan.fills[1].swap0, u(2));
    }

    #[test]
    fn ask_taker_trades_at_bid_price() {
        let mut bids = OrderList::new(Side::Bid);
        bids.insert(LimitOrder::dummy(2, 10, 120), OrderId::HEAD).unwrap();
        let plan = plan_fills(&bids, Side::Ask, u(10), u(100)).unwrap();
        assert_eq!(plan.fills[0].swap1, u(120));
        assert_eq!(plan.fills[0].used1, u(100));
    }

    #[test]
    fn no_overlap_is_empty_plan() {
        let list = asks(&[(2, 10, 100)]);
        let plan = plan_fills(&list, Side::Bid, u(10), u(90)).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.next_head, OrderId(2));
        assert_eq!(plan.remaining0, u(10));
    }

    #[test]
    fn inexact_swap_is_tick_mismatch() {
        // maker price 10/3, taker takes 1 unit: 1 * 10 / 3 is not whole.
        let list = asks(&[(2, 3, 10)]);
        let err = plan_fills(&list, Side::Bid, u(1), u(4)).unwrap_err();
        assert!(matches!(err, PairbookError::TickMismatch { .. }));
    }

    #[test]
    fn inexact_taker_reduction_is_tick_mismatch() {
        // maker 2 @ 20, taker 3 for 35: used1 = 35 * 2 / 3 is not whole.
        let list = asks(&[(2, 2, 20)]);
        let err = plan_fills(&list, Side::Bid, u(3), u(35)).unwrap_err();
        assert!(matches!(err, PairbookError::TickMismatch { .. }));
    }

    #[test]
    fn empty_plan_leaves_list_alone() {
        let mut list = asks(&[(2, 10, 100)]);
        let plan = plan_fills(&list, Side::Bid, u(1), u(1)).unwrap();
        assert!(apply_fills(&mut list, &plan).unwrap().is_empty());
        assert_eq!(list.ids(), vec![OrderId(2)]);
    }
}
