//! The order book for a single asset pair.
//!
//! Owns one ask list and one bid list and exposes the four mutating
//! operations: create, update and cancel of resting orders, and
//! immediate-or-cancel market orders. Funds move only through the
//! [`Ledger`] passed into each call:
//!
//! - the taker's full offer is debited before any fill is applied;
//! - each maker is credited the asset it bought, at its own price;
//! - the taker is credited what it bought, plus any quote it saved by
//!   trading at better prices than its own.
//!
//! Every operation plans its fills before its first side effect, so input
//! and exactness errors leave both the book and the ledger untouched. A
//! ledger failure after that point leaves the book half-applied; callers
//! that need all-or-nothing batches bracket them with [`OrderBook::begin`]
//! and [`OrderBook::rollback`] and roll the ledger back too (the router does
//! both). Rollback undoes only the writes the batch made.
//!
//! Events accumulate in the book until [`OrderBook::drain_events`] takes
//! them. Callers that drive a book directly must drain it themselves.

use pairbook_types::{
    BookConfig, BookEvent, BookId, BookInfo, Identity, Ledger, LimitOrder, LimitOrderSnapshot,
    OrderId, PairbookError, Result, Side, TransferRequest, U256, constants,
};

use crate::matcher::{FillPlan, apply_fills, plan_fills};
use crate::order_list::OrderList;
use crate::ticks::TickModel;

/// Order book for one `asset0/asset1` pair.
#[derive(Debug, Clone)]
pub struct OrderBook {
    info: BookInfo,
    ticks: TickModel,
    asks: OrderList,
    bids: OrderList,
    /// Next id to hand out. Starts past the two sentinels.
    order_id_counter: u32,
    /// Emitted since the last drain.
    events: Vec<BookEvent>,
    /// State to restore on rollback, `Some` while a transaction is open.
    mark: Option<BookMark>,
}

/// Scalar book state captured by [`OrderBook::begin`].
#[derive(Debug, Clone, Copy)]
struct BookMark {
    order_id_counter: u32,
    events_len: usize,
}

impl OrderBook {
    /// Create an empty book. Fails on an invalid tick configuration.
    pub fn new(book_id: BookId, config: &BookConfig) -> Result<Self> {
        let ticks = TickModel::new(config)?;
        Ok(Self {
            info: BookInfo {
                book_id,
                asset0: config.asset0,
                asset1: config.asset1,
            },
            ticks,
            asks: OrderList::new(Side::Ask),
            bids: OrderList::new(Side::Bid),
            order_id_counter: OrderId::FIRST.0,
            events: Vec::new(),
            mark: None,
        })
    }

    // =================================================================
    // Transactions
    // =================================================================

    /// Start journaling. Opening one while another is open keeps the outer
    /// transaction.
    pub fn begin(&mut self) {
        if self.mark.is_none() {
            self.mark = Some(BookMark {
                order_id_counter: self.order_id_counter,
                events_len: self.events.len(),
            });
        }
        self.asks.begin();
        self.bids.begin();
    }

    /// Keep everything since [`begin`](Self::begin).
    pub fn commit(&mut self) {
        self.mark = None;
        self.asks.commit();
        self.bids.commit();
    }

    /// Restore links, records, the id counter and the event buffer to
    /// their state at [`begin`](Self::begin).
    pub fn rollback(&mut self) {
        let Some(mark) = self.mark.take() else {
            return;
        };
        let undone = self.asks.rollback() + self.bids.rollback();
        self.order_id_counter = mark.order_id_counter;
        self.events.truncate(mark.events_len);
        tracing::debug!(book = %self.info.book_id, writes = undone, "Book rolled back");
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.mark.is_some()
    }

    // =================================================================
    // Mutating operations
    // =================================================================

    /// Place a limit order. Whatever does not match immediately rests on
    /// the book, linked by walking from `hint`.
    ///
    /// Returns the id allocated to the order, even if it filled completely.
    pub fn create_limit_order(
        &mut self,
        amount0_base: u64,
        price_base: u64,
        side: Side,
        owner: Identity,
        hint: OrderId,
        ledger: &mut dyn Ledger,
    ) -> Result<OrderId> {
        self.check_hint(hint)?;
        let (amount0, amount1) = self.ticks.to_amounts(amount0_base, price_base)?;
        let (id, next_counter) = self.peek_order_id()?;
        let plan = plan_fills(self.list(side.opposite()), side, amount0, amount1)?;

        self.debit_escrow(owner, side, amount0, amount1, ledger)?;
        self.order_id_counter = next_counter;
        self.events.push(BookEvent::LimitOrderCreated {
            book_id: self.info.book_id,
            id,
            owner,
            amount0,
            amount1,
            side,
        });

        self.execute_fills(id, owner, &plan, ledger)?;

        if !plan.is_complete() {
            let order = LimitOrder::new(id, owner, plan.remaining0, plan.remaining1);
            self.list_mut(side).insert(order, hint)?;
        }

        tracing::debug!(
            book = %self.info.book_id,
            order = %id,
            %side,
            owner = %owner,
            fills = plan.fills.len(),
            resting = !plan.is_complete(),
            "Limit order created"
        );
        Ok(id)
    }

    /// Resize and reprice a resting order.
    ///
    /// Returns `Ok(false)` without side effects if `id` is not active, so a
    /// batch may carry stale ids. Funds are rebalanced against the order's
    /// previous size, then the order is matched again at its new price and
    /// re-spliced, losing its time priority.
    pub fn update_limit_order(
        &mut self,
        id: OrderId,
        amount0_base: u64,
        price_base: u64,
        owner: Identity,
        hint: OrderId,
        ledger: &mut dyn Ledger,
    ) -> Result<bool> {
        let Some((current, side)) = self.order(id) else {
            return Ok(false);
        };
        if current.owner != owner {
            return Err(PairbookError::NotOrderOwner { order_id: id, caller: owner });
        }
        let old_escrow = current.escrowed(side);

        self.check_hint(hint)?;
        let (amount0, amount1) = self.ticks.to_amounts(amount0_base, price_base)?;
        let plan = plan_fills(self.list(side.opposite()), side, amount0, amount1)?;

        let new_escrow = match side {
            Side::Ask => amount0,
            Side::Bid => amount1,
        };
        if new_escrow > old_escrow {
            ledger.debit_account(&self.transfer(owner, new_escrow - old_escrow, side.is_ask()))?;
        } else if new_escrow < old_escrow {
            ledger.credit_account(&self.transfer(owner, old_escrow - new_escrow, side.is_ask()))?;
        }
        self.events.push(BookEvent::LimitOrderUpdated {
            book_id: self.info.book_id,
            id,
            owner,
            amount0,
            amount1,
            side,
        });

        self.execute_fills(id, owner, &plan, ledger)?;

        let list = self.list_mut(side);
        if plan.is_complete() {
            list.erase(id);
        } else {
            list.set_amounts(id, plan.remaining0, plan.remaining1)?;
            list.update(id, hint)?;
        }

        tracing::debug!(
            book = %self.info.book_id,
            order = %id,
            %side,
            fills = plan.fills.len(),
            resting = !plan.is_complete(),
            "Limit order updated"
        );
        Ok(true)
    }

    /// Cancel a resting order and refund its full remaining escrow.
    ///
    /// Returns `Ok(false)` if `id` is not active.
    pub fn cancel_limit_order(
        &mut self,
        id: OrderId,
        owner: Identity,
        ledger: &mut dyn Ledger,
    ) -> Result<bool> {
        let Some((order, side)) = self.order(id) else {
            return Ok(false);
        };
        if order.owner != owner {
            return Err(PairbookError::NotOrderOwner { order_id: id, caller: owner });
        }
        let (amount0, amount1) = (order.amount0, order.amount1);

        ledger.credit_account(&self.transfer(owner, order.escrowed(side), side.is_ask()))?;
        self.list_mut(side).erase(id);
        self.events.push(BookEvent::LimitOrderCanceled {
            book_id: self.info.book_id,
            id,
            owner,
            amount0,
            amount1,
            side,
        });

        tracing::debug!(book = %self.info.book_id, order = %id, %side, "Limit order canceled");
        Ok(true)
    }

    /// Match immediately up to the price bound and never rest.
    ///
    /// The unmatched part of the offer is refunded in the same call.
    pub fn create_market_order(
        &mut self,
        amount0_base: u64,
        price_base: u64,
        side: Side,
        owner: Identity,
        ledger: &mut dyn Ledger,
    ) -> Result<OrderId> {
        let (amount0, amount1) = self.ticks.to_amounts(amount0_base, price_base)?;
        let (id, next_counter) = self.peek_order_id()?;
        let plan = plan_fills(self.list(side.opposite()), side, amount0, amount1)?;

        self.debit_escrow(owner, side, amount0, amount1, ledger)?;
        self.order_id_counter = next_counter;
        self.events.push(BookEvent::MarketOrderCreated {
            book_id: self.info.book_id,
            id,
            owner,
            amount0,
            amount1,
            side,
        });

        self.execute_fills(id, owner, &plan, ledger)?;

        let unfilled = match side {
            Side::Ask => plan.remaining0,
            Side::Bid => plan.remaining1,
        };
        if !unfilled.is_zero() {
            ledger.credit_account(&self.transfer(owner, unfilled, side.is_ask()))?;
        }

        tracing::debug!(
            book = %self.info.book_id,
            order = %id,
            %side,
            fills = plan.fills.len(),
            unfilled = %unfilled,
            "Market order executed"
        );
        Ok(id)
    }

    // =================================================================
    // Reads
    // =================================================================

    /// Every active order, asks best-first then bids best-first.
    #[must_use]
    pub fn limit_orders(&self) -> LimitOrderSnapshot {
        let mut snapshot = LimitOrderSnapshot::default();
        for order in self.asks.orders() {
            snapshot.push(&order, Side::Ask);
        }
        for order in self.bids.orders() {
            snapshot.push(&order, Side::Bid);
        }
        snapshot
    }

    #[must_use]
    pub fn best_ask(&self) -> Option<&LimitOrder> {
        self.asks.top_order()
    }

    #[must_use]
    pub fn best_bid(&self) -> Option<&LimitOrder> {
        self.bids.top_order()
    }

    #[must_use]
    pub fn is_order_active(&self, id: OrderId) -> bool {
        self.asks.is_active(id) || self.bids.is_active(id)
    }

    /// An active order and the side it rests on.
    #[must_use]
    pub fn order(&self, id: OrderId) -> Option<(&LimitOrder, Side)> {
        self.asks
            .get(id)
            .map(|o| (o, Side::Ask))
            .or_else(|| self.bids.get(id).map(|o| (o, Side::Bid)))
    }

    /// The hint that makes an insertion at `amount1 / amount0` on `side`
    /// link without walking.
    #[must_use]
    pub fn mock_index_to_insert(&self, amount0: U256, amount1: U256, side: Side) -> OrderId {
        self.list(side).mock_index_to_insert(amount0, amount1)
    }

    /// Take the buffered events, oldest first.
    ///
    /// The buffer is never trimmed otherwise, so a long-lived book must be
    /// drained after each batch.
    pub fn drain_events(&mut self) -> Vec<BookEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn pending_events(&self) -> &[BookEvent] {
        &self.events
    }

    #[must_use]
    pub fn info(&self) -> &BookInfo {
        &self.info
    }

    #[must_use]
    pub fn book_id(&self) -> BookId {
        self.info.book_id
    }

    #[must_use]
    pub fn ticks(&self) -> &TickModel {
        &self.ticks
    }

    #[must_use]
    pub fn size_tick(&self) -> U256 {
        self.ticks.size_tick()
    }

    #[must_use]
    pub fn price_tick(&self) -> U256 {
        self.ticks.price_tick()
    }

    #[must_use]
    pub fn price_multiplier(&self) -> U256 {
        self.ticks.price_multiplier()
    }

    #[must_use]
    pub fn price_divider(&self) -> U256 {
        self.ticks.price_divider()
    }

    /// The id the next order will receive.
    #[must_use]
    pub fn order_id_counter(&self) -> OrderId {
        OrderId(self.order_id_counter)
    }

    #[must_use]
    pub fn ask_len(&self) -> usize {
        self.asks.len()
    }

    #[must_use]
    pub fn bid_len(&self) -> usize {
        self.bids.len()
    }

    #[must_use]
    pub fn asks(&self) -> &OrderList {
        &self.asks
    }

    #[must_use]
    pub fn bids(&self) -> &OrderList {
        &self.bids
    }

    // =================================================================
    // Internals
    // =================================================================

    fn list(&self, side: Side) -> &OrderList {
        match side {
            Side::Ask => &self.asks,
            Side::Bid => &self.bids,
        }
    }

    fn list_mut(&mut self, side: Side) -> &mut OrderList {
        match side {
            Side::Ask => &mut self.asks,
            Side::Bid => &mut self.bids,
        }
    }

    /// A hint may name any id already handed out, or a sentinel.
    fn check_hint(&self, hint: OrderId) -> Result<()> {
        if hint.0 >= self.order_id_counter {
            return Err(PairbookError::InvalidHint {
                hint,
                next_id: OrderId(self.order_id_counter),
            });
        }
        Ok(())
    }

    /// The next id and the counter value after it, without committing.
    fn peek_order_id(&self) -> Result<(OrderId, u32)> {
        if self.order_id_counter >= constants::MAX_ORDER_ID {
            return Err(PairbookError::OrderIdExhausted);
        }
        Ok((OrderId(self.order_id_counter), self.order_id_counter + 1))
    }

    fn transfer(&self, account: Identity, amount: U256, is_asset0: bool) -> TransferRequest {
        TransferRequest::for_book(&self.info, account, amount, is_asset0)
    }

    /// Pull a taker's full offer into custody: asset0 for asks, asset1 for bids.
    fn debit_escrow(
        &self,
        owner: Identity,
        side: Side,
        amount0: U256,
        amount1: U256,
        ledger: &mut dyn Ledger,
    ) -> Result<()> {
        let amount = match side {
            Side::Ask => amount0,
            Side::Bid => amount1,
        };
        ledger.debit_account(&self.transfer(owner, amount, side.is_ask()))
    }

    /// Pay makers, record swaps, update the maker list and settle the taker.
    fn execute_fills(
        &mut self,
        taker_id: OrderId,
        taker_owner: Identity,
        plan: &FillPlan,
        ledger: &mut dyn Ledger,
    ) -> Result<()> {
        if plan.is_empty() {
            return Ok(());
        }
        let taker_side = plan.taker_side;

        for fill in &plan.fills {
            // The maker receives the asset the taker offers.
            match taker_side {
                Side::Bid => {
                    ledger.credit_account(&self.transfer(fill.maker_owner, fill.swap1, false))?;
                }
                Side::Ask => {
                    ledger.credit_account(&self.transfer(fill.maker_owner, fill.swap0, true))?;
                }
            }

            let (ask_id, ask_owner, bid_id, bid_owner) = match taker_side {
                Side::Bid => (fill.maker_id, fill.maker_owner, taker_id, taker_owner),
                Side::Ask => (taker_id, taker_owner, fill.maker_id, fill.maker_owner),
            };
            self.events.push(BookEvent::Swap {
                book_id: self.info.book_id,
                ask_id,
                ask_owner,
                bid_id,
                bid_owner,
                amount0: fill.swap0,
                amount1: fill.swap1,
            });

            tracing::debug!(
                book = %self.info.book_id,
                taker = %taker_id,
                maker = %fill.maker_id,
                amount0 = %fill.swap0,
                amount1 = %fill.swap1,
                maker_filled = fill.filled,
                "Swap"
            );
        }

        apply_fills(self.list_mut(taker_side.opposite()), plan)?;

        match taker_side {
            Side::Bid => {
                let improvement = plan.total_improvement();
                if !improvement.is_zero() {
                    ledger.credit_account(&self.transfer(taker_owner, improvement, false))?;
                }
                ledger.credit_account(&self.transfer(taker_owner, plan.total_swap0(), true))?;
            }
            Side::Ask => {
                ledger.credit_account(&self.transfer(taker_owner, plan.total_swap1(), false))?;
            }
        }
        Ok(())
    }
}
