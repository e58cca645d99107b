//! One side of a book: a price-sorted, sentinel-bounded doubly linked list.
//!
//! Links live in a dense arena indexed by [`OrderId`]; order records live in
//! a map keyed by the same id. Slots `0` and `1` are the head and tail
//! sentinels and are never unlinked:
//!
//! ```text
//! HEAD(0) <-> best <-> ... <-> worst <-> TAIL(1)
//! ```
//!
//! The head sorts ahead of every real order and the tail behind every real
//! order, so walks never need a bounds check. Asks are sorted by ascending
//! price, bids by descending price; equal prices keep insertion order.
//!
//! Between [`begin`](OrderList::begin) and [`commit`](OrderList::commit)
//! every link and record write is journaled with its previous value, so
//! [`rollback`](OrderList::rollback) costs only as much as the batch touched.

use std::cmp::Ordering;
use std::collections::HashMap;

use pairbook_types::{LimitOrder, OrderId, PairbookError, Result, Side, U256};

use crate::price::rank;

/// Link record for one order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub prev: OrderId,
    pub next: OrderId,
    pub active: bool,
}

/// An unused slot: inactive, pointing at the sentinels.
impl Default for Node {
    fn default() -> Self {
        Self {
            prev: OrderId::HEAD,
            next: OrderId::TAIL,
            active: false,
        }
    }
}

/// One undoable write.
#[derive(Debug, Clone)]
enum Undo {
    /// A link slot and its previous contents.
    Node(OrderId, Node),
    /// An order record and its previous value (`None` if it was absent).
    Order(OrderId, Option<LimitOrder>),
    /// The arena grew from this length.
    Grow(usize),
}

/// A price-sorted list of resting orders for one side of a book.
#[derive(Debug, Clone)]
pub struct OrderList {
    side: Side,
    nodes: Vec<Node>,
    orders: HashMap<OrderId, LimitOrder>,
    /// `Some` while a transaction is open.
    journal: Option<Vec<Undo>>,
}

impl OrderList {
    /// Create an empty list: the head sentinel linked straight to the tail.
    #[must_use]
    pub fn new(side: Side) -> Self {
        let sentinel = Node {
            prev: OrderId::HEAD,
            next: OrderId::TAIL,
            active: true,
        };
        Self {
            side,
            nodes: vec![sentinel, sentinel],
            orders: HashMap::new(),
            journal: None,
        }
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Whether `id` is a real order currently linked into this list.
    #[must_use]
    pub fn is_active(&self, id: OrderId) -> bool {
        !id.is_sentinel() && self.node(id).is_some_and(|n| n.active)
    }

    /// Id of the best order, or [`OrderId::TAIL`] when the list is empty.
    #[must_use]
    pub fn first_node(&self) -> OrderId {
        self.nodes[OrderId::HEAD.index()].next
    }

    /// Successor of `id` in the chain.
    #[must_use]
    pub fn next_of(&self, id: OrderId) -> OrderId {
        self.node(id).map_or(OrderId::TAIL, |n| n.next)
    }

    /// Predecessor of `id` in the chain.
    #[must_use]
    pub fn prev_of(&self, id: OrderId) -> OrderId {
        self.node(id).map_or(OrderId::HEAD, |n| n.prev)
    }

    /// The best-priced resting order, if any.
    #[must_use]
    pub fn top_order(&self) -> Option<&LimitOrder> {
        self.orders.get(&self.first_node())
    }

    #[must_use]
    pub fn get(&self, id: OrderId) -> Option<&LimitOrder> {
        self.orders.get(&id)
    }

    /// Snapshot of every active order, best first.
    #[must_use]
    pub fn orders(&self) -> Vec<LimitOrder> {
        let mut out = Vec::with_capacity(self.orders.len());
        let mut cursor = self.first_node();
        while cursor != OrderId::TAIL {
            if let Some(order) = self.orders.get(&cursor) {
                out.push(order.clone());
            }
            cursor = self.next_of(cursor);
        }
        out
    }

    /// Number of active orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Id after which an order priced `amount1 / amount0` would be linked.
    ///
    /// Read-only; callers use it to compute an insertion hint off the
    /// critical path.
    #[must_use]
    pub fn mock_index_to_insert(&self, amount0: U256, amount1: U256) -> OrderId {
        self.find_predecessor(amount0, amount1, OrderId::HEAD)
    }

    // =================================================================
    // Mutation
    // =================================================================

    /// Store `order` and link it at its sorted position, walking from `hint`.
    ///
    /// A hint that is not a sentinel or an active order is ignored and the
    /// walk starts from the head.
    pub fn insert(&mut self, order: LimitOrder, hint: OrderId) -> Result<()> {
        let id = order.id;
        if id.is_sentinel() {
            return Err(PairbookError::Internal(format!(
                "cannot insert sentinel id {id}"
            )));
        }
        if order.is_filled() {
            return Err(PairbookError::Internal(format!(
                "cannot rest filled order {id}"
            )));
        }
        if self.is_active(id) {
            return Err(PairbookError::Internal(format!(
                "order {id} is already linked"
            )));
        }

        let start = if self.is_linked(hint) { hint } else { OrderId::HEAD };
        let prev = self.find_predecessor(order.amount0, order.amount1, start);
        self.touch_order(id);
        self.orders.insert(id, order);
        self.link_after(id, prev);
        Ok(())
    }

    /// Overwrite the remaining amounts of an active order without moving it.
    pub fn set_amounts(&mut self, id: OrderId, amount0: U256, amount1: U256) -> Result<()> {
        let order = self
            .order_mut(id)
            .ok_or(PairbookError::OrderNotFound(id))?;
        order.amount0 = amount0;
        order.amount1 = amount1;
        Ok(())
    }

    /// Re-sort an active order after its price changed.
    ///
    /// Equivalent to erase + insert: the order moves behind any orders already
    /// resting at its new price.
    pub fn update(&mut self, id: OrderId, hint: OrderId) -> Result<()> {
        if !self.is_active(id) {
            return Err(PairbookError::OrderNotFound(id));
        }
        let (amount0, amount1) = {
            let order = self.orders.get(&id).ok_or(PairbookError::OrderNotFound(id))?;
            (order.amount0, order.amount1)
        };
        let old_prev = self.prev_of(id);
        self.unlink(id);

        let start = if hint != id && self.is_linked(hint) {
            hint
        } else if self.is_linked(old_prev) {
            old_prev
        } else {
            OrderId::HEAD
        };
        let prev = self.find_predecessor(amount0, amount1, start);
        self.link_after(id, prev);
        Ok(())
    }

    /// Unlink an active order and drop its record.
    ///
    /// Returns the removed record, or `None` if `id` was not active.
    pub fn erase(&mut self, id: OrderId) -> Option<LimitOrder> {
        if !self.is_active(id) {
            return None;
        }
        self.unlink(id);
        self.touch_order(id);
        self.orders.remove(&id)
    }

    // =================================================================
    // Fill-loop primitives
    // =================================================================

    /// Overwrite a maker's amounts during a fill.
    pub(crate) fn order_mut(&mut self, id: OrderId) -> Option<&mut LimitOrder> {
        self.touch_order(id);
        self.orders.get_mut(&id)
    }

    /// Deactivate a fully filled front order without repairing links.
    ///
    /// Only valid for a run of orders starting at the head; the caller must
    /// follow up with [`relink_head`](Self::relink_head).
    pub(crate) fn retire(&mut self, id: OrderId) -> Option<LimitOrder> {
        self.node(id)?;
        self.edit_node(id, |n| n.active = false);
        self.touch_order(id);
        self.orders.remove(&id)
    }

    /// Point the head sentinel at `first`, dropping every retired order
    /// between them in a single splice.
    pub(crate) fn relink_head(&mut self, first: OrderId) {
        self.edit_node(OrderId::HEAD, |n| n.next = first);
        if self.node(first).is_some() {
            self.edit_node(first, |n| n.prev = OrderId::HEAD);
        }
    }

    // =================================================================
    // Transactions
    // =================================================================

    /// Start journaling writes. Opening one while another is open keeps
    /// the outer journal.
    pub fn begin(&mut self) {
        if self.journal.is_none() {
            self.journal = Some(Vec::new());
        }
    }

    /// Keep every write since [`begin`](Self::begin).
    pub fn commit(&mut self) {
        self.journal = None;
    }

    /// Undo every write since [`begin`](Self::begin), newest first.
    ///
    /// Returns the number of writes undone.
    pub fn rollback(&mut self) -> usize {
        let Some(journal) = self.journal.take() else {
            return 0;
        };
        let undone = journal.len();
        for entry in journal.into_iter().rev() {
            match entry {
                Undo::Node(id, node) => self.nodes[id.index()] = node,
                Undo::Order(id, Some(order)) => {
                    self.orders.insert(id, order);
                }
                Undo::Order(id, None) => {
                    self.orders.remove(&id);
                }
                Undo::Grow(len) => self.nodes.truncate(len),
            }
        }
        undone
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.journal.is_some()
    }

    // =================================================================
    // Internals
    // =================================================================

    fn node(&self, id: OrderId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Sentinels and active orders are valid walk starting points.
    fn is_linked(&self, id: OrderId) -> bool {
        id.is_sentinel() || self.is_active(id)
    }

    /// Position of a candidate priced `amount1 / amount0` against `resident`.
    ///
    /// `Less` means the candidate sorts strictly ahead of `resident`.
    fn rank_against(&self, amount0: U256, amount1: U256, resident: OrderId) -> Ordering {
        if resident == OrderId::HEAD {
            return Ordering::Greater;
        }
        if resident == OrderId::TAIL {
            return Ordering::Less;
        }
        match self.orders.get(&resident) {
            Some(r) => rank(self.side, amount0, amount1, r.amount0, r.amount1),
            None => Ordering::Greater,
        }
    }

    /// Find the id the candidate must follow: the last node it does not
    /// outrank, whose successor it strictly outranks.
    fn find_predecessor(&self, amount0: U256, amount1: U256, start: OrderId) -> OrderId {
        let mut cursor = start;
        while self.rank_against(amount0, amount1, cursor) == Ordering::Less {
            cursor = self.prev_of(cursor);
        }
        loop {
            let next = self.next_of(cursor);
            if self.rank_against(amount0, amount1, next) == Ordering::Less {
                return cursor;
            }
            cursor = next;
        }
    }

    /// Journal the current contents of slot `id`, then edit it in place.
    fn edit_node(&mut self, id: OrderId, edit: impl FnOnce(&mut Node)) {
        let slot = &mut self.nodes[id.index()];
        if let Some(journal) = self.journal.as_mut() {
            journal.push(Undo::Node(id, *slot));
        }
        edit(slot);
    }

    /// Journal the current record of `id` ahead of a write to it.
    fn touch_order(&mut self, id: OrderId) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(Undo::Order(id, self.orders.get(&id).cloned()));
        }
    }

    fn link_after(&mut self, id: OrderId, prev: OrderId) {
        if self.nodes.len() <= id.index() {
            if let Some(journal) = self.journal.as_mut() {
                journal.push(Undo::Grow(self.nodes.len()));
            }
            self.nodes.resize(id.index() + 1, Node::default());
        }
        let next = self.nodes[prev.index()].next;
        self.edit_node(id, |n| {
            *n = Node {
                prev,
                next,
                active: true,
            };
        });
        self.edit_node(prev, |n| n.next = id);
        self.edit_node(next, |n| n.prev = id);
    }

    fn unlink(&mut self, id: OrderId) {
        let Node { prev, next, .. } = self.nodes[id.index()];
        self.edit_node(prev, |n| n.next = next);
        self.edit_node(next, |n| n.prev = prev);
        self.edit_node(id, |n| n.active = false);
    }
}

/// Invariant checks for test suites.
#[cfg(any(test, feature = "test-helpers"))]
impl OrderList {
    /// Panic unless the chain is consistent: links are symmetric, every
    /// active order is reachable exactly once, and prices never improve
    /// walking from head to tail.
    pub fn assert_consistent(&self) {
        let mut seen = 0usize;
        let mut prev = OrderId::HEAD;
        let mut cursor = self.first_node();
        let mut last: Option<&LimitOrder> = None;
        while cursor != OrderId::TAIL {
            assert!(self.is_active(cursor), "inactive order {cursor} linked");
            assert_eq!(self.prev_of(cursor), prev, "broken prev link at {cursor}");
            let order = self.orders.get(&cursor).expect("linked order has a record");
            assert!(!order.is_filled(), "filled order {cursor} still resting");
            if let Some(before) = last {
                let ord = rank(
                    self.side,
                    before.amount0,
                    before.amount1,
                    order.amount0,
                    order.amount1,
                );
                assert_ne!(ord, Ordering::Greater, "{} list out of order at {cursor}", self.side);
            }
            last = Some(order);
            seen += 1;
            prev = cursor;
            cursor = self.next_of(cursor);
        }
        assert_eq!(self.prev_of(OrderId::TAIL), prev, "tail prev link broken");
        assert_eq!(seen, self.orders.len(), "records and links disagree");
    }

    /// Ids in chain order, head to tail.
    pub fn ids(&self) -> Vec<OrderId> {
        self.orders().into_iter().map(|o| o.id).collect()
    }
}
