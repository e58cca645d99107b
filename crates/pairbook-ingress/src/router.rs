//! The entry point: decode, authenticate, and run calls atomically.
//!
//! Every call is a batch against one book. The router opens a transaction
//! on the book and on the ledger and runs the batch's operations in order.
//! The first error rolls both back and is returned to the caller; otherwise the transaction commits and the
//! book's events come back in a [`BatchReceipt`].
//!
//! The router holds the only `&mut` path to both the books and the ledger,
//! and a ledger never sees a book, so no ledger callback can re-enter a
//! book operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pairbook_matchcore::{OrderBook, compute_event_root};
use pairbook_types::{
    BookConfig, BookEvent, BookId, CustodyLedger, ExchangeConfig, Identity, Ledger, OrderId,
    PairbookError, Result,
};

use crate::auth::{CallAuthenticator, SignedCall};
use crate::calldata::{Call, CallOutcome, LimitOrderUpdate, MarketOrder, NewLimitOrder};
use crate::registry::BookRegistry;

/// Result of a committed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReceipt {
    pub book_id: BookId,
    pub caller: Identity,
    pub outcome: CallOutcome,
    /// Everything the book emitted during the batch, in order.
    pub events: Vec<BookEvent>,
    /// [`compute_event_root`] over `events`.
    pub event_root: [u8; 32],
    pub executed_at: DateTime<Utc>,
}

/// Owns the books, the ledger and the nonce table.
#[derive(Debug)]
pub struct Router<L: CustodyLedger> {
    registry: BookRegistry,
    ledger: L,
    auth: CallAuthenticator,
}

impl<L: CustodyLedger> Router<L> {
    #[must_use]
    pub fn new(ledger: L) -> Self {
        Self {
            registry: BookRegistry::new(),
            ledger,
            auth: CallAuthenticator::new(),
        }
    }

    /// Build a router with every book in `config` created in order.
    pub fn from_config(config: &ExchangeConfig, ledger: L) -> Result<Self> {
        config.validate()?;
        let mut router = Self::new(ledger);
        for book in &config.books {
            router.create_book(book)?;
        }
        Ok(router)
    }

    /// Register a book and authorize it with the ledger.
    pub fn create_book(&mut self, config: &BookConfig) -> Result<BookId> {
        let book_id = self.registry.create_book(config)?;
        let info = *self.registry.book(book_id)?.info();
        self.ledger.authorize_book(&info)?;
        Ok(book_id)
    }

    // =================================================================
    // Execution
    // =================================================================

    /// Verify a signed call, run it as its signer, and consume its nonce
    /// if it commits.
    pub fn execute_signed(&mut self, signed: &SignedCall) -> Result<BatchReceipt> {
        let caller = self.auth.authenticate(signed)?;
        let receipt = self.execute(caller, &signed.calldata)?;
        self.auth.consume(caller, signed.nonce);
        Ok(receipt)
    }

    /// Decode and run raw calldata on behalf of an already authenticated
    /// `caller`.
    pub fn execute(&mut self, caller: Identity, calldata: &[u8]) -> Result<BatchReceipt> {
        let call = Call::decode(calldata)?;
        self.execute_call(caller, &call)
    }

    /// Run a decoded call as one all-or-nothing batch.
    pub fn execute_call(&mut self, caller: Identity, call: &Call) -> Result<BatchReceipt> {
        let book_id = call.book_id();
        let book = self.registry.book_mut(book_id)?;

        book.begin();
        self.ledger.begin();
        match run_call(book, caller, call, &mut self.ledger) {
            Ok(outcome) => {
                book.commit();
                self.ledger.commit();
                let events = book.drain_events();
                let event_root = compute_event_root(&events);
                tracing::info!(
                    book = %book_id,
                    caller = %caller.short(),
                    ops = call.len(),
                    events = events.len(),
                    event_root = hex::encode(event_root),
                    "Batch committed"
                );
                Ok(BatchReceipt {
                    book_id,
                    caller,
                    outcome,
                    events,
                    event_root,
                    executed_at: Utc::now(),
                })
            }
            Err(err) => {
                book.rollback();
                self.ledger.rollback();
                tracing::warn!(
                    book = %book_id,
                    caller = %caller.short(),
                    ops = call.len(),
                    error = %err,
                    "Batch rolled back"
                );
                Err(err)
            }
        }
    }

    // =================================================================
    // Typed helpers
    // =================================================================

    pub fn create_limit_orders(
        &mut self,
        caller: Identity,
        book_id: BookId,
        orders: Vec<NewLimitOrder>,
    ) -> Result<Vec<OrderId>> {
        match self
            .execute_call(caller, &Call::CreateLimitOrders { book_id, orders })?
            .outcome
        {
            CallOutcome::Created(ids) => Ok(ids),
            other => Err(unexpected(&other)),
        }
    }

    pub fn update_limit_orders(
        &mut self,
        caller: Identity,
        book_id: BookId,
        updates: Vec<LimitOrderUpdate>,
    ) -> Result<Vec<bool>> {
        match self
            .execute_call(caller, &Call::UpdateLimitOrders { book_id, updates })?
            .outcome
        {
            CallOutcome::Updated(flags) => Ok(flags),
            other => Err(unexpected(&other)),
        }
    }

    pub fn cancel_limit_orders(
        &mut self,
        caller: Identity,
        book_id: BookId,
        ids: Vec<OrderId>,
    ) -> Result<Vec<bool>> {
        match self
            .execute_call(caller, &Call::CancelLimitOrders { book_id, ids })?
            .outcome
        {
            CallOutcome::Canceled(flags) => Ok(flags),
            other => Err(unexpected(&other)),
        }
    }

    pub fn create_market_order(
        &mut self,
        caller: Identity,
        book_id: BookId,
        order: MarketOrder,
    ) -> Result<OrderId> {
        match self
            .execute_call(caller, &Call::CreateMarketOrder { book_id, order })?
            .outcome
        {
            CallOutcome::MarketExecuted(id) => Ok(id),
            other => Err(unexpected(&other)),
        }
    }

    // =================================================================
    // Accessors
    // =================================================================

    pub fn book(&self, book_id: BookId) -> Result<&OrderBook> {
        self.registry.book(book_id)
    }

    #[must_use]
    pub fn registry(&self) -> &BookRegistry {
        &self.registry
    }

    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Direct ledger access for deposits and withdrawals between batches.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    #[must_use]
    pub fn authenticator(&self) -> &CallAuthenticator {
        &self.auth
    }
}

fn run_call<L: Ledger>(
    book: &mut OrderBook,
    caller: Identity,
    call: &Call,
    ledger: &mut L,
) -> Result<CallOutcome> {
    match call {
        Call::CreateLimitOrders { orders, .. } => {
            let mut ids = Vec::with_capacity(orders.len());
            for o in orders {
                ids.push(book.create_limit_order(
                    o.amount0_base,
                    o.price_base,
                    o.side,
                    caller,
                    o.hint,
                    ledger,
                )?);
            }
            Ok(CallOutcome::Created(ids))
        }
        Call::UpdateLimitOrders { updates, .. } => {
            let mut flags = Vec::with_capacity(updates.len());
            for u in updates {
                flags.push(book.update_limit_order(
                    u.id,
                    u.amount0_base,
                    u.price_base,
                    caller,
                    u.hint,
                    ledger,
                )?);
            }
            Ok(CallOutcome::Updated(flags))
        }
        Call::CancelLimitOrders { ids, .. } => {
            let mut flags = Vec::with_capacity(ids.len());
            for &id in ids {
                flags.push(book.cancel_limit_order(id, caller, ledger)?);
            }
            Ok(CallOutcome::Canceled(flags))
        }
        Call::CreateMarketOrder { order, .. } => {
            let id = book.create_market_order(
                order.amount0_base,
                order.price_base,
                order.side,
                caller,
                ledger,
            )?;
            Ok(CallOutcome::MarketExecuted(id))
        }
    }
}

fn unexpected(outcome: &CallOutcome) -> PairbookError {
    PairbookError::Internal(format!("call returned mismatched outcome {outcome:?}"))
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use ed25519_dalek::SigningKey;
    use pairbook_matchcore::verify_event_root;
    use pairbook_types::{AssetId, BookInfo, Side, TransferRequest, U256};

    use super::*;

    type Balances = HashMap<(AssetId, Identity), U256>;

    /// Balance map with whole-state snapshots for transactions.
    #[derive(Debug, Default)]
    struct SnapshotLedger {
        balances: Balances,
        custody: HashMap<AssetId, U256>,
        authorized: HashSet<BookId>,
        saved: Option<(Balances, HashMap<AssetId, U256>)>,
        commits: usize,
        rollbacks: usize,
    }

    impl SnapshotLedger {
        fn fund(&mut self, asset: AssetId, who: Identity, amount: u64) {
            *self.balances.entry((asset, who)).or_default() += U256::from(amount);
        }

        fn balance(&self, asset: AssetId, who: Identity) -> U256 {
            self.balances.get(&(asset, who)).copied().unwrap_or_default()
        }
    }

    impl Ledger for SnapshotLedger {
        fn credit_account(&mut self, req: &TransferRequest) -> Result<()> {
            let held = self.custody.get(&req.asset).copied().unwrap_or_default();
            if held < req.amount {
                return Err(PairbookError::InsufficientCustody {
                    book_id: req.book_id,
                    asset: req.asset,
                    needed: req.amount,
                    available: held,
                });
            }
            self.custody.insert(req.asset, held - req.amount);
            *self.balances.entry((req.asset, req.account)).or_default() += req.amount;
            Ok(())
        }

        fn debit_account(&mut self, req: &TransferRequest) -> Result<()> {
            let available = self.balance(req.asset, req.account);
            if available < req.amount {
                return Err(PairbookError::InsufficientBalance {
                    asset: req.asset,
                    account: req.account,
                    needed: req.amount,
                    available,
                });
            }
            self.balances.insert((req.asset, req.account), available - req.amount);
            *self.custody.entry(req.asset).or_default() += req.amount;
            Ok(())
        }
    }

    impl CustodyLedger for SnapshotLedger {
        fn authorize_book(&mut self, book: &BookInfo) -> Result<()> {
            self.authorized.insert(book.book_id);
            Ok(())
        }

        fn begin(&mut self) {
            self.saved = Some((self.balances.clone(), self.custody.clone()));
        }

        fn commit(&mut self) {
            self.saved = None;
            self.commits += 1;
        }

        fn rollback(&mut self) {
            if let Some((balances, custody)) = self.saved.take() {
                self.balances = balances;
                self.custody = custody;
            }
            self.rollbacks += 1;
        }
    }

    const ALICE: Identity = Identity([0xaa; 20]);
    const BOB: Identity = Identity([0xbb; 20]);

    fn weth() -> AssetId {
        AssetId::from_symbol("WETH")
    }

    fn usdc() -> AssetId {
        AssetId::from_symbol("USDC")
    }

    fn setup() -> (Router<SnapshotLedger>, BookId) {
        let mut router = Router::new(SnapshotLedger::default());
        let book = router.create_book(&BookConfig::unit(weth(), usdc())).unwrap();
        for who in [ALICE, BOB] {
            router.ledger_mut().fund(weth(), who, 1_000);
            router.ledger_mut().fund(usdc(), who, 1_000);
        }
        (router, book)
    }

    fn limit(amount0_base: u64, price_base: u64, side: Side) -> NewLimitOrder {
        NewLimitOrder {
            amount0_base,
            price_base,
            side,
            hint: OrderId::HEAD,
        }
    }

    #[test]
    fn create_book_authorizes_it() {
        let (router, book) = setup();
        assert!(router.ledger().authorized.contains(&book));
        assert_eq!(router.registry().len(), 1);
    }

    #[test]
    fn calldata_batch_commits_with_receipt() {
        let (mut router, book) = setup();
        let call = Call::CreateLimitOrders {
            book_id: book,
            orders: vec![limit(10, 10, Side::Ask), limit(5, 12, Side::Ask)],
        };
        let receipt = router.execute(ALICE, &call.encode().unwrap()).unwrap();

        assert_eq!(receipt.outcome, CallOutcome::Created(vec![OrderId(2), OrderId(3)]));
        assert_eq!(receipt.caller, ALICE);
        assert_eq!(receipt.events.len(), 2);
        assert!(verify_event_root(&receipt.events, &receipt.event_root));
        assert_eq!(router.ledger().commits, 1);
        assert_eq!(router.ledger().balance(weth(), ALICE), U256::from(985));
        assert_eq!(router.book(book).unwrap().ask_len(), 2);
    }

    #[test]
    fn failing_operation_rolls_back_whole_batch() {
        let (mut router, book) = setup();
        let before = router.book(book).unwrap().limit_orders();

        // Second order needs 2_000 USDC.
        let err = router
            .create_limit_orders(
                BOB,
                book,
                vec![limit(10, 10, Side::Bid), limit(100, 20, Side::Bid)],
            )
            .unwrap_err();
        assert!(matches!(err, PairbookError::InsufficientBalance { .. }));

        let after = router.book(book).unwrap();
        assert_eq!(after.limit_orders(), before);
        assert_eq!(after.order_id_counter(), OrderId::FIRST);
        assert!(after.pending_events().is_empty());
        assert_eq!(router.ledger().balance(usdc(), BOB), U256::from(1_000));
        assert_eq!(router.ledger().rollbacks, 1);
    }

    #[test]
    fn rollback_undoes_fills_already_applied() {
        let (mut router, book) = setup();
        router
            .create_limit_orders(ALICE, book, vec![limit(10, 10, Side::Ask)])
            .unwrap();
        let counter = router.book(book).unwrap().order_id_counter();

        // The first order fills against Alice; the second is invalid.
        let err = router
            .create_limit_orders(BOB, book, vec![limit(10, 10, Side::Bid), limit(0, 1, Side::Bid)])
            .unwrap_err();
        assert!(matches!(err, PairbookError::InvalidOrder { .. }));

        let b = router.book(book).unwrap();
        assert_eq!(b.best_ask().unwrap().amount0, U256::from(10));
        assert_eq!(b.asks().first_node(), OrderId(2));
        assert_eq!(b.asks().next_of(OrderId(2)), OrderId::TAIL);
        assert_eq!(b.order_id_counter(), counter);
        assert!(!b.in_transaction());
        assert_eq!(router.ledger().balance(usdc(), ALICE), U256::from(1_000));
        assert_eq!(router.ledger().balance(weth(), BOB), U256::from(1_000));

        // The next batch reuses the ids the failed one handed out.
        let ids = router
            .create_limit_orders(BOB, book, vec![limit(4, 10, Side::Bid)])
            .unwrap();
        assert_eq!(ids, vec![counter]);
        assert_eq!(router.book(book).unwrap().best_ask().unwrap().amount0, U256::from(6));
    }

    #[test]
    fn cancel_batch_tolerates_stale_ids() {
        let (mut router, book) = setup();
        let ids = router
            .create_limit_orders(ALICE, book, vec![limit(1, 10, Side::Ask), limit(1, 11, Side::Ask)])
            .unwrap();
        router.cancel_limit_orders(ALICE, book, vec![ids[0]]).unwrap();

        let flags = router
            .cancel_limit_orders(ALICE, book, vec![ids[0], ids[1]])
            .unwrap();
        assert_eq!(flags, vec![false, true]);
        assert_eq!(router.ledger().balance(weth(), ALICE), U256::from(1_000));
    }

    #[test]
    fn only_owner_can_touch_an_order() {
        let (mut router, book) = setup();
        let ids = router
            .create_limit_orders(ALICE, book, vec![limit(1, 10, Side::Ask)])
            .unwrap();
        let err = router.cancel_limit_orders(BOB, book, ids.clone()).unwrap_err();
        assert!(matches!(err, PairbookError::NotOrderOwner { .. }));
        assert!(router.book(book).unwrap().is_order_active(ids[0]));
    }

    #[test]
    fn market_order_and_update_helpers() {
        let (mut router, book) = setup();
        let ids = router
            .create_limit_orders(ALICE, book, vec![limit(10, 10, Side::Ask)])
            .unwrap();
        let flags = router
            .update_limit_orders(
                ALICE,
                book,
                vec![LimitOrderUpdate {
                    id: ids[0],
                    amount0_base: 8,
                    price_base: 9,
                    hint: OrderId::HEAD,
                }],
            )
            .unwrap();
        assert_eq!(flags, vec![true]);

        let id = router
            .create_market_order(
                BOB,
                book,
                MarketOrder { amount0_base: 8, price_base: 9, side: Side::Bid },
            )
            .unwrap();
        assert_eq!(id, OrderId(3));
        assert!(router.book(book).unwrap().best_ask().is_none());
        assert_eq!(router.ledger().balance(usdc(), ALICE), U256::from(1_072));
    }

    #[test]
    fn unknown_book_and_bad_calldata_touch_nothing() {
        let (mut router, _) = setup();
        let err = router.execute(ALICE, &[0x03, 9, 1, 0, 0, 0, 2]).unwrap_err();
        assert_eq!(err, PairbookError::BookNotFound(BookId(9)));
        let err = router.execute(ALICE, &[0x7f]).unwrap_err();
        assert_eq!(err, PairbookError::UnknownOpcode(0x7f));
        assert_eq!(router.ledger().commits + router.ledger().rollbacks, 0);
    }

    #[test]
    fn signed_calls_run_as_signer_and_reject_replays() {
        let (mut router, book) = setup();
        let key = SigningKey::from_bytes(&[5u8; 32]);
        let signer = Identity::from_public_key(&key.verifying_key().to_bytes());
        router.ledger_mut().fund(weth(), signer, 100);

        let calldata = Call::CreateLimitOrders {
            book_id: book,
            orders: vec![limit(3, 10, Side::Ask)],
        }
        .encode()
        .unwrap();

        let first = SignedCall::sign(&key, 1, calldata.clone());
        let receipt = router.execute_signed(&first).unwrap();
        assert_eq!(receipt.caller, signer);
        let (order, _) = router.book(book).unwrap().order(OrderId(2)).unwrap();
        assert_eq!(order.owner, signer);

        assert!(matches!(
            router.execute_signed(&first),
            Err(PairbookError::NonceReplay { .. })
        ));
        assert_eq!(router.authenticator().last_nonce(&signer), Some(1));
    }

    #[test]
    fn failed_signed_call_keeps_nonce_available() {
        let (mut router, book) = setup();
        let key = SigningKey::from_bytes(&[6u8; 32]);
        let signer = Identity::from_public_key(&key.verifying_key().to_bytes());
        let calldata = Call::CreateLimitOrders {
            book_id: book,
            orders: vec![limit(3, 10, Side::Ask)],
        }
        .encode()
        .unwrap();

        // Unfunded signer: rejected, nonce untouched.
        let call = SignedCall::sign(&key, 1, calldata);
        assert!(router.execute_signed(&call).is_err());
        assert_eq!(router.authenticator().last_nonce(&signer), None);

        router.ledger_mut().fund(weth(), signer, 3);
        assert!(router.execute_signed(&call).is_ok());
    }

    #[test]
    fn from_config_creates_books_in_order() {
        let config = ExchangeConfig {
            books: vec![
                BookConfig::unit(weth(), usdc()),
                BookConfig::new(AssetId::from_symbol("WBTC"), usdc(), 4, 2, 8),
            ],
            ..ExchangeConfig::default()
        };
        let router = Router::from_config(&config, SnapshotLedger::default()).unwrap();
        assert_eq!(router.registry().len(), 2);
        assert_eq!(
            router.registry().book_id_for_pair(AssetId::from_symbol("WBTC"), usdc()),
            Some(BookId(1))
        );
        assert_eq!(router.ledger().authorized.len(), 2);
    }
}
