//! The interface an order book uses to move funds.
//!
//! Books never hold balances. They ask a [`Ledger`] to debit an account
//! into the book's custody when an order is funded, and to credit an
//! account out of custody on fills, refunds and cancellations. The ledger
//! authenticates the calling book against the pair it was registered for.

use serde::{Deserialize, Serialize};

use crate::{AssetId, BookId, Identity, Result, U256};

/// The registered identity of a book, as the ledger sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookInfo {
    pub book_id: BookId,
    pub asset0: AssetId,
    pub asset1: AssetId,
}

/// One balance movement requested by a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// The book asking for the transfer.
    pub book_id: BookId,
    /// Asset being moved.
    pub asset: AssetId,
    /// The other asset of the book's pair.
    pub counter_asset: AssetId,
    pub account: Identity,
    pub amount: U256,
    /// Whether `asset` is the pair's asset0.
    pub is_asset0: bool,
}

impl TransferRequest {
    /// Build a transfer of asset0 (`is_asset0`) or asset1 for `book`.
    #[must_use]
    pub fn for_book(book: &BookInfo, account: Identity, amount: U256, is_asset0: bool) -> Self {
        let (asset, counter_asset) = if is_asset0 {
            (book.asset0, book.asset1)
        } else {
            (book.asset1, book.asset0)
        };
        Self {
            book_id: book.book_id,
            asset,
            counter_asset,
            account,
            amount,
            is_asset0,
        }
    }
}

/// Synchronous balance callbacks consumed by the matching engine.
///
/// A failing call aborts the enclosing operation.
pub trait Ledger {
    /// Move `amount` out of the book's custody into `account`.
    fn credit_account(&mut self, request: &TransferRequest) -> Result<()>;

    /// Move `amount` from `account` into the book's custody.
    fn debit_account(&mut self, request: &TransferRequest) -> Result<()>;
}

/// A ledger the entry point can drive transactionally.
///
/// Every transfer between [`begin`](Self::begin) and
/// [`rollback`](Self::rollback) is undone by the rollback.
pub trait CustodyLedger: Ledger {
    /// Allow `book` to move its pair's assets.
    fn authorize_book(&mut self, book: &BookInfo) -> Result<()>;

    fn begin(&mut self);

    fn commit(&mut self);

    fn rollback(&mut self);
}
