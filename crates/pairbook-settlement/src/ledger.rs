//! In-memory custody ledger.
//!
//! Accounts hold free balances per asset; each book holds the funds
//! escrowed for its resting orders in its own custody bucket. Books move
//! funds only between an account and their own custody, and only in the
//! two assets of the pair they were authorized for.
//!
//! Every balance write made between `begin` and `commit` is journaled with
//! its previous value, so `rollback` restores the exact prior state.

use std::collections::HashMap;

use pairbook_types::{
    AssetId, BookId, BookInfo, CustodyLedger, Identity, Ledger, PairbookError, Result,
    TransferRequest, U256,
};

use crate::supply_conservation::SupplyConservation;

/// One undoable write.
#[derive(Debug, Clone, PartialEq, Eq)]
enum JournalEntry {
    Balance {
        asset: AssetId,
        account: Identity,
        previous: U256,
    },
    Custody {
        book_id: BookId,
        asset: AssetId,
        previous: U256,
    },
    Deposit {
        asset: AssetId,
        amount: U256,
    },
    Withdrawal {
        asset: AssetId,
        amount: U256,
    },
}

/// Balances, custody and the books allowed to move them.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedger {
    balances: HashMap<(AssetId, Identity), U256>,
    custody: HashMap<(BookId, AssetId), U256>,
    books: HashMap<BookId, BookInfo>,
    supply: SupplyConservation,
    /// `Some` while a transaction is open.
    journal: Option<Vec<JournalEntry>>,
}

impl InMemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =================================================================
    // External flows
    // =================================================================

    /// Credit `amount` of `asset` to `account` from outside the system.
    pub fn deposit(&mut self, asset: AssetId, account: Identity, amount: U256) -> Result<()> {
        let balance = self.balance(asset, account);
        let updated = balance
            .checked_add(amount)
            .ok_or(PairbookError::ArithmeticOverflow { context: "deposit" })?;
        self.set_balance(asset, account, updated);
        self.supply.record_deposit(asset, amount);
        self.record(JournalEntry::Deposit { asset, amount });
        tracing::debug!(asset = %asset, account = %account.short(), amount = %amount, "Deposit");
        Ok(())
    }

    /// Remove `amount` of `asset` from `account`'s free balance.
    pub fn withdraw(&mut self, asset: AssetId, account: Identity, amount: U256) -> Result<()> {
        let balance = self.balance(asset, account);
        if balance < amount {
            return Err(PairbookError::InsufficientBalance {
                asset,
                account,
                needed: amount,
                available: balance,
            });
        }
        self.set_balance(asset, account, balance - amount);
        self.supply.record_withdrawal(asset, amount);
        self.record(JournalEntry::Withdrawal { asset, amount });
        tracing::debug!(asset = %asset, account = %account.short(), amount = %amount, "Withdrawal");
        Ok(())
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Free balance of `account`.
    #[must_use]
    pub fn balance(&self, asset: AssetId, account: Identity) -> U256 {
        self.balances
            .get(&(asset, account))
            .copied()
            .unwrap_or_default()
    }

    /// Funds `book_id` holds for its resting orders.
    #[must_use]
    pub fn custody_of(&self, book_id: BookId, asset: AssetId) -> U256 {
        self.custody
            .get(&(book_id, asset))
            .copied()
            .unwrap_or_default()
    }

    /// Σ balances + Σ custody for `asset`.
    #[must_use]
    pub fn total_supply(&self, asset: AssetId) -> U256 {
        let free = self
            .balances
            .iter()
            .filter(|((a, _), _)| *a == asset)
            .fold(U256::zero(), |acc, (_, v)| acc + *v);
        self.custody
            .iter()
            .filter(|((_, a), _)| *a == asset)
            .fold(free, |acc, (_, v)| acc + *v)
    }

    /// Check the supply invariant for one asset.
    pub fn verify_supply(&self, asset: AssetId) -> Result<()> {
        self.supply.verify(asset, self.total_supply(asset))
    }

    /// Check the supply invariant for every asset ever deposited.
    pub fn verify_all_supply(&self) -> Result<()> {
        for asset in self.supply.tracked_assets() {
            self.verify_supply(asset)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }

    #[must_use]
    pub fn is_authorized(&self, book_id: BookId) -> bool {
        self.books.contains_key(&book_id)
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.journal.is_some()
    }

    // =================================================================
    // Internals
    // =================================================================

    /// The request must come from a registered book and name one of its
    /// own two assets with the matching orientation.
    fn authorize(&self, req: &TransferRequest) -> Result<()> {
        let unauthorized = || PairbookError::UnauthorizedBook {
            book_id: req.book_id,
            asset: req.asset,
        };
        let info = self.books.get(&req.book_id).ok_or_else(unauthorized)?;
        let (expected, counter) = if req.is_asset0 {
            (info.asset0, info.asset1)
        } else {
            (info.asset1, info.asset0)
        };
        if req.asset != expected || req.counter_asset != counter {
            return Err(unauthorized());
        }
        Ok(())
    }

    fn record(&mut self, entry: JournalEntry) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(entry);
        }
    }

    fn set_balance(&mut self, asset: AssetId, account: Identity, value: U256) {
        let previous = self.balances.insert((asset, account), value).unwrap_or_default();
        self.record(JournalEntry::Balance {
            asset,
            account,
            previous,
        });
    }

    fn set_custody(&mut self, book_id: BookId, asset: AssetId, value: U256) {
        let previous = self.custody.insert((book_id, asset), value).unwrap_or_default();
        self.record(JournalEntry::Custody {
            book_id,
            asset,
            previous,
        });
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Balance {
                asset,
                account,
                previous,
            } => {
                self.balances.insert((asset, account), previous);
            }
            JournalEntry::Custody {
                book_id,
                asset,
                previous,
            } => {
                self.custody.insert((book_id, asset), previous);
            }
            JournalEntry::Deposit { asset, amount } => {
                self.supply.unrecord_deposit(asset, amount);
            }
            JournalEntry::Withdrawal { asset, amount } => {
                self.supply.unrecord_withdrawal(asset, amount);
            }
        }
    }
}

impl Ledger for InMemoryLedger {
    fn credit_account(&mut self, req: &TransferRequest) -> Result<()> {
        self.authorize(req)?;
        let held = self.custody_of(req.book_id, req.asset);
        if held < req.amount {
            return Err(PairbookError::InsufficientCustody {
                book_id: req.book_id,
                asset: req.asset,
                needed: req.amount,
                available: held,
            });
        }
        let balance = self
            .balance(req.asset, req.account)
            .checked_add(req.amount)
            .ok_or(PairbookError::ArithmeticOverflow { context: "credit" })?;
        self.set_custody(req.book_id, req.asset, held - req.amount);
        self.set_balance(req.asset, req.account, balance);
        tracing::trace!(
            book = %req.book_id,
            asset = %req.asset,
            account = %req.account.short(),
            amount = %req.amount,
            "Credit"
        );
        Ok(())
    }

    fn debit_account(&mut self, req: &TransferRequest) -> Result<()> {
        self.authorize(req)?;
        let balance = self.balance(req.asset, req.account);
        if balance < req.amount {
            return Err(PairbookError::InsufficientBalance {
                asset: req.asset,
                account: req.account,
                needed: req.amount,
                available: balance,
            });
        }
        let held = self
            .custody_of(req.book_id, req.asset)
            .checked_add(req.amount)
            .ok_or(PairbookError::ArithmeticOverflow { context: "debit" })?;
        self.set_balance(req.asset, req.account, balance - req.amount);
        self.set_custody(req.book_id, req.asset, held);
        tracing::trace!(
            book = %req.book_id,
            asset = %req.asset,
            account = %req.account.short(),
            amount = %req.amount,
            "Debit"
        );
        Ok(())
    }
}

impl CustodyLedger for InMemoryLedger {
    fn authorize_book(&mut self, book: &BookInfo) -> Result<()> {
        if self.books.get(&book.book_id).is_some_and(|existing| existing != book) {
            return Err(PairbookError::UnauthorizedBook {
                book_id: book.book_id,
                asset: book.asset0,
            });
        }
        self.books.insert(book.book_id, *book);
        tracing::debug!(book = %book.book_id, "Book authorized");
        Ok(())
    }

    /// Open a transaction. Opening one while another is open keeps the
    /// outer journal.
    fn begin(&mut self) {
        if self.journal.is_none() {
            self.journal = Some(Vec::new());
        }
    }

    fn commit(&mut self) {
        self.journal = None;
    }

    fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        let undone = journal.len();
        for entry in journal.into_iter().rev() {
            self.undo(entry);
        }
        tracing::debug!(writes = undone, "Ledger rolled back");
    }
}
