//! # pairbook-settlement
//!
//! **Custody plane**: where balances live and how books move them.
//!
//! ## Architecture
//!
//! [`InMemoryLedger`] implements the [`Ledger`](pairbook_types::Ledger)
//! callbacks books call while matching, plus the transactional
//! [`CustodyLedger`](pairbook_types::CustodyLedger) surface the router
//! drives:
//! 1. Authorizes each book for exactly its own asset pair
//! 2. Debits accounts into book custody when orders are funded
//! 3. Credits accounts out of custody on fills, refunds and cancels
//! 4. Journals every write so a failed batch rolls back exactly
//! 5. Checks supply conservation against deposits and withdrawals

pub mod ledger;
pub mod supply_conservation;

pub use ledger::InMemoryLedger;
pub use supply_conservation::SupplyConservation;
