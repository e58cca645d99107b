//! # pairbook-types
//!
//! Shared types, errors, and configuration for the **Pairbook** engine.
//!
//! This crate is the leaf dependency of the workspace. Every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`BookId`], [`Identity`], [`AssetId`]
//! - **Amounts**: [`U256`] and the exact price / mul-div primitives
//! - **Order model**: [`LimitOrder`], [`Side`], [`LimitOrderSnapshot`]
//! - **Events**: [`BookEvent`]
//! - **Ledger interface**: [`Ledger`], [`CustodyLedger`], [`TransferRequest`], [`BookInfo`]
//! - **Configuration**: [`BookConfig`], [`ExchangeConfig`]
//! - **Errors**: [`PairbookError`] with `PB_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod ledger;
pub mod order;

// Re-export all primary types at crate root for ergonomic imports:
//   use pairbook_types::{LimitOrder, Side, BookEvent, U256, ...};

pub use amount::{U256, U512, compare_price, mul_div_exact, pow10};
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use ledger::*;
pub use order::*;

// Constants are accessed via `pairbook_types::constants::FOO`
// (not re-exported to avoid name collisions).
