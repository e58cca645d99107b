//! # pairbook-matchcore
//!
//! **Continuous price-time priority matching for one asset pair.**
//!
//! Each [`OrderBook`] keeps its resting orders in two sentinel-bounded
//! [`OrderList`]s and matches incoming orders against them on arrival:
//!
//! - **Exact pricing**: prices are compared by 512-bit cross products and
//!   never divided
//! - **Exact fills**: every proportional amount must divide evenly or the
//!   whole operation is rejected
//! - **Funds first**: the taker's offer is debited from the ledger before
//!   any fill is applied
//! - **No half-states**: fills are planned before the first side effect

pub mod determinism;
pub mod matcher;
pub mod order_book;
pub mod order_list;
pub mod price;
pub mod ticks;

pub use determinism::{compute_event_root, verify_event_root};
pub use matcher::{Fill, FillPlan, apply_fills, plan_fills};
pub use order_book::OrderBook;
pub use order_list::{Node, OrderList};
pub use price::{overlaps, rank};
pub use ticks::TickModel;
