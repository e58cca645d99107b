//! # pairbook-ingress
//!
//! **Entry point**: book registry, calldata decoding, caller
//! authentication and atomic batch execution.
//!
//! ## Architecture
//!
//! 1. **BookRegistry**: one order book per asset pair, dense `u8` ids
//! 2. **Call**: compact big-endian calldata for batched book operations
//! 3. **CallAuthenticator**: ed25519 signed calls with per-caller nonces
//! 4. **Router**: runs each call as an all-or-nothing batch against the
//!    ledger and returns a receipt with the book's events
//!
//! ## Call Flow
//!
//! ```text
//! SignedCall → CallAuthenticator.authenticate() → Call::decode()
//!     → Router.execute_call() → OrderBook ops ⇄ Ledger → BatchReceipt
//! ```
//!
//! The owner of every order is the authenticated caller, never a calldata
//! field.

pub mod auth;
pub mod calldata;
pub mod registry;
pub mod router;
pub mod telemetry;

pub use auth::{CallAuthenticator, SignedCall};
pub use calldata::{Call, CallOutcome, LimitOrderUpdate, MarketOrder, NewLimitOrder};
pub use registry::BookRegistry;
pub use router::{BatchReceipt, Router};
pub use telemetry::init_tracing;
