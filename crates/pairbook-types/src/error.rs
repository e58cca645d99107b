//! Error types for the Pairbook engine.
//!
//! All errors use the `PB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order / engine errors
//! - 2xx: Ledger errors
//! - 3xx: Registry errors
//! - 4xx: Ingress errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{AssetId, BookId, Identity, OrderId, U256};

/// Central error enum for all Pairbook operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairbookError {
    // =================================================================
    // Order / Engine Errors (1xx)
    // =================================================================
    /// Size or price is zero or otherwise unusable.
    #[error("PB_ERR_100: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// The insertion hint refers to an id the book has not allocated yet.
    #[error("PB_ERR_101: Invalid hint {hint}: next order id is {next_id}")]
    InvalidHint { hint: OrderId, next_id: OrderId },

    /// The caller does not own the order it tried to change.
    #[error("PB_ERR_102: {caller} is not the owner of order {order_id}")]
    NotOrderOwner { order_id: OrderId, caller: Identity },

    /// The order id is not resident where it must be.
    #[error("PB_ERR_103: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The 32-bit order id space is used up.
    #[error("PB_ERR_104: Order id space exhausted")]
    OrderIdExhausted,

    /// A proportional amount did not divide exactly.
    #[error("PB_ERR_105: Tick mismatch: {reason}")]
    TickMismatch { reason: String },

    /// An amount does not fit in 256 bits.
    #[error("PB_ERR_106: Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: &'static str },

    // =================================================================
    // Ledger Errors (2xx)
    // =================================================================
    /// Account balance is smaller than the requested debit.
    #[error("PB_ERR_200: Insufficient balance of {asset} for {account}: need {needed}, have {available}")]
    InsufficientBalance {
        asset: AssetId,
        account: Identity,
        needed: U256,
        available: U256,
    },

    /// A book tried to release more than it holds in custody.
    #[error("PB_ERR_201: Insufficient custody of {asset} in {book_id}: need {needed}, have {available}")]
    InsufficientCustody {
        book_id: BookId,
        asset: AssetId,
        needed: U256,
        available: U256,
    },

    /// The caller is not the registered book for the asset pair.
    #[error("PB_ERR_202: {book_id} is not authorized to move {asset}")]
    UnauthorizedBook { book_id: BookId, asset: AssetId },

    /// Supply conservation invariant violated.
    #[error("PB_ERR_203: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Registry Errors (3xx)
    // =================================================================
    /// A book already exists for this pair.
    #[error("PB_ERR_300: Book already exists for pair {asset0}/{asset1}")]
    DuplicatePair { asset0: AssetId, asset1: AssetId },

    /// Both sides of the pair are the same asset.
    #[error("PB_ERR_301: Pair uses the same asset twice: {0}")]
    IdenticalAssets(AssetId),

    /// No more book ids can be assigned.
    #[error("PB_ERR_302: Book id space exhausted")]
    BookIdExhausted,

    /// No book with this id.
    #[error("PB_ERR_303: Book not found: {0}")]
    BookNotFound(BookId),

    /// Tick exponents or decimals out of range.
    #[error("PB_ERR_304: Invalid tick configuration: {reason}")]
    InvalidTickConfig { reason: String },

    // =================================================================
    // Ingress Errors (4xx)
    // =================================================================
    /// Calldata could not be decoded.
    #[error("PB_ERR_400: Malformed calldata: {reason}")]
    MalformedCalldata { reason: String },

    /// First calldata byte is not a known operation.
    #[error("PB_ERR_401: Unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),

    /// The ed25519 signature on a call didn't verify.
    #[error("PB_ERR_402: Call signature verification failed")]
    SignatureInvalid,

    /// Nonce was already used (replay protection).
    #[error("PB_ERR_403: Nonce replay for {caller}: got {nonce}, last used {last}")]
    NonceReplay {
        caller: Identity,
        nonce: u64,
        last: u64,
    },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("PB_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Configuration error (invalid config file, missing fields, etc.).
    #[error("PB_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PairbookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = PairbookError::OrderNotFound(OrderId(7));
        let msg = format!("{err}");
        assert!(msg.starts_with("PB_ERR_103"), "Got: {msg}");
        assert!(msg.contains("#7"));
    }

    #[test]
    fn insufficient_balance_display() {
        let err = PairbookError::InsufficientBalance {
            asset: AssetId::from_symbol("USDC"),
            account: Identity([1u8; 20]),
            needed: U256::from(100),
            available: U256::from(50),
        };
        let msg = format!("{err}");
        assert!(msg.contains("PB_ERR_200"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn unknown_opcode_is_hex() {
        let msg = PairbookError::UnknownOpcode(0x0f).to_string();
        assert!(msg.contains("0x0f"), "Got: {msg}");
    }

    #[test]
    fn all_errors_have_pb_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(PairbookError::OrderIdExhausted),
            Box::new(PairbookError::BookIdExhausted),
            Box::new(PairbookError::SignatureInvalid),
            Box::new(PairbookError::Internal("test".into())),
            Box::new(PairbookError::TickMismatch {
                reason: "7 * 3 / 2".into(),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("PB_ERR_"),
                "Error missing PB_ERR_ prefix: {msg}"
            );
        }
    }
}
