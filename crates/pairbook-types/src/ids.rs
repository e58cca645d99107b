//! Identifiers used throughout Pairbook.
//!
//! Order ids are dense `u32` values allocated per book; ids `0` and `1` are
//! reserved for the list sentinels. Accounts and assets are 20-byte
//! identities in the style of contract addresses.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Per-book order identifier.
///
/// Ids are allocated monotonically and never reused. The two lowest values
/// are the permanent head and tail sentinels of every order list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderId(pub u32);

impl OrderId {
    /// Head sentinel: the best-priced extreme of a list.
    pub const HEAD: Self = Self(0);
    /// Tail sentinel: the worst-priced extreme of a list.
    pub const TAIL: Self = Self(1);
    /// First id handed out to a real order.
    pub const FIRST: Self = Self(2);

    #[must_use]
    pub fn is_sentinel(self) -> bool {
        self.0 <= Self::TAIL.0
    }

    /// Slot in a dense node arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// BookId
// ---------------------------------------------------------------------------

/// Small integer id the registry assigns to each order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct BookId(pub u8);

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "book:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// An account that owns orders and balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Identity(pub [u8; 20]);

impl Identity {
    /// Derive the identity bound to an ed25519 public key: the first
    /// 20 bytes of its SHA-256 digest.
    #[must_use]
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let digest = Sha256::digest(public_key);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// A token tracked by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetId(pub [u8; 20]);

impl AssetId {
    /// Deterministic asset id for a ticker symbol.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"pairbook:asset:");
        hasher.update(symbol.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Self(bytes)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset:{}", hex::encode(&self.0[..6]))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_reserved() {
        assert!(OrderId::HEAD.is_sentinel());
        assert!(OrderId::TAIL.is_sentinel());
        assert!(!OrderId::FIRST.is_sentinel());
        assert_eq!(OrderId::FIRST.index(), 2);
    }

    #[test]
    fn identity_from_public_key_is_deterministic() {
        let a = Identity::from_public_key(&[7u8; 32]);
        let b = Identity::from_public_key(&[7u8; 32]);
        let c = Identity::from_public_key(&[8u8; 32]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn identity_display_is_hex() {
        let id = Identity([0xab; 20]);
        let s = id.to_string();
        assert!(s.starts_with("0xabab"));
        assert_eq!(s.len(), 42);
        assert_eq!(id.short(), "abababab");
    }

    #[test]
    fn asset_ids_differ_per_symbol() {
        assert_eq!(AssetId::from_symbol("WETH"), AssetId::from_symbol("WETH"));
        assert_ne!(AssetId::from_symbol("WETH"), AssetId::from_symbol("USDC"));
    }

    #[test]
    fn serde_roundtrips() {
        let oid = OrderId(42);
        let json = serde_json::to_string(&oid).unwrap();
        let back: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(oid, back);

        let owner = Identity([3u8; 20]);
        let json = serde_json::to_string(&owner).unwrap();
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(owner, back);
    }
}
