//! Supply conservation invariant checker.
//!
//! Enforced against the ledger at any quiescent point:
//! ```text
//! ∀ asset: Σ(account balances) + Σ(book custody) == Σ(deposits) - Σ(withdrawals)
//! ```
//!
//! Matching moves funds between accounts and book custody but never mints
//! or burns. If this ever fails, some transfer created or lost value.

use std::collections::{BTreeSet, HashMap};

use pairbook_types::{AssetId, PairbookError, Result, U256};

/// Tracks per-asset flows across the ledger boundary.
#[derive(Debug, Default, Clone)]
pub struct SupplyConservation {
    /// Total deposits per asset since genesis.
    deposits: HashMap<AssetId, U256>,
    /// Total withdrawals per asset since genesis.
    withdrawals: HashMap<AssetId, U256>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deposit(&mut self, asset: AssetId, amount: U256) {
        *self.deposits.entry(asset).or_default() += amount;
    }

    pub fn record_withdrawal(&mut self, asset: AssetId, amount: U256) {
        *self.withdrawals.entry(asset).or_default() += amount;
    }

    /// Take back a deposit recorded inside a rolled-back transaction.
    pub fn unrecord_deposit(&mut self, asset: AssetId, amount: U256) {
        if let Some(total) = self.deposits.get_mut(&asset) {
            *total = total.saturating_sub(amount);
        }
    }

    /// Take back a withdrawal recorded inside a rolled-back transaction.
    pub fn unrecord_withdrawal(&mut self, asset: AssetId, amount: U256) {
        if let Some(total) = self.withdrawals.get_mut(&asset) {
            *total = total.saturating_sub(amount);
        }
    }

    /// Expected total supply for an asset: deposits - withdrawals.
    ///
    /// Withdrawals can never exceed deposits through the ledger, so this
    /// saturates rather than wrapping.
    #[must_use]
    pub fn expected_supply(&self, asset: AssetId) -> U256 {
        self.total_deposits(asset)
            .saturating_sub(self.total_withdrawals(asset))
    }

    /// Check that `actual_supply` equals the expected supply of `asset`.
    pub fn verify(&self, asset: AssetId, actual_supply: U256) -> Result<()> {
        let expected = self.expected_supply(asset);
        if actual_supply != expected {
            return Err(PairbookError::SupplyInvariantViolation {
                reason: format!(
                    "Asset {asset}: actual supply {actual_supply} != expected {expected} \
                     (deposits={}, withdrawals={})",
                    self.total_deposits(asset),
                    self.total_withdrawals(asset),
                ),
            });
        }
        Ok(())
    }

    /// Every asset that has ever crossed the boundary, sorted.
    #[must_use]
    pub fn tracked_assets(&self) -> Vec<AssetId> {
        let assets: BTreeSet<AssetId> = self
            .deposits
            .keys()
            .chain(self.withdrawals.keys())
            .copied()
            .collect();
        assets.into_iter().collect()
    }

    #[must_use]
    pub fn total_deposits(&self, asset: AssetId) -> U256 {
        self.deposits.get(&asset).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn total_withdrawals(&self, asset: AssetId) -> U256 {
        self.withdrawals.get(&asset).copied().unwrap_or_default()
    }
}
