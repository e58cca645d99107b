//! Tick model: caller base units to absolute amounts.
//!
//! ```text
//! amount0 = amount0Base * sizeTick
//! amount1 = amount0Base * priceBase * priceMultiplier / priceDivider
//! ```
//!
//! `priceMultiplier` and `priceDivider` fold `sizeTick`, `priceTick` and the
//! decimal scale of asset0 into one exact fraction, computed once per book.

use pairbook_types::{BookConfig, PairbookError, Result, U256, pow10};

/// Immutable per-book scaling factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickModel {
    size_tick: U256,
    price_tick: U256,
    price_multiplier: U256,
    price_divider: U256,
}

impl TickModel {
    /// Derive the scaling factors for `config`.
    pub fn new(config: &BookConfig) -> Result<Self> {
        config.validate()?;
        let scale = config.log_size_tick + config.log_price_tick;
        let (price_multiplier, price_divider) = if scale >= config.asset0_decimals {
            (pow10(scale - config.asset0_decimals), U256::one())
        } else {
            (U256::one(), pow10(config.asset0_decimals - scale))
        };
        Ok(Self {
            size_tick: pow10(config.log_size_tick),
            price_tick: pow10(config.log_price_tick),
            price_multiplier,
            price_divider,
        })
    }

    #[must_use]
    pub fn size_tick(&self) -> U256 {
        self.size_tick
    }

    #[must_use]
    pub fn price_tick(&self) -> U256 {
        self.price_tick
    }

    #[must_use]
    pub fn price_multiplier(&self) -> U256 {
        self.price_multiplier
    }

    #[must_use]
    pub fn price_divider(&self) -> U256 {
        self.price_divider
    }

    /// Convert `(amount0Base, priceBase)` into `(amount0, amount1)`.
    ///
    /// Both inputs must be non-zero, and the quote amount must come out as a
    /// whole, non-zero number of asset1 units.
    pub fn to_amounts(&self, amount0_base: u64, price_base: u64) -> Result<(U256, U256)> {
        if amount0_base == 0 {
            return Err(PairbookError::InvalidOrder {
                reason: "amount0Base must be positive".into(),
            });
        }
        if price_base == 0 {
            return Err(PairbookError::InvalidOrder {
                reason: "priceBase must be positive".into(),
            });
        }

        let amount0 = U256::from(amount0_base)
            .checked_mul(self.size_tick)
            .ok_or(PairbookError::ArithmeticOverflow { context: "amount0" })?;

        let notional = U256::from(amount0_base)
            .checked_mul(U256::from(price_base))
            .and_then(|v| v.checked_mul(self.price_multiplier))
            .ok_or(PairbookError::ArithmeticOverflow { context: "amount1" })?;

        let (amount1, remainder) = notional.div_mod(self.price_divider);
        if !remainder.is_zero() || amount1.is_zero() {
            return Err(PairbookError::TickMismatch {
                reason: format!(
                    "{amount0_base} x {price_base} does not map to whole asset1 units (divider {})",
                    self.price_divider
                ),
            });
        }

        Ok((amount0, amount1))
    }
}
