//! Configuration types for books and the exchange.

use serde::{Deserialize, Serialize};

use crate::{AssetId, PairbookError, Result, constants};

/// Per-book configuration. Immutable once the book exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookConfig {
    /// Base asset (the one orders are sized in).
    pub asset0: AssetId,
    /// Quote asset (the one prices are expressed in).
    pub asset1: AssetId,
    /// `sizeTick = 10^log_size_tick` in asset0 units.
    pub log_size_tick: u8,
    /// `priceTick = 10^log_price_tick` asset1 units per whole asset0.
    pub log_price_tick: u8,
    /// Decimal places of asset0; one whole asset0 is `10^asset0_decimals` units.
    pub asset0_decimals: u8,
}

impl BookConfig {
    #[must_use]
    pub fn new(
        asset0: AssetId,
        asset1: AssetId,
        log_size_tick: u8,
        log_price_tick: u8,
        asset0_decimals: u8,
    ) -> Self {
        Self {
            asset0,
            asset1,
            log_size_tick,
            log_price_tick,
            asset0_decimals,
        }
    }

    /// Unit ticks on a zero-decimal asset0: base units equal absolute amounts.
    #[must_use]
    pub fn unit(asset0: AssetId, asset1: AssetId) -> Self {
        Self::new(asset0, asset1, 0, 0, 0)
    }

    /// Check tick bounds and asset distinctness.
    pub fn validate(&self) -> Result<()> {
        if self.asset0 == self.asset1 {
            return Err(PairbookError::IdenticalAssets(self.asset0));
        }
        if self.log_size_tick > constants::MAX_LOG_TICK
            || self.log_price_tick > constants::MAX_LOG_TICK
        {
            return Err(PairbookError::InvalidTickConfig {
                reason: format!(
                    "log ticks must be <= {} (size={}, price={})",
                    constants::MAX_LOG_TICK,
                    self.log_size_tick,
                    self.log_price_tick
                ),
            });
        }
        if self.asset0_decimals > constants::MAX_ASSET_DECIMALS {
            return Err(PairbookError::InvalidTickConfig {
                reason: format!(
                    "asset0 decimals must be <= {}, got {}",
                    constants::MAX_ASSET_DECIMALS,
                    self.asset0_decimals
                ),
            });
        }
        Ok(())
    }
}

/// Configuration for a whole exchange deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Books created at startup, in id order.
    #[serde(default)]
    pub books: Vec<BookConfig>,
    /// `tracing` env-filter directive.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Emit JSON log lines instead of plain text.
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_filter() -> String {
    constants::DEFAULT_LOG_FILTER.to_string()
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            books: Vec::new(),
            log_filter: default_log_filter(),
            log_json: false,
        }
    }
}

impl ExchangeConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PairbookError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (i, book) in self.books.iter().enumerate() {
            book.validate()
                .map_err(|e| PairbookError::Configuration(format!("book {i}: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (AssetId, AssetId) {
        (AssetId::from_symbol("WETH"), AssetId::from_symbol("USDC"))
    }

    #[test]
    fn unit_config_is_valid() {
        let (a, b) = pair();
        assert!(BookConfig::unit(a, b).validate().is_ok());
    }

    #[test]
    fn identical_assets_rejected() {
        let (a, _) = pair();
        let err = BookConfig::unit(a, a).validate().unwrap_err();
        assert!(matches!(err, PairbookError::IdenticalAssets(_)));
    }

    #[test]
    fn oversized_ticks_rejected() {
        let (a, b) = pair();
        let err = BookConfig::new(a, b, 39, 0, 18).validate().unwrap_err();
        assert!(matches!(err, PairbookError::InvalidTickConfig { .. }));
        let err = BookConfig::new(a, b, 0, 0, 77).validate().unwrap_err();
        assert!(matches!(err, PairbookError::InvalidTickConfig { .. }));
    }

    #[test]
    fn exchange_config_defaults() {
        let cfg = ExchangeConfig::default();
        assert_eq!(cfg.log_filter, "info");
        assert!(!cfg.log_json);
        assert!(cfg.books.is_empty());
    }

    #[test]
    fn exchange_config_serde_roundtrip() {
        let (a, b) = pair();
        let cfg = ExchangeConfig {
            books: vec![BookConfig::new(a, b, 14, 4, 18)],
            log_filter: "debug".into(),
            log_json: true,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back = ExchangeConfig::from_json_str(&json).unwrap();
        assert_eq!(back.books, cfg.books);
        assert_eq!(back.log_filter, "debug");
        assert!(back.log_json);
    }

    #[test]
    fn invalid_json_is_configuration_error() {
        let err = ExchangeConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, PairbookError::Configuration(_)));
    }

    #[test]
    fn invalid_book_in_config_rejected() {
        let (a, _) = pair();
        let cfg = ExchangeConfig {
            books: vec![BookConfig::unit(a, a)],
            ..ExchangeConfig::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let err = ExchangeConfig::from_json_str(&json).unwrap_err();
        assert!(err.to_string().contains("book 0"));
    }
}
