//! `tracing` subscriber setup driven by [`ExchangeConfig`].

use pairbook_types::{ExchangeConfig, PairbookError, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured filter when set. Returns `false` if
/// a global subscriber was already installed, which leaves it in place.
pub fn init_tracing(config: &ExchangeConfig) -> Result<bool> {
    let filter = build_filter(config)?;
    let installed = if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
            .is_ok()
    };
    if installed {
        tracing::info!(
            engine = pairbook_types::constants::ENGINE_NAME,
            version = pairbook_types::constants::VERSION,
            books = config.books.len(),
            "Tracing initialized"
        );
    }
    Ok(installed)
}

fn build_filter(config: &ExchangeConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.log_filter).map_err(|e| {
        PairbookError::Configuration(format!("bad log filter {:?}: {e}", config.log_filter))
    })
}
