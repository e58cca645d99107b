//! System-wide constants for the Pairbook engine.

/// Order id counter ceiling. The last id a book hands out is one below it.
pub const MAX_ORDER_ID: u32 = u32::MAX;

/// Largest `log10` tick exponent accepted for size or price ticks.
pub const MAX_LOG_TICK: u8 = 38;

/// Largest asset0 decimal count accepted by the tick model.
pub const MAX_ASSET_DECIMALS: u8 = 38;

/// Maximum operations in one calldata batch (the count is a single byte).
pub const MAX_BATCH_SIZE: usize = u8::MAX as usize;

/// Domain separator prefixed to every signed call.
pub const CALL_SIGNING_DOMAIN: &[u8] = b"pairbook:call:v1:";

/// Default tracing filter when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Pairbook";
