//! Shared primitive types used across the entire pipeline.

/// A wallet address as reported by the explorer. Opaque.
pub type WalletAddress = String;

/// A transaction hash / id.
pub type Txid = String;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

/// Placeholder node for inputs or outputs without an address.
/// A valid graph node, never an error.
pub const UNKNOWN_WALLET: &str = "unknown";

/// Satoshis per BTC.
pub const MINOR_UNITS_PER_COIN: f64 = 1e8;
