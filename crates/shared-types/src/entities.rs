//! # Core Domain Entities
//!
//! Primitive identifiers used across the bridge core.

use serde::{Deserialize, Serialize};

// Re-export U256 from primitive-types for use across all subsystems
pub use primitive_types::U256;

/// A 32-byte hash (SHA-256, Keccak-256 or double SHA-256 depending on origin).
pub type Hash = [u8; 32];

/// A 20-byte account address on the bridge chain.
pub type Address = [u8; 20];

/// Identifier of a chain, external or home.
pub type ChainId = i64;

/// The all-zero hash.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Execution context of the block currently being applied.
///
/// Supplied by the host for every delivered transaction. Components never
/// read wall-clock time; they use `timestamp` from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockContext {
    /// Height of the block being executed.
    pub height: u64,
    /// Unix timestamp (seconds) of the block being executed.
    pub timestamp: u64,
}

impl BlockContext {
    /// Create a block context.
    pub fn new(height: u64, timestamp: u64) -> Self {
        Self { height, timestamp }
    }
}

/// Hex-encode a hash or address for logs and keys.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}
