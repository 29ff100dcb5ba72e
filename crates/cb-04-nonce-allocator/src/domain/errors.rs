//! # Domain Errors
//!
//! Error types for the Outbound Nonce Allocator.

use shared_types::{ChainId, PolicyTier, StoreError};
use thiserror::Error;

/// Nonce allocator error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NonceError {
    /// Storage failure.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Chain id is not an external chain.
    #[error("Unknown chain: {0}")]
    UnknownChain(ChainId),

    /// Signer lacks the required policy tier.
    #[error("Unauthorized: {address} does not hold {tier:?}")]
    Unauthorized {
        /// Hex signer address
        address: String,
        /// Required tier
        tier: PolicyTier,
    },

    /// Counter and pending window disagree. Invariant violation.
    #[error("Nonce mismatch on chain {chain_id}: counter {counter}, pending high {high}")]
    NonceMismatch {
        /// Chain
        chain_id: ChainId,
        /// Chain nonce counter
        counter: u64,
        /// Pending window upper bound
        high: u64,
    },

    /// Too many nonces in flight for the chain.
    #[error("Pending window full on chain {chain_id}: {pending} >= {max}")]
    WindowFull {
        /// Chain
        chain_id: ChainId,
        /// Nonces currently pending
        pending: u64,
        /// Configured cap
        max: u64,
    },

    /// Nonce was never handed out.
    #[error("Nonce {nonce} not allocated on chain {chain_id}")]
    NonceNotAllocated {
        /// Chain
        chain_id: ChainId,
        /// Nonce
        nonce: u64,
    },

    /// Nonce is below the pending window and has no recorded resolution.
    #[error("Nonce {nonce} is not pending on chain {chain_id}")]
    NonceNotPending {
        /// Chain
        chain_id: ChainId,
        /// Nonce
        nonce: u64,
    },

    /// Nonce already confirmed with another transaction hash.
    #[error("Nonce {nonce} on chain {chain_id} already confirmed with {existing}")]
    ConflictingConfirmation {
        /// Chain
        chain_id: ChainId,
        /// Nonce
        nonce: u64,
        /// Hex of the recorded hash
        existing: String,
    },

    /// Nonce was released without a transaction and cannot be confirmed.
    #[error("Nonce {nonce} on chain {chain_id} was released")]
    NonceReleased {
        /// Chain
        chain_id: ChainId,
        /// Nonce
        nonce: u64,
    },

    /// Nonce was confirmed and cannot be released.
    #[error("Nonce {nonce} on chain {chain_id} is already confirmed")]
    NonceConfirmed {
        /// Chain
        chain_id: ChainId,
        /// Nonce
        nonce: u64,
    },

    /// Tracker holds the maximum number of candidate hashes.
    #[error("Out-tx tracker full for chain {chain_id} nonce {nonce}: {max} hashes")]
    TrackerFull {
        /// Chain
        chain_id: ChainId,
        /// Nonce
        nonce: u64,
        /// Configured cap
        max: usize,
    },

    /// Reset window with `low > high`.
    #[error("Invalid nonce window [{low}, {high})")]
    InvalidWindow {
        /// Requested low
        low: u64,
        /// Requested high
        high: u64,
    },

    /// Reset would move either end of the window backwards.
    #[error(
        "Nonce window on chain {chain_id} cannot move from [{current_low}, {current_high}) to [{low}, {high})"
    )]
    WindowRegression {
        /// Chain
        chain_id: ChainId,
        /// Requested low
        low: u64,
        /// Requested high
        high: u64,
        /// Stored low
        current_low: u64,
        /// Stored high
        current_high: u64,
    },
}

impl NonceError {
    /// True for errors that indicate corrupted allocator state rather than a
    /// bad request.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, NonceError::NonceMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NonceError::WindowFull {
            chain_id: 97,
            pending: 4,
            max: 4,
        };
        assert!(err.to_string().contains("chain 97"));
    }

    #[test]
    fn test_invariant_classification() {
        let mismatch = NonceError::NonceMismatch {
            chain_id: 1,
            counter: 3,
            high: 2,
        };
        assert!(mismatch.is_invariant_violation());
        assert!(!NonceError::UnknownChain(5).is_invariant_violation());
    }
}
