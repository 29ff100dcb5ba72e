//! # Domain Errors
//!
//! Error types for the Observer Registry.

use shared_types::{ChainId, PolicyTier, StoreError};
use thiserror::Error;

/// Observer Registry error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Storage failure.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Signer lacks the required policy tier.
    #[error("Unauthorized: {address} does not hold {tier:?}")]
    Unauthorized {
        /// Hex signer address
        address: String,
        /// Required tier
        tier: PolicyTier,
    },

    /// Operator already registered.
    #[error("Observer already exists: {0}")]
    ObserverAlreadyExists(String),

    /// Operator not registered.
    #[error("Observer not found: {0}")]
    ObserverNotFound(String),

    /// Grantee key already bound to another operator.
    #[error("Grantee already in use: {0}")]
    GranteeInUse(String),

    /// Observer set is at capacity.
    #[error("Observer set full: max {max}")]
    TooManyObservers {
        /// Configured maximum
        max: usize,
    },

    /// Chain id not in the chain registry, or the home chain.
    #[error("Unknown chain: {0}")]
    UnknownChain(ChainId),

    /// Chain known but not accepting observations.
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(ChainId),

    /// Threshold outside (1/2, 1].
    #[error("Invalid threshold {numerator}/{denominator}: must be in (1/2, 1]")]
    InvalidThreshold {
        /// Numerator
        numerator: u64,
        /// Denominator
        denominator: u64,
    },

    /// No TSS has been set.
    #[error("TSS not found")]
    TssNotFound,

    /// New TSS does not supersede the current one.
    #[error("Stale keygen height: current {current}, proposed {proposed}")]
    StaleKeygen {
        /// Current keygen height
        current: u64,
        /// Proposed keygen height
        proposed: u64,
    },

    /// Malformed TSS record.
    #[error("Invalid TSS: {0}")]
    InvalidTss(String),
}
