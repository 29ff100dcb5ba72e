//! # Domain Errors
//!
//! Error types for the Light-Client Header Store.

use cb_01_observer_registry::RegistryError;
use cb_02_ballot_engine::BallotError;
use shared_types::{ChainId, StoreError};
use thiserror::Error;

/// Light client error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LightClientError {
    /// Storage failure.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Registry lookup or authorization failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Ballot engine rejected the header vote.
    #[error("Ballot error: {0}")]
    Ballot(#[from] BallotError),

    /// Proof verification is switched off for the chain's family.
    #[error("Verification disabled for chain {chain_id} ({family})")]
    VerificationDisabled {
        /// Chain the proof was for
        chain_id: ChainId,
        /// Chain family label
        family: &'static str,
    },

    /// No stored header with this hash.
    #[error("Block header not found: {0}")]
    BlockHeaderNotFound(String),

    /// The proof does not lead to a transaction in the header.
    #[error("Proof verification failed: {0}")]
    ProofVerificationFailed(String),

    /// Header or proof variant does not fit the chain.
    #[error("Unrecognized header type: {0}")]
    UnrecognizedHeaderType(String),

    /// Header bytes do not decode or disagree with the claimed hash/height.
    #[error("Invalid block header: {0}")]
    InvalidHeader(String),

    /// Header exceeds the size limit.
    #[error("Header too large: {size} > {max} bytes")]
    HeaderTooLarge {
        /// Encoded size
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Header is already stored.
    #[error("Block header already exists: {0}")]
    HeaderAlreadyExists(String),

    /// Parent of a contiguous header is not stored.
    #[error("Parent header not found: {0}")]
    ParentNotFound(String),

    /// Header timestamp is too far ahead of the chain clock.
    #[error("Header timestamp {timestamp} too far in the future (max {max})")]
    TimestampTooFarInFuture {
        /// Header timestamp
        timestamp: u64,
        /// Latest accepted timestamp
        max: u64,
    },
}
