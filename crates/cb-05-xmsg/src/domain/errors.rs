//! # Domain Errors
//!
//! Error types for the xmsg state machine.

use cb_01_observer_registry::RegistryError;
use cb_02_ballot_engine::BallotError;
use cb_03_light_client::LightClientError;
use cb_04_nonce_allocator::NonceError;
use shared_types::{ChainId, StoreError};
use thiserror::Error;

/// Xmsg error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmsgError {
    /// Storage failure.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Registry lookup or authorization failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Ballot engine rejected the vote.
    #[error("Ballot error: {0}")]
    Ballot(#[from] BallotError),

    /// Nonce allocator rejected the request.
    #[error("Nonce error: {0}")]
    Nonce(#[from] NonceError),

    /// Light client rejected a tracker proof.
    #[error("Light client error: {0}")]
    LightClient(#[from] LightClientError),

    /// Inbound observation is switched off.
    #[error("Inbound observation is disabled")]
    InboundDisabled,

    /// Inbound events must come from an external chain.
    #[error("Invalid sender chain: {0}")]
    InvalidSenderChain(ChainId),

    /// No xmsg with this index.
    #[error("Xmsg not found: {0}")]
    XmsgNotFound(String),

    /// An xmsg with this index already exists.
    #[error("Xmsg already exists: {0}")]
    XmsgAlreadyExists(String),

    /// No xmsg owns `(chain, nonce)`.
    #[error("No xmsg for chain {chain_id} nonce {nonce}")]
    NoXmsgForNonce {
        /// Destination chain
        chain_id: ChainId,
        /// Nonce
        nonce: u64,
    },

    /// The inbound event was already finalized by a different ballot.
    #[error("Observed tx already finalized: chain {chain_id} tx {in_tx_hash} event {event_index}")]
    ObservedTxAlreadyFinalized {
        /// Sender chain
        chain_id: ChainId,
        /// Inbound transaction hash
        in_tx_hash: String,
        /// Event index inside the transaction
        event_index: u64,
    },

    /// Outbound vote names a different chain or nonce than the current leg.
    #[error("Outbound mismatch for {index}: expected chain {expected_chain} nonce {expected_nonce}, got chain {chain_id} nonce {nonce}")]
    OutboundMismatch {
        /// Xmsg index
        index: String,
        /// Chain of the current leg
        expected_chain: ChainId,
        /// Nonce of the current leg
        expected_nonce: u64,
        /// Chain in the vote
        chain_id: ChainId,
        /// Nonce in the vote
        nonce: u64,
    },

    /// The xmsg is not waiting for an outbound observation.
    #[error("Xmsg {index} is not awaiting an outbound ({status})")]
    OutboundNotExpected {
        /// Xmsg index
        index: String,
        /// Current status
        status: &'static str,
    },

    /// Operation requires a pending xmsg.
    #[error("Xmsg {index} is not pending ({status})")]
    XmsgNotPending {
        /// Xmsg index
        index: String,
        /// Current status
        status: &'static str,
    },

    /// Status change not allowed by the state machine.
    #[error("Invalid xmsg transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status
        from: &'static str,
        /// Requested status
        to: &'static str,
    },

    /// A pending outbound leg has no nonce. Invariant violation.
    #[error("Pending outbound leg without nonce: {0}")]
    MissingNonce(String),

    /// Tracker hash from a non-observer without proof.
    #[error("Proof required for tracker update from {0}")]
    ProofRequired(String),

    /// Tracker proof did not verify against the light client.
    #[error("Proof verification failed: {0}")]
    ProofVerificationFailed(String),

    /// Rate limiter settings rejected.
    #[error("Invalid rate limiter flags: {0}")]
    InvalidRateLimiterFlags(String),
}

impl XmsgError {
    /// True for protocol invariant violations, as opposed to rejected requests.
    pub fn is_invariant_violation(&self) -> bool {
        match self {
            XmsgError::MissingNonce(_) => true,
            XmsgError::Nonce(e) => e.is_invariant_violation(),
            XmsgError::Ballot(BallotError::MisalignedVotes(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = XmsgError::OutboundMismatch {
            index: "ab".into(),
            expected_chain: 97,
            expected_nonce: 3,
            chain_id: 97,
            nonce: 4,
        };
        assert!(err.to_string().contains("nonce 3"));
        assert!(err.to_string().contains("nonce 4"));
    }

    #[test]
    fn test_invariant_classification() {
        assert!(XmsgError::MissingNonce("ab".into()).is_invariant_violation());
        assert!(XmsgError::Nonce(NonceError::NonceMismatch {
            chain_id: 97,
            counter: 2,
            high: 3,
        })
        .is_invariant_violation());
        assert!(!XmsgError::InboundDisabled.is_invariant_violation());
        assert!(!XmsgError::Nonce(NonceError::UnknownChain(5)).is_invariant_violation());
    }
}
