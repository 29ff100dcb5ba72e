//! # Outbound Ports
//!
//! Inclusion proofs for out-tx tracker updates from non-observers.

use shared_types::{ChainId, Hash, KeyValueStore};

use crate::domain::{TrackerProof, XmsgError};

/// Proves that a transaction is included in a verified external block.
pub trait InclusionProver: Send + Sync {
    /// True if `proof` verifies and its leaf hashes to `tx_hash`.
    fn prove(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        proof: &TrackerProof,
        tx_hash: &Hash,
    ) -> Result<bool, XmsgError>;
}
