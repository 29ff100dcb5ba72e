//! # Value Objects
//!
//! Inclusion proofs and proof requests.

use serde::{Deserialize, Serialize};
use shared_types::{ChainId, Hash};

/// Proof that a transaction is included under a header's transaction root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proof {
    /// Merkle-Patricia trie nodes from the transactions root down to the
    /// leaf keyed by `rlp(tx_index)`.
    Ethereum {
        /// RLP-encoded trie nodes, any order.
        nodes: Vec<Vec<u8>>,
    },
    /// Raw transaction plus the sibling hashes from leaf to root.
    Bitcoin {
        /// Serialized transaction.
        tx_bytes: Vec<u8>,
        /// Sibling hashes, leaf level first.
        path: Vec<Hash>,
    },
}

impl Proof {
    /// Variant label.
    pub fn variant(&self) -> &'static str {
        match self {
            Proof::Ethereum { .. } => "ethereum",
            Proof::Bitcoin { .. } => "bitcoin",
        }
    }
}

/// One entry of a batch verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofRequest {
    /// Chain of the header.
    pub chain_id: ChainId,
    /// Header the proof is anchored to.
    pub block_hash: Hash,
    /// The proof.
    pub proof: Proof,
    /// Position of the transaction in the block.
    pub tx_index: u64,
}
