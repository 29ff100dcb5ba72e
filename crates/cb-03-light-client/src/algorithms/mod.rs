//! Light client algorithms.

pub mod bitcoin_merkle;
pub mod bitcoin_tx;
pub mod headers;
pub mod trie_proof;

pub use bitcoin_merkle::{build_merkle_path, compute_merkle_root, verify_bitcoin_proof};
pub use bitcoin_tx::{decode_bitcoin_tx, BitcoinTxError};
pub use headers::{decode_header, double_sha256, keccak256, validate_claim};
pub use trie_proof::{verify_trie_proof, TrieProofError};
