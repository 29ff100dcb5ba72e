//! # CB-03 Light-Client Header Store
//!
//! Stores external-chain block headers that observers agreed on and checks
//! transaction inclusion proofs against them.
//!
//! **Subsystem ID:** 03
//! **Architecture:** Hexagonal (Domain + Algorithms + Application service)
//!
//! ## Purpose
//!
//! - Header ballots: a header is stored only when its ballot succeeds
//! - Per-chain retained range with gap coalescing and pruning
//! - Ethereum transaction-trie proofs (Merkle-Patricia walk)
//! - Bitcoin SPV proofs (double SHA-256 merkle path)
//! - Per-family verification switches gated by policy tier
//!
//! ## Header Acceptance
//!
//! | Check | Error |
//! |-------|-------|
//! | Variant fits the chain family | `UnrecognizedHeaderType` |
//! | Hash not yet stored | `HeaderAlreadyExists` |
//! | Decodes within size limit | `InvalidHeader` / `HeaderTooLarge` |
//! | Hash and height match the claim | `InvalidHeader` |
//! | Timestamp within drift of block time | `TimestampTooFarInFuture` |
//! | Not below the retention window | `InvalidHeader` |
//! | Parent stored when extending the chain | `ParentNotFound` |
//!
//! ## Module Structure
//!
//! ```text
//! cb-03-light-client/
//! ├── domain/          # HeaderData, BlockHeader, ChainState, Proof, errors
//! ├── algorithms/      # Header decoding, trie proofs, bitcoin merkle paths
//! ├── application/     # LightClient service
//! ├── config.rs        # LightClientConfig
//! └── metrics.rs       # Prometheus counters (feature = "metrics")
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod metrics;

// Re-exports
pub use algorithms::{
    build_merkle_path, compute_merkle_root, decode_bitcoin_tx, decode_header, double_sha256,
    keccak256, verify_bitcoin_proof, verify_trie_proof, BitcoinTxError, TrieProofError,
};
pub use application::{HeaderVoteOutcome, LightClient};
pub use config::LightClientConfig;
pub use domain::{
    BlockHeader, ChainState, DecodedHeader, HeaderData, LightClientError, LightClientGenesis,
    Proof, ProofRequest, VerificationFlags,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
