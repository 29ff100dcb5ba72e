//! # Domain Entities
//!
//! Header variants, stored headers, chain state and verification flags.

use serde::{Deserialize, Serialize};
use shared_types::{ChainFamily, ChainId, Hash};

/// Raw header bytes tagged with their chain family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderData {
    /// RLP-encoded Ethereum header.
    Ethereum(Vec<u8>),
    /// 80-byte Bitcoin header.
    Bitcoin(Vec<u8>),
}

impl HeaderData {
    /// Raw encoded header.
    pub fn raw(&self) -> &[u8] {
        match self {
            HeaderData::Ethereum(bytes) | HeaderData::Bitcoin(bytes) => bytes,
        }
    }

    /// Variant label.
    pub fn variant(&self) -> &'static str {
        match self {
            HeaderData::Ethereum(_) => "ethereum",
            HeaderData::Bitcoin(_) => "bitcoin",
        }
    }

    /// True if this variant is the header format of `family`.
    pub fn matches_family(&self, family: ChainFamily) -> bool {
        matches!(
            (self, family),
            (HeaderData::Ethereum(_), ChainFamily::Evm) | (HeaderData::Bitcoin(_), ChainFamily::Bitcoin)
        )
    }
}

/// Fields the light client reads out of a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedHeader {
    /// Hash of the header.
    pub hash: Hash,
    /// Hash of the parent header.
    pub parent_hash: Hash,
    /// Root that transaction proofs are checked against.
    pub tx_root: Hash,
    /// Height, when the header carries one (Ethereum).
    pub height: Option<u64>,
    /// Unix timestamp, when checked against the chain clock (Bitcoin).
    pub timestamp: Option<u64>,
}

/// A header that passed its ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Chain the header belongs to.
    pub chain_id: ChainId,
    /// Header hash.
    pub hash: Hash,
    /// Height.
    pub height: u64,
    /// Parent hash.
    pub parent_hash: Hash,
    /// Raw header.
    pub header: HeaderData,
}

/// Retained height range for a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    /// Chain.
    pub chain_id: ChainId,
    /// Lowest retained height.
    pub earliest_height: u64,
    /// Highest height reached contiguously.
    pub latest_height: u64,
    /// Hash of the header at `latest_height`.
    pub latest_block_hash: Hash,
}

/// Per-family switches for proof verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationFlags {
    /// Verify proofs against EVM headers.
    pub ethereum_type_chain_enabled: bool,
    /// Verify proofs against Bitcoin headers.
    pub bitcoin_type_chain_enabled: bool,
}

impl VerificationFlags {
    /// Both families enabled.
    pub fn all_enabled() -> Self {
        Self {
            ethereum_type_chain_enabled: true,
            bitcoin_type_chain_enabled: true,
        }
    }

    /// True if verification is on for `family`. Home is never verifiable.
    pub fn is_enabled(&self, family: ChainFamily) -> bool {
        match family {
            ChainFamily::Evm => self.ethereum_type_chain_enabled,
            ChainFamily::Bitcoin => self.bitcoin_type_chain_enabled,
            ChainFamily::Home => false,
        }
    }

    /// Switch values in a fixed order, for tier comparison.
    pub fn as_switches(&self) -> [bool; 2] {
        [self.ethereum_type_chain_enabled, self.bitcoin_type_chain_enabled]
    }
}

/// Genesis state for the light client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightClientGenesis {
    /// Initial verification flags.
    pub verification_flags: VerificationFlags,
    /// Trusted headers, imported without a ballot.
    pub block_headers: Vec<BlockHeader>,
}
