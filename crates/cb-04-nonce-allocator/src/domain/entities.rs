//! # Domain Entities
//!
//! Per-chain nonce counter, pending window, out-tx trackers and the
//! nonce-to-xmsg mapping.

use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, Hash};

/// Next nonce to hand out on a destination chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainNonces {
    /// Destination chain.
    pub chain_id: ChainId,
    /// Next nonce.
    pub nonce: u64,
}

/// Nonces allocated but not yet resolved: `[nonce_low, nonce_high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingNonces {
    /// Destination chain.
    pub chain_id: ChainId,
    /// Oldest unresolved nonce.
    pub nonce_low: u64,
    /// One past the newest allocated nonce.
    pub nonce_high: u64,
}

impl PendingNonces {
    /// Empty window starting at zero.
    pub fn empty(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            nonce_low: 0,
            nonce_high: 0,
        }
    }

    /// True if `nonce` is inside the window.
    pub fn contains(&self, nonce: u64) -> bool {
        nonce >= self.nonce_low && nonce < self.nonce_high
    }

    /// Number of nonces in flight.
    pub fn len(&self) -> u64 {
        self.nonce_high.saturating_sub(self.nonce_low)
    }

    /// True if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How an allocated nonce left the pending window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonceResolution {
    /// Outbound transaction mined with this hash.
    Confirmed(Hash),
    /// Nonce given up without a mined transaction.
    Released,
}

impl NonceResolution {
    /// Label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            NonceResolution::Confirmed(_) => "confirmed",
            NonceResolution::Released => "released",
        }
    }
}

/// Candidate outbound transaction hash reported for a nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHashEntry {
    /// Outbound transaction hash on the destination chain.
    pub tx_hash: Hash,
    /// Who reported it.
    pub signer: Address,
    /// True if backed by a light-client inclusion proof.
    pub proved: bool,
}

/// Candidate outbound hashes reported for one `(chain, nonce)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutTxTracker {
    /// Destination chain.
    pub chain_id: ChainId,
    /// Nonce.
    pub nonce: u64,
    /// Reported candidate hashes, oldest first.
    pub hash_list: Vec<TxHashEntry>,
    /// Hash the nonce was confirmed with, once mined.
    pub confirmed_hash: Option<Hash>,
}

impl OutTxTracker {
    /// Tracker with no hashes.
    pub fn new(chain_id: ChainId, nonce: u64) -> Self {
        Self {
            chain_id,
            nonce,
            hash_list: Vec::new(),
            confirmed_hash: None,
        }
    }

    /// Position of `tx_hash` in the hash list.
    pub fn position(&self, tx_hash: &Hash) -> Option<usize> {
        self.hash_list.iter().position(|entry| entry.tx_hash == *tx_hash)
    }
}

/// Which xmsg owns `(chain, nonce)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceToXmsg {
    /// Destination chain.
    pub chain_id: ChainId,
    /// Nonce.
    pub nonce: u64,
    /// Xmsg index.
    pub xmsg_index: Hash,
}

/// Result of adding a hash to a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerUpdate {
    /// First hash for this nonce.
    Created,
    /// Hash appended.
    Added,
    /// Hash was present; now marked as proved.
    MarkedProved,
    /// Hash was present; nothing changed.
    Unchanged,
}

/// Genesis state for the allocator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NonceGenesis {
    /// Chain counters.
    pub chain_nonces: Vec<ChainNonces>,
    /// Pending windows; a chain with a counter but no window gets `[n, n)`.
    pub pending_nonces: Vec<PendingNonces>,
    /// Out-tx trackers.
    pub out_tx_trackers: Vec<OutTxTracker>,
    /// Nonces already confirmed or released inside the pending windows.
    pub resolutions: Vec<(ChainId, u64, NonceResolution)>,
    /// Nonce ownership.
    pub nonce_to_xmsg: Vec<NonceToXmsg>,
}
