//! # Domain Entities
//!
//! Observers, the observer set, TSS records, per-chain parameters and the
//! crosschain on/off switches.

use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId};

use super::value_objects::Threshold;

/// Operational status of an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObserverStatus {
    /// Eligible to vote.
    Active,
    /// Barred from voting until the next keygen epoch.
    Tombstoned,
}

/// An authorized off-chain participant.
///
/// Ballots record the `operator` address. Vote transactions are signed by
/// the `grantee` hot key and resolved back to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observer {
    /// Operator identity.
    pub operator: Address,
    /// Hot key used to sign vote transactions.
    pub grantee: Address,
    /// Current status.
    pub status: ObserverStatus,
}

impl Observer {
    /// Create an active observer.
    pub fn new(operator: Address, grantee: Address) -> Self {
        Self {
            operator,
            grantee,
            status: ObserverStatus::Active,
        }
    }

    /// True if the observer may vote.
    pub fn is_active(&self) -> bool {
        self.status == ObserverStatus::Active
    }
}

/// Ordered, deduplicated list of operator addresses eligible to vote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverSet {
    operators: Vec<Address>,
}

impl ObserverSet {
    /// Build a set, sorting and removing duplicates.
    pub fn new(operators: impl IntoIterator<Item = Address>) -> Self {
        let mut operators: Vec<Address> = operators.into_iter().collect();
        operators.sort_unstable();
        operators.dedup();
        Self { operators }
    }

    /// True if `operator` is a member.
    pub fn contains(&self, operator: &Address) -> bool {
        self.operators.binary_search(operator).is_ok()
    }

    /// Insert. Returns false if already present.
    pub fn insert(&mut self, operator: Address) -> bool {
        match self.operators.binary_search(&operator) {
            Ok(_) => false,
            Err(pos) => {
                self.operators.insert(pos, operator);
                true
            }
        }
    }

    /// Remove. Returns false if absent.
    pub fn remove(&mut self, operator: &Address) -> bool {
        match self.operators.binary_search(operator) {
            Ok(pos) => {
                self.operators.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// True if empty.
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Members in order.
    pub fn as_slice(&self) -> &[Address] {
        &self.operators
    }

    /// Owned snapshot of the members, used as a ballot voter list.
    pub fn snapshot(&self) -> Vec<Address> {
        self.operators.clone()
    }
}

/// Threshold-signature key metadata.
///
/// The core only allocates usage slots for this key; it never signs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TssRecord {
    /// Aggregate public key.
    pub pubkey: String,
    /// Participant public keys.
    pub participant_pubkeys: Vec<String>,
    /// Operators that took part in keygen.
    pub operators: Vec<Address>,
    /// Height at which keygen ran. Strictly increasing across records.
    pub keygen_height: u64,
    /// Height at which the record was finalized on chain.
    pub finalized_height: u64,
}

/// Per-chain observation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    /// Chain these parameters apply to.
    pub chain_id: ChainId,
    /// Whether observations for this chain are accepted.
    pub is_supported: bool,
    /// Finalization threshold for ballots about this chain.
    pub ballot_threshold: Threshold,
    /// Block confirmations observers wait before voting (advisory).
    pub confirmation_count: u64,
}

impl ChainParams {
    /// Supported chain with the default threshold.
    pub fn supported(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            is_supported: true,
            ballot_threshold: Threshold::default(),
            confirmation_count: 1,
        }
    }
}

/// Process-wide switches for inbound observation and outbound scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrosschainFlags {
    /// Accept inbound observation votes.
    pub is_inbound_enabled: bool,
    /// Allocate nonces for new outbound legs.
    pub is_outbound_enabled: bool,
}

impl CrosschainFlags {
    /// Switch values in a fixed order, for tier comparison.
    pub fn as_switches(&self) -> [bool; 2] {
        [self.is_inbound_enabled, self.is_outbound_enabled]
    }
}

impl Default for CrosschainFlags {
    fn default() -> Self {
        Self {
            is_inbound_enabled: true,
            is_outbound_enabled: true,
        }
    }
}

/// Genesis state for the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryGenesis {
    /// Initial observers.
    pub observers: Vec<Observer>,
    /// Initial TSS.
    pub tss: Option<TssRecord>,
    /// Initial chain parameters.
    pub chain_params: Vec<ChainParams>,
    /// Initial crosschain flags.
    pub crosschain_flags: CrosschainFlags,
}
