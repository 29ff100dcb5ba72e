//! # Outbound Ports (Driven Ports)
//!
//! What the Ballot Engine needs from the observer registry.

use cb_01_observer_registry::Threshold;
use shared_types::{Address, ChainId, KeyValueStore};

use crate::domain::BallotError;

/// Read-only view of observer state.
///
/// Production: `RegistryDirectory` (adapters/registry.rs)
pub trait ObserverDirectory: Send + Sync {
    /// Operator addresses to fix as the voter list of a new ballot.
    fn voter_snapshot(&self, store: &dyn KeyValueStore) -> Result<Vec<Address>, BallotError>;

    /// True if the operator is currently tombstoned.
    fn is_tombstoned(&self, store: &dyn KeyValueStore, voter: &Address) -> Result<bool, BallotError>;

    /// Threshold for new ballots about `chain_id`.
    fn ballot_threshold(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<Threshold, BallotError>;
}
