//! # Registry Adapter
//!
//! Serves `ObserverDirectory` from `ObserverRegistry` state.

use std::sync::Arc;

use cb_01_observer_registry::{ObserverRegistry, ObserverStatus, Threshold};
use shared_types::{Address, ChainId, KeyValueStore};

use crate::domain::BallotError;
use crate::ports::ObserverDirectory;

/// `ObserverDirectory` backed by the observer registry.
pub struct RegistryDirectory {
    registry: Arc<ObserverRegistry>,
}

impl RegistryDirectory {
    /// Wrap a registry service.
    pub fn new(registry: Arc<ObserverRegistry>) -> Self {
        Self { registry }
    }
}

impl ObserverDirectory for RegistryDirectory {
    fn voter_snapshot(&self, store: &dyn KeyValueStore) -> Result<Vec<Address>, BallotError> {
        Ok(self.registry.observer_set(store)?.snapshot())
    }

    fn is_tombstoned(&self, store: &dyn KeyValueStore, voter: &Address) -> Result<bool, BallotError> {
        // A removed observer keeps its slot on ballots it was snapshotted into.
        Ok(matches!(
            self.registry.get_observer(store, voter)?,
            Some(observer) if observer.status == ObserverStatus::Tombstoned
        ))
    }

    fn ballot_threshold(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<Threshold, BallotError> {
        Ok(self
            .registry
            .supported_chain_params(store, chain_id)?
            .ballot_threshold)
    }
}
