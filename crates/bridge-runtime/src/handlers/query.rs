//! # Query Service
//!
//! Read-only view over one committed snapshot. Snapshots are immutable, so
//! any number of query services may run on any threads while the next block
//! executes.

use std::sync::Arc;

use cb_01_observer_registry::{CrosschainFlags, Observer, ObserverSet, TssRecord};
use cb_02_ballot_engine::{Ballot, BallotId};
use cb_03_light_client::{BlockHeader, ChainState, Proof, ProofRequest, VerificationFlags};
use cb_04_nonce_allocator::{OutTxTracker, PendingNonces};
use cb_05_xmsg::{InTxTracker, PendingXmsgs, RateLimitedPending, RateLimiterFlags, Xmsg, XmsgIndex};
use shared_types::{Address, ChainId, Hash, InMemoryKVStore, KeyValueStore};

use crate::app::{BridgeApp, BridgeError};

/// Reads against a committed snapshot.
#[derive(Clone)]
pub struct QueryService {
    app: Arc<BridgeApp>,
    snapshot: Arc<InMemoryKVStore>,
    height: u64,
}

impl QueryService {
    /// Query `snapshot`, committed at `height`.
    pub fn new(app: Arc<BridgeApp>, snapshot: Arc<InMemoryKVStore>, height: u64) -> Self {
        Self {
            app,
            snapshot,
            height,
        }
    }

    /// Height of the snapshot.
    pub fn height(&self) -> u64 {
        self.height
    }

    fn store(&self) -> &dyn KeyValueStore {
        self.snapshot.as_ref()
    }

    // =========================================================================
    // REGISTRY
    // =========================================================================

    /// Current observer set.
    pub fn observer_set(&self) -> Result<ObserverSet, BridgeError> {
        Ok(self.app.services().registry.observer_set(self.store())?)
    }

    /// Observer by operator.
    pub fn get_observer(&self, operator: &Address) -> Result<Option<Observer>, BridgeError> {
        Ok(self.app.services().registry.get_observer(self.store(), operator)?)
    }

    /// Current TSS.
    pub fn get_tss(&self) -> Result<Option<TssRecord>, BridgeError> {
        Ok(self.app.services().registry.get_tss(self.store())?)
    }

    /// Crosschain switches.
    pub fn crosschain_flags(&self) -> Result<CrosschainFlags, BridgeError> {
        Ok(self.app.services().registry.crosschain_flags(self.store())?)
    }

    // =========================================================================
    // BALLOTS
    // =========================================================================

    /// Ballot by id.
    pub fn get_ballot(&self, id: &BallotId) -> Result<Option<Ballot>, BridgeError> {
        Ok(self.app.services().ballots.get_ballot(self.store(), id)?)
    }

    /// Finalized ballots that matured at the snapshot height.
    pub fn matured_ballots(&self) -> Result<Vec<BallotId>, BridgeError> {
        Ok(self
            .app
            .services()
            .ballots
            .matured_ballot_list(self.store(), self.height)?)
    }

    // =========================================================================
    // XMSG
    // =========================================================================

    /// Xmsg by index.
    pub fn get_xmsg(&self, index: &XmsgIndex) -> Result<Option<Xmsg>, BridgeError> {
        Ok(self.app.services().xmsg.get_xmsg(self.store(), index)?)
    }

    /// Xmsg owning `(chain, nonce)`.
    pub fn xmsg_by_nonce(&self, chain_id: ChainId, nonce: u64) -> Result<Option<Xmsg>, BridgeError> {
        Ok(self.app.services().xmsg.xmsg_by_nonce(self.store(), chain_id, nonce)?)
    }

    /// Xmsgs created by one inbound transaction.
    pub fn xmsgs_by_in_tx_hash(&self, in_tx_hash: &Hash) -> Result<Vec<Xmsg>, BridgeError> {
        Ok(self
            .app
            .services()
            .xmsg
            .xmsgs_by_in_tx_hash(self.store(), in_tx_hash)?)
    }

    /// Pending xmsgs on one chain.
    pub fn list_pending_xmsgs(
        &self,
        chain_id: ChainId,
        limit: Option<u32>,
    ) -> Result<PendingXmsgs, BridgeError> {
        Ok(self
            .app
            .services()
            .xmsg
            .list_pending_xmsgs(self.store(), chain_id, limit)?)
    }

    /// Pending xmsgs on every chain, throttled at the snapshot height.
    pub fn list_pending_within_rate_limit(
        &self,
        limit: Option<u32>,
    ) -> Result<RateLimitedPending, BridgeError> {
        Ok(self
            .app
            .services()
            .xmsg
            .list_pending_within_rate_limit(self.store(), self.height, limit)?)
    }

    /// Withdraw rate limiter settings in force.
    pub fn rate_limiter_flags(&self) -> Result<RateLimiterFlags, BridgeError> {
        Ok(self.app.services().xmsg.rate_limiter_flags(self.store())?)
    }

    /// Inbound tracker of `(chain, tx_hash)`.
    pub fn get_in_tx_tracker(
        &self,
        chain_id: ChainId,
        tx_hash: &Hash,
    ) -> Result<Option<InTxTracker>, BridgeError> {
        Ok(self
            .app
            .services()
            .xmsg
            .get_in_tx_tracker(self.store(), chain_id, tx_hash)?)
    }

    /// Inbound trackers, for one chain or all.
    pub fn list_in_tx_trackers(
        &self,
        chain_id: Option<ChainId>,
    ) -> Result<Vec<InTxTracker>, BridgeError> {
        Ok(self.app.services().xmsg.list_in_tx_trackers(self.store(), chain_id)?)
    }

    // =========================================================================
    // NONCES
    // =========================================================================

    /// Pending window of a chain.
    pub fn pending_window(&self, chain_id: ChainId) -> Result<PendingNonces, BridgeError> {
        Ok(self.app.services().nonces.pending_window(self.store(), chain_id)?)
    }

    /// Out-tx tracker of `(chain, nonce)`.
    pub fn get_tracker(&self, chain_id: ChainId, nonce: u64) -> Result<Option<OutTxTracker>, BridgeError> {
        Ok(self.app.services().nonces.get_tracker(self.store(), chain_id, nonce)?)
    }

    // =========================================================================
    // LIGHT CLIENT
    // =========================================================================

    /// Stored header.
    pub fn get_block_header(&self, hash: &Hash) -> Result<Option<BlockHeader>, BridgeError> {
        Ok(self.app.services().light_client.get_block_header(self.store(), hash)?)
    }

    /// Retained range of a chain.
    pub fn chain_state(&self, chain_id: ChainId) -> Result<Option<ChainState>, BridgeError> {
        Ok(self.app.services().light_client.get_chain_state(self.store(), chain_id)?)
    }

    /// Verification switches.
    pub fn verification_flags(&self) -> Result<VerificationFlags, BridgeError> {
        Ok(self.app.services().light_client.verification_flags(self.store())?)
    }

    /// Verify an inclusion proof and compare the leaf with `tx_hash`.
    pub fn prove(
        &self,
        chain_id: ChainId,
        block_hash: &Hash,
        proof: &Proof,
        tx_index: u64,
        tx_hash: &Hash,
    ) -> Result<bool, BridgeError> {
        Ok(self.app.services().light_client.prove(
            self.store(),
            chain_id,
            block_hash,
            proof,
            tx_index,
            tx_hash,
        )?)
    }

    /// Verify a batch of proofs in parallel. Results keep request order.
    pub fn verify_proofs(&self, requests: &[ProofRequest]) -> Vec<Result<Vec<u8>, BridgeError>> {
        self.app
            .services()
            .light_client
            .verify_proofs(self.store(), requests)
            .into_iter()
            .map(|result| result.map_err(BridgeError::from))
            .collect()
    }
}
