//! Inclusion prover backed by the light-client header store.

use std::sync::Arc;

use cb_03_light_client::LightClient;
use shared_types::{ChainId, Hash, KeyValueStore};

use crate::domain::{TrackerProof, XmsgError};
use crate::ports::InclusionProver;

/// [`InclusionProver`] that checks proofs against ballot-verified headers.
pub struct LightClientProver {
    light_client: Arc<LightClient>,
}

impl LightClientProver {
    /// Wrap a light client.
    pub fn new(light_client: Arc<LightClient>) -> Self {
        Self { light_client }
    }
}

impl InclusionProver for LightClientProver {
    fn prove(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        proof: &TrackerProof,
        tx_hash: &Hash,
    ) -> Result<bool, XmsgError> {
        Ok(self.light_client.prove(
            store,
            chain_id,
            &proof.block_hash,
            &proof.proof,
            proof.tx_index,
            tx_hash,
        )?)
    }
}
