//! # Light Client Service
//!
//! Header ballots, the header store and inclusion-proof verification.
//!
//! A header is stored only after its own ballot finalizes as success.
//! Verification reads stored headers and never writes, so any number of
//! proofs can be checked concurrently against a committed snapshot.

use std::sync::Arc;

use cb_01_observer_registry::ObserverRegistry;
use cb_02_ballot_engine::{
    BallotEngine, BallotId, BallotStatus, Observation, ObservationType, VoteType,
};
use rayon::prelude::*;
use shared_types::{
    get_record, put_record, required_tier_for_flag_update, scan_records, to_hex, Address,
    BlockContext, ChainFamily, ChainId, Hash, KeyValueStore, StoreKey,
};

use crate::algorithms::{
    decode_bitcoin_tx, decode_header, double_sha256, keccak256, validate_claim,
    verify_bitcoin_proof, verify_trie_proof,
};
use crate::config::LightClientConfig;
use crate::domain::{
    invariant_chain_state_ordered, BlockHeader, ChainState, DecodedHeader, HeaderData,
    LightClientError, LightClientGenesis, Proof, ProofRequest, VerificationFlags,
};
use crate::metrics;

const PREFIX_HEADER: &str = "header";

fn block_key(hash: &Hash) -> Vec<u8> {
    StoreKey::new(PREFIX_HEADER).push("block").bytes(hash).build()
}

fn height_key(chain_id: ChainId, height: u64, hash: &Hash) -> Vec<u8> {
    StoreKey::new(PREFIX_HEADER)
        .push("height")
        .chain(chain_id)
        .height(height)
        .bytes(hash)
        .build()
}

fn chain_heights_prefix(chain_id: ChainId) -> Vec<u8> {
    StoreKey::new(PREFIX_HEADER).push("height").chain(chain_id).prefix()
}

fn height_prefix(chain_id: ChainId, height: u64) -> Vec<u8> {
    StoreKey::new(PREFIX_HEADER)
        .push("height")
        .chain(chain_id)
        .height(height)
        .prefix()
}

fn chain_state_key(chain_id: ChainId) -> Vec<u8> {
    StoreKey::new(PREFIX_HEADER).push("state").chain(chain_id).build()
}

fn flags_key() -> Vec<u8> {
    StoreKey::new(PREFIX_HEADER).push("flags").build()
}

/// Ballot claim for a header: hash, height and the raw bytes.
fn header_claim(block_hash: &Hash, height: u64, header: &HeaderData) -> Vec<u8> {
    let raw = header.raw();
    let mut claim = Vec::with_capacity(32 + 8 + 1 + raw.len());
    claim.extend_from_slice(block_hash);
    claim.extend_from_slice(&height.to_be_bytes());
    claim.push(match header {
        HeaderData::Ethereum(_) => 0,
        HeaderData::Bitcoin(_) => 1,
    });
    claim.extend_from_slice(raw);
    claim
}

/// Result of a header vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderVoteOutcome {
    /// Header ballot.
    pub ballot_id: BallotId,
    /// Ballot status after the vote.
    pub status: BallotStatus,
    /// True if this vote created the ballot.
    pub created: bool,
    /// True if this vote finalized the ballot and the header was stored.
    pub header_stored: bool,
}

/// Light-Client Header Store and Proof Verifier.
pub struct LightClient {
    config: LightClientConfig,
    registry: Arc<ObserverRegistry>,
    ballots: Arc<BallotEngine>,
}

impl LightClient {
    /// Create a light client service.
    pub fn new(
        config: LightClientConfig,
        registry: Arc<ObserverRegistry>,
        ballots: Arc<BallotEngine>,
    ) -> Self {
        Self {
            config,
            registry,
            ballots,
        }
    }

    /// Light client configuration.
    pub fn config(&self) -> &LightClientConfig {
        &self.config
    }

    /// Ballot identifier of a header claim.
    pub fn header_ballot_id(
        chain_id: ChainId,
        block_hash: &Hash,
        height: u64,
        header: &HeaderData,
    ) -> BallotId {
        BallotId::derive(
            ObservationType::BlockHeader,
            chain_id,
            &header_claim(block_hash, height, header),
        )
    }

    fn header_family(&self, chain_id: ChainId) -> Result<ChainFamily, LightClientError> {
        match self.registry.chains().family(chain_id) {
            Some(ChainFamily::Home) | None => Err(LightClientError::UnrecognizedHeaderType(
                format!("chain {chain_id} has no header format"),
            )),
            Some(family) => Ok(family),
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Stored header by hash.
    pub fn get_block_header(
        &self,
        store: &dyn KeyValueStore,
        hash: &Hash,
    ) -> Result<Option<BlockHeader>, LightClientError> {
        Ok(get_record(store, &block_key(hash))?)
    }

    /// All stored headers, in hash order.
    pub fn list_block_headers(
        &self,
        store: &dyn KeyValueStore,
    ) -> Result<Vec<BlockHeader>, LightClientError> {
        let prefix = StoreKey::new(PREFIX_HEADER).push("block").prefix();
        Ok(scan_records::<BlockHeader>(store, &prefix)?
            .into_iter()
            .map(|(_, header)| header)
            .collect())
    }

    /// Hashes of stored headers at a height.
    pub fn headers_at_height(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        height: u64,
    ) -> Result<Vec<Hash>, LightClientError> {
        let prefix = height_prefix(chain_id, height);
        Ok(store
            .prefix_scan(&prefix)?
            .into_iter()
            .filter_map(|(key, _)| {
                let raw = hex::decode(&key[prefix.len()..]).ok()?;
                raw.try_into().ok()
            })
            .collect())
    }

    /// Retained range for a chain.
    pub fn get_chain_state(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<Option<ChainState>, LightClientError> {
        Ok(get_record(store, &chain_state_key(chain_id))?)
    }

    /// Retained ranges for every chain with headers.
    pub fn list_chain_states(
        &self,
        store: &dyn KeyValueStore,
    ) -> Result<Vec<ChainState>, LightClientError> {
        let prefix = StoreKey::new(PREFIX_HEADER).push("state").prefix();
        Ok(scan_records::<ChainState>(store, &prefix)?
            .into_iter()
            .map(|(_, state)| state)
            .collect())
    }

    /// Current verification flags (both off if never written).
    pub fn verification_flags(
        &self,
        store: &dyn KeyValueStore,
    ) -> Result<VerificationFlags, LightClientError> {
        Ok(get_record(store, &flags_key())?.unwrap_or_default())
    }

    // =========================================================================
    // VERIFICATION FLAGS
    // =========================================================================

    /// Replace the verification flags. Returns the previous flags.
    ///
    /// Enabling any family requires `Operational`; a change that only
    /// disables requires `Emergency`.
    pub fn update_verification_flags(
        &self,
        store: &mut dyn KeyValueStore,
        signer: &Address,
        flags: VerificationFlags,
    ) -> Result<VerificationFlags, LightClientError> {
        let current = self.verification_flags(store)?;
        let tier = required_tier_for_flag_update(&current.as_switches(), &flags.as_switches());
        self.registry.ensure_authorized(signer, tier)?;

        put_record(store, &flags_key(), &flags)?;
        tracing::warn!(
            "[cb-03] Verification flags updated: evm={} bitcoin={} by={}",
            flags.ethereum_type_chain_enabled,
            flags.bitcoin_type_chain_enabled,
            to_hex(signer)
        );
        Ok(current)
    }

    // =========================================================================
    // HEADER BALLOTS
    // =========================================================================

    /// Checks run before a header ballot is opened.
    ///
    /// Rejects headers that are already stored, do not decode, disagree
    /// with the claimed hash or height, are timestamped too far ahead, fall
    /// below the retention window, or extend the chain from an unknown
    /// parent. A header that leaves a gap above the latest height is
    /// accepted without a parent check.
    pub fn check_new_block_header(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        block_hash: &Hash,
        height: u64,
        header: &HeaderData,
        ctx: &BlockContext,
    ) -> Result<DecodedHeader, LightClientError> {
        let family = self.header_family(chain_id)?;
        if !header.matches_family(family) {
            return Err(LightClientError::UnrecognizedHeaderType(format!(
                "{} header for {} chain {chain_id}",
                header.variant(),
                family.as_str()
            )));
        }

        if self.get_block_header(store, block_hash)?.is_some() {
            return Err(LightClientError::HeaderAlreadyExists(hex::encode(block_hash)));
        }

        let decoded = decode_header(header, self.config.max_header_bytes)?;
        validate_claim(&decoded, block_hash, height)?;

        if let Some(timestamp) = decoded.timestamp {
            let max = ctx.timestamp.saturating_add(self.config.max_future_drift_secs);
            if timestamp > max {
                return Err(LightClientError::TimestampTooFarInFuture { timestamp, max });
            }
        }

        if let Some(state) = self.get_chain_state(store, chain_id)? {
            let retention = self.config.header_retention;
            if retention > 0 && height.saturating_add(retention) <= state.latest_height {
                return Err(LightClientError::InvalidHeader(format!(
                    "height {height} is below the retention window (latest {})",
                    state.latest_height
                )));
            }

            if height > state.earliest_height && height <= state.latest_height + 1 {
                let parent = self.get_block_header(store, &decoded.parent_hash)?;
                let linked = matches!(
                    &parent,
                    Some(p) if p.chain_id == chain_id && p.height + 1 == height
                );
                if !linked {
                    return Err(LightClientError::ParentNotFound(hex::encode(
                        decoded.parent_hash,
                    )));
                }
            }
        }

        Ok(decoded)
    }

    /// Vote that a header exists on an external chain.
    ///
    /// `signer` is resolved from grantee to operator. Validation runs only
    /// when the vote opens the ballot; later votes on the same claim are
    /// plain ballot votes. The header is stored when this vote finalizes
    /// the ballot as success.
    #[allow(clippy::too_many_arguments)]
    pub fn vote_block_header(
        &self,
        store: &mut dyn KeyValueStore,
        signer: &Address,
        chain_id: ChainId,
        block_hash: Hash,
        height: u64,
        header: HeaderData,
        ctx: &BlockContext,
    ) -> Result<HeaderVoteOutcome, LightClientError> {
        self.registry.supported_chain_params(store, chain_id)?;
        let operator = self.registry.resolve_signer(store, signer)?.unwrap_or(*signer);

        let observation = Observation::new(
            ObservationType::BlockHeader,
            chain_id,
            header_claim(&block_hash, height, &header),
        );
        let ballot_id = observation.ballot_id();

        if self.ballots.get_ballot(store, &ballot_id)?.is_none() {
            self.check_new_block_header(store, chain_id, &block_hash, height, &header, ctx)?;
        }

        let outcome =
            self.ballots
                .vote_on_observation(store, &observation, &operator, VoteType::Success, ctx)?;

        let mut header_stored = false;
        if outcome.finalized_now && outcome.status() == BallotStatus::FinalizedSuccess {
            let decoded = decode_header(&header, self.config.max_header_bytes)?;
            header_stored = self.store_header(
                store,
                BlockHeader {
                    chain_id,
                    hash: block_hash,
                    height,
                    parent_hash: decoded.parent_hash,
                    header,
                },
            )?;
        }

        Ok(HeaderVoteOutcome {
            ballot_id,
            status: outcome.status(),
            created: outcome.created,
            header_stored,
        })
    }

    /// Persist a header and advance the chain state.
    ///
    /// Returns false if the hash was already stored.
    fn store_header(
        &self,
        store: &mut dyn KeyValueStore,
        header: BlockHeader,
    ) -> Result<bool, LightClientError> {
        if self.get_block_header(store, &header.hash)?.is_some() {
            tracing::warn!(
                "[cb-03] Header already stored, skipping: chain={} hash={}",
                header.chain_id,
                hex::encode(header.hash)
            );
            return Ok(false);
        }

        put_record(store, &block_key(&header.hash), &header)?;
        store.put(&height_key(header.chain_id, header.height, &header.hash), &[])?;

        let state = match self.get_chain_state(store, header.chain_id)? {
            None => ChainState {
                chain_id: header.chain_id,
                earliest_height: header.height,
                latest_height: header.height,
                latest_block_hash: header.hash,
            },
            Some(mut state) => {
                if header.height == state.latest_height + 1 {
                    state.latest_height = header.height;
                    state.latest_block_hash = header.hash;
                    // Headers stored earlier above a gap become contiguous.
                    while let Some(next) = self
                        .headers_at_height(store, header.chain_id, state.latest_height + 1)?
                        .first()
                        .copied()
                    {
                        state.latest_height += 1;
                        state.latest_block_hash = next;
                    }
                } else if header.height < state.earliest_height {
                    state.earliest_height = header.height;
                }
                state
            }
        };
        debug_assert!(invariant_chain_state_ordered(&state));

        let state = self.prune(store, state)?;
        put_record(store, &chain_state_key(state.chain_id), &state)?;

        metrics::record_header_stored(header.header.variant());
        tracing::info!(
            "[cb-03] Header stored: chain={} height={} hash={} latest={}",
            header.chain_id,
            header.height,
            hex::encode(header.hash),
            state.latest_height
        );
        Ok(true)
    }

    /// Drop headers below the retention window.
    fn prune(
        &self,
        store: &mut dyn KeyValueStore,
        mut state: ChainState,
    ) -> Result<ChainState, LightClientError> {
        let retention = self.config.header_retention;
        if retention == 0 || state.latest_height - state.earliest_height < retention {
            return Ok(state);
        }
        let floor = state.latest_height + 1 - retention;

        let prefix = chain_heights_prefix(state.chain_id);
        let mut pruned = 0usize;
        for (key, _) in store.prefix_scan(&prefix)? {
            let tail = &key[prefix.len()..];
            let height = std::str::from_utf8(&tail[..tail.len().min(20)])
                .ok()
                .and_then(|digits| digits.parse::<u64>().ok());
            let hash = tail
                .get(21..)
                .and_then(|encoded| hex::decode(encoded).ok())
                .and_then(|raw| <Hash>::try_from(raw).ok());

            match (height, hash) {
                (Some(height), Some(hash)) if height < floor => {
                    store.delete(&block_key(&hash))?;
                    store.delete(&key)?;
                    pruned += 1;
                }
                (Some(_), Some(_)) => break,
                _ => {}
            }
        }

        state.earliest_height = floor;
        tracing::debug!(
            "[cb-03] Pruned {} headers: chain={} earliest={}",
            pruned,
            state.chain_id,
            floor
        );
        Ok(state)
    }

    // =========================================================================
    // PROOFS
    // =========================================================================

    /// Verify an inclusion proof and return the transaction bytes.
    pub fn verify_proof(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        block_hash: &Hash,
        proof: &Proof,
        tx_index: u64,
    ) -> Result<Vec<u8>, LightClientError> {
        let result = self.verify_proof_inner(store, chain_id, block_hash, proof, tx_index);
        metrics::record_proof_verified(result.is_ok());
        result
    }

    fn verify_proof_inner(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        block_hash: &Hash,
        proof: &Proof,
        tx_index: u64,
    ) -> Result<Vec<u8>, LightClientError> {
        let family = self.header_family(chain_id)?;
        if !self.verification_flags(store)?.is_enabled(family) {
            return Err(LightClientError::VerificationDisabled {
                chain_id,
                family: family.as_str(),
            });
        }

        let stored = match self.get_block_header(store, block_hash)? {
            Some(header) if header.chain_id == chain_id => header,
            _ => return Err(LightClientError::BlockHeaderNotFound(hex::encode(block_hash))),
        };
        let decoded = decode_header(&stored.header, usize::MAX)?;

        match (&stored.header, proof) {
            (HeaderData::Ethereum(_), Proof::Ethereum { nodes }) => {
                let key = rlp::encode(&tx_index).to_vec();
                match verify_trie_proof(&decoded.tx_root, &key, nodes) {
                    Ok(Some(tx_bytes)) => Ok(tx_bytes),
                    Ok(None) => Err(LightClientError::ProofVerificationFailed(format!(
                        "no transaction at index {tx_index}"
                    ))),
                    Err(e) => Err(LightClientError::ProofVerificationFailed(e.to_string())),
                }
            }
            (HeaderData::Bitcoin(_), Proof::Bitcoin { tx_bytes, path }) => {
                decode_bitcoin_tx(tx_bytes).map_err(|e| {
                    LightClientError::ProofVerificationFailed(format!(
                        "invalid bitcoin transaction: {e}"
                    ))
                })?;
                if verify_bitcoin_proof(&decoded.tx_root, tx_bytes, path, tx_index) {
                    Ok(tx_bytes.clone())
                } else {
                    Err(LightClientError::ProofVerificationFailed(
                        "merkle path does not lead to the header root".to_string(),
                    ))
                }
            }
            (header, proof) => Err(LightClientError::UnrecognizedHeaderType(format!(
                "{} proof against {} header",
                proof.variant(),
                header.variant()
            ))),
        }
    }

    /// True if the proof verifies and the transaction hashes to `tx_hash`.
    ///
    /// A failed proof is `Ok(false)`; a missing header or disabled
    /// verification is an error.
    pub fn prove(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        block_hash: &Hash,
        proof: &Proof,
        tx_index: u64,
        tx_hash: &Hash,
    ) -> Result<bool, LightClientError> {
        let tx_bytes = match self.verify_proof(store, chain_id, block_hash, proof, tx_index) {
            Ok(tx_bytes) => tx_bytes,
            Err(LightClientError::ProofVerificationFailed(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        let computed = match proof {
            Proof::Ethereum { .. } => keccak256(&tx_bytes),
            Proof::Bitcoin { .. } => double_sha256(&tx_bytes),
        };
        Ok(computed == *tx_hash)
    }

    /// Verify a batch of proofs in parallel. Results keep request order.
    pub fn verify_proofs(
        &self,
        store: &dyn KeyValueStore,
        requests: &[ProofRequest],
    ) -> Vec<Result<Vec<u8>, LightClientError>> {
        requests
            .par_iter()
            .map(|req| {
                self.verify_proof(store, req.chain_id, &req.block_hash, &req.proof, req.tx_index)
            })
            .collect()
    }

    // =========================================================================
    // GENESIS
    // =========================================================================

    /// Seed flags and trusted headers. Bypasses ballots and authorization.
    pub fn import_genesis(
        &self,
        store: &mut dyn KeyValueStore,
        genesis: &LightClientGenesis,
    ) -> Result<(), LightClientError> {
        put_record(store, &flags_key(), &genesis.verification_flags)?;
        for header in &genesis.block_headers {
            self.header_family(header.chain_id)?;
            let decoded = decode_header(&header.header, self.config.max_header_bytes)?;
            validate_claim(&decoded, &header.hash, header.height)?;
            self.store_header(store, header.clone())?;
        }
        Ok(())
    }
}
