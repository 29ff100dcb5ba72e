//! # Observer Registry Service
//!
//! Reads and authorized writes for observers, TSS, chain parameters and
//! crosschain flags. All state lives in the host key-value store; the
//! service itself only holds configuration and collaborators.

use std::sync::Arc;

use shared_types::{
    get_record, put_record, required_tier_for_flag_update, scan_records, to_hex, Address,
    ChainId, ChainRegistry, KeyValueStore, PolicyAuthorizer, PolicyTier, StoreKey,
};

use crate::config::RegistryConfig;
use crate::domain::{
    invariant_tss_supersedes, ChainParams, CrosschainFlags, Observer, ObserverSet,
    ObserverStatus, RegistryError, RegistryGenesis, TssRecord,
};

const PREFIX_OBSERVER: &str = "observer";
const PREFIX_TSS: &str = "tss";
const PREFIX_PARAMS: &str = "params";
const PREFIX_FLAGS: &str = "flags";

fn set_key() -> Vec<u8> {
    StoreKey::new(PREFIX_OBSERVER).push("set").build()
}

fn observer_key(operator: &Address) -> Vec<u8> {
    StoreKey::new(PREFIX_OBSERVER).push("node").bytes(operator).build()
}

fn grantee_key(grantee: &Address) -> Vec<u8> {
    StoreKey::new(PREFIX_OBSERVER).push("grantee").bytes(grantee).build()
}

fn tss_current_key() -> Vec<u8> {
    StoreKey::new(PREFIX_TSS).push("current").build()
}

fn tss_history_key(keygen_height: u64) -> Vec<u8> {
    StoreKey::new(PREFIX_TSS).push("history").height(keygen_height).build()
}

fn tss_history_prefix() -> Vec<u8> {
    StoreKey::new(PREFIX_TSS).push("history").prefix()
}

fn chain_params_key(chain_id: ChainId) -> Vec<u8> {
    StoreKey::new(PREFIX_PARAMS).push("chain").chain(chain_id).build()
}

fn crosschain_flags_key() -> Vec<u8> {
    StoreKey::new(PREFIX_FLAGS).push("crosschain").build()
}

/// Observer Registry service.
pub struct ObserverRegistry {
    config: RegistryConfig,
    chains: Arc<ChainRegistry>,
    authorizer: Arc<dyn PolicyAuthorizer>,
}

impl ObserverRegistry {
    /// Create a registry service.
    pub fn new(
        config: RegistryConfig,
        chains: Arc<ChainRegistry>,
        authorizer: Arc<dyn PolicyAuthorizer>,
    ) -> Self {
        Self {
            config,
            chains,
            authorizer,
        }
    }

    /// Chain registry this service was built with.
    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    /// Fail with `Unauthorized` unless `signer` holds `tier`.
    pub fn ensure_authorized(&self, signer: &Address, tier: PolicyTier) -> Result<(), RegistryError> {
        if self.authorizer.is_authorized(signer, tier) {
            Ok(())
        } else {
            Err(RegistryError::Unauthorized {
                address: to_hex(signer),
                tier,
            })
        }
    }

    /// True if `signer` holds `tier`.
    pub fn is_authorized(&self, signer: &Address, tier: PolicyTier) -> bool {
        self.authorizer.is_authorized(signer, tier)
    }

    // =========================================================================
    // OBSERVERS
    // =========================================================================

    /// Current observer set (empty if none registered).
    pub fn observer_set(&self, store: &dyn KeyValueStore) -> Result<ObserverSet, RegistryError> {
        Ok(get_record(store, &set_key())?.unwrap_or_default())
    }

    /// Look up an observer by operator address.
    pub fn get_observer(
        &self,
        store: &dyn KeyValueStore,
        operator: &Address,
    ) -> Result<Option<Observer>, RegistryError> {
        Ok(get_record(store, &observer_key(operator))?)
    }

    /// Add an observer. Requires `Admin`.
    pub fn add_observer(
        &self,
        store: &mut dyn KeyValueStore,
        signer: &Address,
        operator: Address,
        grantee: Address,
    ) -> Result<Observer, RegistryError> {
        self.ensure_authorized(signer, PolicyTier::Admin)?;
        self.insert_observer(store, Observer::new(operator, grantee))
    }

    fn insert_observer(
        &self,
        store: &mut dyn KeyValueStore,
        observer: Observer,
    ) -> Result<Observer, RegistryError> {
        let mut set = self.observer_set(store)?;
        if set.contains(&observer.operator) {
            return Err(RegistryError::ObserverAlreadyExists(to_hex(&observer.operator)));
        }
        if set.len() >= self.config.max_observers {
            return Err(RegistryError::TooManyObservers {
                max: self.config.max_observers,
            });
        }
        if store.exists(&grantee_key(&observer.grantee))? {
            return Err(RegistryError::GranteeInUse(to_hex(&observer.grantee)));
        }

        set.insert(observer.operator);
        put_record(store, &set_key(), &set)?;
        put_record(store, &observer_key(&observer.operator), &observer)?;
        put_record(store, &grantee_key(&observer.grantee), &observer.operator)?;

        tracing::info!(
            "[cb-01] Observer added: operator={} set_size={}",
            to_hex(&observer.operator),
            set.len()
        );
        Ok(observer)
    }

    /// Remove an observer. Requires `Admin`.
    ///
    /// Ballots created before the removal keep the operator in their voter
    /// snapshot; the removed operator simply fails eligibility from now on.
    pub fn remove_observer(
        &self,
        store: &mut dyn KeyValueStore,
        signer: &Address,
        operator: &Address,
    ) -> Result<Observer, RegistryError> {
        self.ensure_authorized(signer, PolicyTier::Admin)?;

        let observer = self
            .get_observer(store, operator)?
            .ok_or_else(|| RegistryError::ObserverNotFound(to_hex(operator)))?;

        let mut set = self.observer_set(store)?;
        set.remove(operator);
        put_record(store, &set_key(), &set)?;
        store.delete(&observer_key(operator))?;
        store.delete(&grantee_key(&observer.grantee))?;

        tracing::info!("[cb-01] Observer removed: operator={}", to_hex(operator));
        Ok(observer)
    }

    /// Rebind an observer's grantee key. Requires `Admin`, or the operator itself.
    pub fn update_observer_grantee(
        &self,
        store: &mut dyn KeyValueStore,
        signer: &Address,
        operator: &Address,
        new_grantee: Address,
    ) -> Result<Observer, RegistryError> {
        if signer != operator {
            self.ensure_authorized(signer, PolicyTier::Admin)?;
        }

        let mut observer = self
            .get_observer(store, operator)?
            .ok_or_else(|| RegistryError::ObserverNotFound(to_hex(operator)))?;

        if observer.grantee == new_grantee {
            return Ok(observer);
        }
        if store.exists(&grantee_key(&new_grantee))? {
            return Err(RegistryError::GranteeInUse(to_hex(&new_grantee)));
        }

        store.delete(&grantee_key(&observer.grantee))?;
        observer.grantee = new_grantee;
        put_record(store, &grantee_key(&new_grantee), operator)?;
        put_record(store, &observer_key(operator), &observer)?;

        tracing::info!(
            "[cb-01] Observer grantee rotated: operator={} grantee={}",
            to_hex(operator),
            to_hex(&new_grantee)
        );
        Ok(observer)
    }

    /// Tombstone an observer until the next keygen epoch.
    ///
    /// Called by the host's slashing collaborator, not by user messages.
    pub fn tombstone_observer(
        &self,
        store: &mut dyn KeyValueStore,
        operator: &Address,
    ) -> Result<(), RegistryError> {
        let mut observer = self
            .get_observer(store, operator)?
            .ok_or_else(|| RegistryError::ObserverNotFound(to_hex(operator)))?;

        if observer.status == ObserverStatus::Tombstoned {
            return Ok(());
        }
        observer.status = ObserverStatus::Tombstoned;
        put_record(store, &observer_key(operator), &observer)?;

        tracing::warn!("[cb-01] Observer tombstoned: operator={}", to_hex(operator));
        Ok(())
    }

    /// Resolve a transaction signer (grantee key) to its operator address.
    pub fn resolve_signer(
        &self,
        store: &dyn KeyValueStore,
        signer: &Address,
    ) -> Result<Option<Address>, RegistryError> {
        Ok(get_record(store, &grantee_key(signer))?)
    }

    /// True if `operator` is in the set and not tombstoned.
    pub fn is_non_tombstoned_observer(
        &self,
        store: &dyn KeyValueStore,
        operator: &Address,
    ) -> Result<bool, RegistryError> {
        if !self.observer_set(store)?.contains(operator) {
            return Ok(false);
        }
        Ok(self
            .get_observer(store, operator)?
            .map(|o| o.is_active())
            .unwrap_or(false))
    }

    // =========================================================================
    // TSS
    // =========================================================================

    /// Current TSS, if any.
    pub fn get_tss(&self, store: &dyn KeyValueStore) -> Result<Option<TssRecord>, RegistryError> {
        Ok(get_record(store, &tss_current_key())?)
    }

    /// Current TSS or `TssNotFound`.
    pub fn require_tss(&self, store: &dyn KeyValueStore) -> Result<TssRecord, RegistryError> {
        self.get_tss(store)?.ok_or(RegistryError::TssNotFound)
    }

    /// All TSS records, oldest first.
    pub fn tss_history(&self, store: &dyn KeyValueStore) -> Result<Vec<TssRecord>, RegistryError> {
        Ok(scan_records::<TssRecord>(store, &tss_history_prefix())?
            .into_iter()
            .map(|(_, record)| record)
            .collect())
    }

    /// Install a new TSS. Requires `Admin`.
    ///
    /// Starts a new keygen epoch: tombstoned observers become active again.
    pub fn set_tss(
        &self,
        store: &mut dyn KeyValueStore,
        signer: &Address,
        tss: TssRecord,
    ) -> Result<(), RegistryError> {
        self.ensure_authorized(signer, PolicyTier::Admin)?;
        self.install_tss(store, tss)
    }

    fn install_tss(&self, store: &mut dyn KeyValueStore, tss: TssRecord) -> Result<(), RegistryError> {
        let current = self.get_tss(store)?;
        invariant_tss_supersedes(current.as_ref(), &tss)?;

        put_record(store, &tss_current_key(), &tss)?;
        put_record(store, &tss_history_key(tss.keygen_height), &tss)?;
        let restored = self.reset_epoch(store)?;

        tracing::info!(
            "[cb-01] TSS updated: keygen_height={} restored_observers={}",
            tss.keygen_height,
            restored
        );
        Ok(())
    }

    /// Clear every tombstone. Returns how many observers were restored.
    fn reset_epoch(&self, store: &mut dyn KeyValueStore) -> Result<usize, RegistryError> {
        let set = self.observer_set(store)?;
        let mut restored = 0;
        for operator in set.as_slice() {
            if let Some(mut observer) = self.get_observer(store, operator)? {
                if observer.status == ObserverStatus::Tombstoned {
                    observer.status = ObserverStatus::Active;
                    put_record(store, &observer_key(operator), &observer)?;
                    restored += 1;
                }
            }
        }
        Ok(restored)
    }

    // =========================================================================
    // CHAIN PARAMS
    // =========================================================================

    /// Stored parameters for a chain.
    pub fn chain_params(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<Option<ChainParams>, RegistryError> {
        Ok(get_record(store, &chain_params_key(chain_id))?)
    }

    /// Parameters of a chain that is external and supported.
    pub fn supported_chain_params(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<ChainParams, RegistryError> {
        if !self.chains.is_external(chain_id) {
            return Err(RegistryError::UnknownChain(chain_id));
        }
        match self.chain_params(store, chain_id)? {
            Some(params) if params.is_supported => Ok(params),
            _ => Err(RegistryError::UnsupportedChain(chain_id)),
        }
    }

    /// True if the chain is external and supported.
    pub fn is_supported_chain(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<bool, RegistryError> {
        match self.supported_chain_params(store, chain_id) {
            Ok(_) => Ok(true),
            Err(RegistryError::UnknownChain(_)) | Err(RegistryError::UnsupportedChain(_)) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Insert or replace chain parameters. Requires `Admin`.
    pub fn upsert_chain_params(
        &self,
        store: &mut dyn KeyValueStore,
        signer: &Address,
        params: ChainParams,
    ) -> Result<(), RegistryError> {
        self.ensure_authorized(signer, PolicyTier::Admin)?;
        self.write_chain_params(store, params)
    }

    fn write_chain_params(
        &self,
        store: &mut dyn KeyValueStore,
        params: ChainParams,
    ) -> Result<(), RegistryError> {
        if !self.chains.is_external(params.chain_id) {
            return Err(RegistryError::UnknownChain(params.chain_id));
        }
        params.ballot_threshold.validate()?;
        put_record(store, &chain_params_key(params.chain_id), &params)?;

        tracing::info!(
            "[cb-01] Chain params set: chain={} supported={} threshold={}",
            params.chain_id,
            params.is_supported,
            params.ballot_threshold
        );
        Ok(())
    }

    // =========================================================================
    // CROSSCHAIN FLAGS
    // =========================================================================

    /// Current crosschain flags (both enabled if never written).
    pub fn crosschain_flags(&self, store: &dyn KeyValueStore) -> Result<CrosschainFlags, RegistryError> {
        Ok(get_record(store, &crosschain_flags_key())?.unwrap_or_default())
    }

    /// Replace the crosschain flags.
    ///
    /// Enabling any flag requires `Operational`; a change that only disables
    /// requires `Emergency`.
    pub fn update_crosschain_flags(
        &self,
        store: &mut dyn KeyValueStore,
        signer: &Address,
        flags: CrosschainFlags,
    ) -> Result<CrosschainFlags, RegistryError> {
        let current = self.crosschain_flags(store)?;
        let tier = required_tier_for_flag_update(&current.as_switches(), &flags.as_switches());
        self.ensure_authorized(signer, tier)?;

        put_record(store, &crosschain_flags_key(), &flags)?;
        tracing::warn!(
            "[cb-01] Crosschain flags updated: inbound={} outbound={}",
            flags.is_inbound_enabled,
            flags.is_outbound_enabled
        );
        Ok(current)
    }

    // =========================================================================
    // GENESIS
    // =========================================================================

    /// Seed registry state. Bypasses authorization.
    pub fn import_genesis(
        &self,
        store: &mut dyn KeyValueStore,
        genesis: &RegistryGenesis,
    ) -> Result<(), RegistryError> {
        for observer in &genesis.observers {
            self.insert_observer(store, observer.clone())?;
        }
        for params in &genesis.chain_params {
            self.write_chain_params(store, params.clone())?;
        }
        if let Some(tss) = &genesis.tss {
            self.install_tss(store, tss.clone())?;
        }
        put_record(store, &crosschain_flags_key(), &genesis.crosschain_flags)?;
        Ok(())
    }
}
