//! # Nonce Allocator Service
//!
//! Hands out outbound nonces per destination chain and tracks which of
//! them are still in flight.
//!
//! ## Records
//!
//! | Key | Value |
//! |-----|-------|
//! | `nonce/counter/<chain>` | `ChainNonces` |
//! | `nonce/pending/<chain>` | `PendingNonces` |
//! | `nonce/resolved/<chain>/<nonce>` | `NonceResolution` |
//! | `nonce/tracker/<chain>/<nonce>` | `OutTxTracker` |
//! | `nonce/xmsg/<chain>/<nonce>` | `NonceToXmsg` |
//!
//! The counter and the window's high end move together; any disagreement
//! is reported as `NonceMismatch` and nothing is written.
//!
//! Neither end of the window ever moves backwards. Resolution records are
//! only kept inside the window: once `low` passes a nonce its record is
//! deleted and the nonce can no longer be confirmed or released.

use std::sync::Arc;

use shared_types::{
    delete_record, get_record, put_record, scan_records, to_hex, Address, ChainId, ChainRegistry,
    Hash, KeyValueStore, PolicyAuthorizer, PolicyTier, StoreKey,
};

use crate::algorithms::advance_low;
use crate::config::AllocatorConfig;
use crate::domain::{
    invariant_counter_matches, invariant_window_ordered, ChainNonces, NonceError, NonceGenesis,
    NonceResolution, NonceToXmsg, OutTxTracker, PendingNonces, TrackerUpdate, TxHashEntry,
};
use crate::metrics;

const PREFIX_NONCE: &str = "nonce";

fn counter_key(chain_id: ChainId) -> Vec<u8> {
    StoreKey::new(PREFIX_NONCE).push("counter").chain(chain_id).build()
}

fn pending_key(chain_id: ChainId) -> Vec<u8> {
    StoreKey::new(PREFIX_NONCE).push("pending").chain(chain_id).build()
}

fn resolved_key(chain_id: ChainId, nonce: u64) -> Vec<u8> {
    StoreKey::new(PREFIX_NONCE)
        .push("resolved")
        .chain(chain_id)
        .height(nonce)
        .build()
}

fn tracker_key(chain_id: ChainId, nonce: u64) -> Vec<u8> {
    StoreKey::new(PREFIX_NONCE)
        .push("tracker")
        .chain(chain_id)
        .height(nonce)
        .build()
}

fn nonce_to_xmsg_key(chain_id: ChainId, nonce: u64) -> Vec<u8> {
    StoreKey::new(PREFIX_NONCE)
        .push("xmsg")
        .chain(chain_id)
        .height(nonce)
        .build()
}

/// Outbound Nonce Allocator.
pub struct NonceAllocator {
    config: AllocatorConfig,
    chains: Arc<ChainRegistry>,
    policy: Arc<dyn PolicyAuthorizer>,
}

impl NonceAllocator {
    /// Create an allocator.
    pub fn new(
        config: AllocatorConfig,
        chains: Arc<ChainRegistry>,
        policy: Arc<dyn PolicyAuthorizer>,
    ) -> Self {
        Self {
            config,
            chains,
            policy,
        }
    }

    /// Allocator configuration.
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    fn ensure_chain(&self, chain_id: ChainId) -> Result<(), NonceError> {
        if !self.chains.is_external(chain_id) {
            return Err(NonceError::UnknownChain(chain_id));
        }
        Ok(())
    }

    fn ensure_authorized(&self, signer: &Address, tier: PolicyTier) -> Result<(), NonceError> {
        if !self.policy.is_authorized(signer, tier) {
            return Err(NonceError::Unauthorized {
                address: to_hex(signer),
                tier,
            });
        }
        Ok(())
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Counter for a chain.
    pub fn get_chain_nonces(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<Option<ChainNonces>, NonceError> {
        Ok(get_record(store, &counter_key(chain_id))?)
    }

    /// Every chain counter.
    pub fn list_chain_nonces(&self, store: &dyn KeyValueStore) -> Result<Vec<ChainNonces>, NonceError> {
        let prefix = StoreKey::new(PREFIX_NONCE).push("counter").prefix();
        Ok(scan_records::<ChainNonces>(store, &prefix)?.into_iter().map(|(_, v)| v).collect())
    }

    /// Stored pending window for a chain.
    pub fn get_pending_nonces(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<Option<PendingNonces>, NonceError> {
        Ok(get_record(store, &pending_key(chain_id))?)
    }

    /// Every stored pending window.
    pub fn list_pending_nonces(&self, store: &dyn KeyValueStore) -> Result<Vec<PendingNonces>, NonceError> {
        let prefix = StoreKey::new(PREFIX_NONCE).push("pending").prefix();
        Ok(scan_records::<PendingNonces>(store, &prefix)?.into_iter().map(|(_, v)| v).collect())
    }

    /// `[low, high)` for a chain; `[0, 0)` before the first allocation.
    pub fn pending_window(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<PendingNonces, NonceError> {
        Ok(self
            .get_pending_nonces(store, chain_id)?
            .unwrap_or_else(|| PendingNonces::empty(chain_id)))
    }

    /// How a nonce was resolved, if it was.
    pub fn get_resolution(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        nonce: u64,
    ) -> Result<Option<NonceResolution>, NonceError> {
        Ok(get_record(store, &resolved_key(chain_id, nonce))?)
    }

    /// Tracker for `(chain, nonce)`.
    pub fn get_tracker(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        nonce: u64,
    ) -> Result<Option<OutTxTracker>, NonceError> {
        Ok(get_record(store, &tracker_key(chain_id, nonce))?)
    }

    /// Trackers, for one chain or all, in `(chain, nonce)` order.
    pub fn list_trackers(
        &self,
        store: &dyn KeyValueStore,
        chain_id: Option<ChainId>,
    ) -> Result<Vec<OutTxTracker>, NonceError> {
        let key = StoreKey::new(PREFIX_NONCE).push("tracker");
        let prefix = match chain_id {
            Some(chain_id) => key.chain(chain_id).prefix(),
            None => key.prefix(),
        };
        Ok(scan_records::<OutTxTracker>(store, &prefix)?.into_iter().map(|(_, v)| v).collect())
    }

    /// Xmsg owning `(chain, nonce)`.
    pub fn get_nonce_to_xmsg(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        nonce: u64,
    ) -> Result<Option<Hash>, NonceError> {
        let entry: Option<NonceToXmsg> = get_record(store, &nonce_to_xmsg_key(chain_id, nonce))?;
        Ok(entry.map(|e| e.xmsg_index))
    }

    /// Every nonce-to-xmsg mapping for a chain, in nonce order.
    pub fn list_nonce_to_xmsg(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<Vec<NonceToXmsg>, NonceError> {
        let prefix = StoreKey::new(PREFIX_NONCE).push("xmsg").chain(chain_id).prefix();
        Ok(scan_records::<NonceToXmsg>(store, &prefix)?.into_iter().map(|(_, v)| v).collect())
    }

    // =========================================================================
    // ALLOCATION
    // =========================================================================

    /// Hand out the next nonce, honouring the pending cap.
    pub fn allocate_nonce(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<u64, NonceError> {
        self.allocate(store, chain_id, true)
    }

    /// Hand out the next nonce even when the window is full.
    ///
    /// Used for revert legs, which must not be parked behind new traffic.
    pub fn allocate_reserved_nonce(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<u64, NonceError> {
        self.allocate(store, chain_id, false)
    }

    /// True if an `allocate_nonce` call would currently fail with `WindowFull`.
    pub fn is_window_full(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<bool, NonceError> {
        let window = self.pending_window(store, chain_id)?;
        Ok(matches!(self.config.max_pending_per_chain, Some(max) if window.len() >= max))
    }

    fn allocate(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
        enforce_cap: bool,
    ) -> Result<u64, NonceError> {
        self.ensure_chain(chain_id)?;

        let mut counter = self.get_chain_nonces(store, chain_id)?.unwrap_or(ChainNonces {
            chain_id,
            nonce: 0,
        });
        let mut window = self.pending_window(store, chain_id)?;
        invariant_counter_matches(&counter, &window)?;

        if enforce_cap {
            if let Some(max) = self.config.max_pending_per_chain {
                if window.len() >= max {
                    return Err(NonceError::WindowFull {
                        chain_id,
                        pending: window.len(),
                        max,
                    });
                }
            }
        }

        let nonce = counter.nonce;
        counter.nonce += 1;
        window.nonce_high += 1;
        put_record(store, &counter_key(chain_id), &counter)?;
        put_record(store, &pending_key(chain_id), &window)?;

        metrics::record_nonce_allocated(&chain_id.to_string(), window.len());
        tracing::info!(
            "[cb-04] Nonce allocated: chain={} nonce={} window=[{}, {})",
            chain_id,
            nonce,
            window.nonce_low,
            window.nonce_high
        );
        Ok(nonce)
    }

    // =========================================================================
    // RESOLUTION
    // =========================================================================

    /// Record that `nonce` was mined as `tx_hash` and advance the window.
    ///
    /// Confirming again with the same hash is a no-op while the nonce is
    /// still inside the window. Confirmations may arrive out of order; the
    /// low end only moves over a contiguous run.
    pub fn confirm_nonce(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
        nonce: u64,
        tx_hash: Hash,
    ) -> Result<PendingNonces, NonceError> {
        match self.check_resolvable(store, chain_id, nonce)? {
            Some(NonceResolution::Confirmed(existing)) if existing == tx_hash => {
                return self.pending_window(store, chain_id);
            }
            Some(NonceResolution::Confirmed(existing)) => {
                return Err(NonceError::ConflictingConfirmation {
                    chain_id,
                    nonce,
                    existing: to_hex(&existing),
                });
            }
            Some(NonceResolution::Released) => {
                return Err(NonceError::NonceReleased { chain_id, nonce });
            }
            None => {}
        }

        if let Some(mut tracker) = self.get_tracker(store, chain_id, nonce)? {
            tracker.confirmed_hash = Some(tx_hash);
            put_record(store, &tracker_key(chain_id, nonce), &tracker)?;
        }
        self.resolve(store, chain_id, nonce, NonceResolution::Confirmed(tx_hash))
    }

    /// Give up `nonce` without a mined transaction and advance the window.
    ///
    /// Releasing twice is a no-op; releasing a confirmed nonce fails.
    pub fn release_nonce(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
        nonce: u64,
    ) -> Result<PendingNonces, NonceError> {
        match self.check_resolvable(store, chain_id, nonce)? {
            Some(NonceResolution::Released) => self.pending_window(store, chain_id),
            Some(NonceResolution::Confirmed(_)) => {
                Err(NonceError::NonceConfirmed { chain_id, nonce })
            }
            None => self.resolve(store, chain_id, nonce, NonceResolution::Released),
        }
    }

    /// Existing resolution for an allocated nonce.
    ///
    /// A nonce below the window is either already settled or was skipped by
    /// an admin reset; neither can be resolved again.
    fn check_resolvable(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        nonce: u64,
    ) -> Result<Option<NonceResolution>, NonceError> {
        self.ensure_chain(chain_id)?;
        let window = self.pending_window(store, chain_id)?;
        if nonce >= window.nonce_high {
            return Err(NonceError::NonceNotAllocated { chain_id, nonce });
        }
        let existing = self.get_resolution(store, chain_id, nonce)?;
        if existing.is_none() && nonce < window.nonce_low {
            return Err(NonceError::NonceNotPending { chain_id, nonce });
        }
        Ok(existing)
    }

    fn resolve(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
        nonce: u64,
        resolution: NonceResolution,
    ) -> Result<PendingNonces, NonceError> {
        put_record(store, &resolved_key(chain_id, nonce), &resolution)?;

        let mut window = self.pending_window(store, chain_id)?;
        let old_low = window.nonce_low;
        let advanced = advance_low(&mut window, |n| {
            Ok::<_, NonceError>(self.get_resolution(store, chain_id, n)?.is_some())
        })?;
        debug_assert!(invariant_window_ordered(&window));
        if advanced > 0 {
            put_record(store, &pending_key(chain_id), &window)?;
            self.prune_resolutions(store, chain_id, old_low, window.nonce_low)?;
        }

        metrics::record_nonce_resolved(&chain_id.to_string(), resolution.as_str(), window.len());
        tracing::info!(
            "[cb-04] Nonce {}: chain={} nonce={} window=[{}, {})",
            resolution.as_str(),
            chain_id,
            nonce,
            window.nonce_low,
            window.nonce_high
        );
        Ok(window)
    }

    /// Delete resolution records for nonces in `[from, to)`.
    ///
    /// Keys sort by nonce, so one scan of the chain's records finds them
    /// however wide the range is.
    fn prune_resolutions(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
        from: u64,
        to: u64,
    ) -> Result<usize, NonceError> {
        if from >= to {
            return Ok(0);
        }
        let prefix = StoreKey::new(PREFIX_NONCE).push("resolved").chain(chain_id).prefix();
        let (start, end) = (resolved_key(chain_id, from), resolved_key(chain_id, to));
        let stale: Vec<Vec<u8>> = store
            .prefix_scan(&prefix)?
            .into_iter()
            .map(|(key, _)| key)
            .filter(|key| *key >= start && *key < end)
            .collect();
        for key in &stale {
            delete_record(store, key)?;
        }
        tracing::debug!(
            "[cb-04] Resolutions pruned: chain={} range=[{}, {}) removed={}",
            chain_id,
            from,
            to,
            stale.len()
        );
        Ok(stale.len())
    }

    // =========================================================================
    // TRACKERS AND OWNERSHIP
    // =========================================================================

    /// Add a candidate outbound hash for an allocated nonce.
    ///
    /// A hash already present is only upgraded to proved. At most
    /// `max_tracker_hashes` distinct hashes are kept.
    pub fn add_tracker_hash(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
        nonce: u64,
        entry: TxHashEntry,
    ) -> Result<TrackerUpdate, NonceError> {
        self.ensure_chain(chain_id)?;
        let window = self.pending_window(store, chain_id)?;
        if nonce >= window.nonce_high {
            return Err(NonceError::NonceNotAllocated { chain_id, nonce });
        }

        let key = tracker_key(chain_id, nonce);
        let Some(mut tracker) = self.get_tracker(store, chain_id, nonce)? else {
            let mut tracker = OutTxTracker::new(chain_id, nonce);
            tracker.hash_list.push(entry);
            put_record(store, &key, &tracker)?;
            return Ok(TrackerUpdate::Created);
        };

        if let Some(i) = tracker.position(&entry.tx_hash) {
            if entry.proved && !tracker.hash_list[i].proved {
                tracker.hash_list[i].proved = true;
                put_record(store, &key, &tracker)?;
                return Ok(TrackerUpdate::MarkedProved);
            }
            return Ok(TrackerUpdate::Unchanged);
        }

        if tracker.hash_list.len() >= self.config.max_tracker_hashes {
            return Err(NonceError::TrackerFull {
                chain_id,
                nonce,
                max: self.config.max_tracker_hashes,
            });
        }
        tracker.hash_list.push(entry);
        put_record(store, &key, &tracker)?;
        Ok(TrackerUpdate::Added)
    }

    /// Drop the tracker for `(chain, nonce)`. Returns true if one existed.
    pub fn remove_tracker(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
        nonce: u64,
    ) -> Result<bool, NonceError> {
        let key = tracker_key(chain_id, nonce);
        if !store.exists(&key)? {
            return Ok(false);
        }
        delete_record(store, &key)?;
        tracing::debug!("[cb-04] Tracker removed: chain={} nonce={}", chain_id, nonce);
        Ok(true)
    }

    /// Record which xmsg owns `(chain, nonce)`.
    pub fn set_nonce_to_xmsg(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
        nonce: u64,
        xmsg_index: Hash,
    ) -> Result<(), NonceError> {
        let entry = NonceToXmsg {
            chain_id,
            nonce,
            xmsg_index,
        };
        Ok(put_record(store, &nonce_to_xmsg_key(chain_id, nonce), &entry)?)
    }

    // =========================================================================
    // ADMIN
    // =========================================================================

    /// Overwrite a chain's counter and window (Admin tier).
    ///
    /// The counter is set to `high` so the next allocation continues there.
    /// Both ends may only move forward: lowering `high` would hand out
    /// nonces already used on the destination chain, and lowering `low`
    /// would reopen settled nonces. Nonces skipped over by `low` lose their
    /// resolution records.
    pub fn reset_chain_nonces(
        &self,
        store: &mut dyn KeyValueStore,
        signer: &Address,
        chain_id: ChainId,
        low: u64,
        high: u64,
    ) -> Result<PendingNonces, NonceError> {
        self.ensure_authorized(signer, PolicyTier::Admin)?;
        self.ensure_chain(chain_id)?;
        if low > high {
            return Err(NonceError::InvalidWindow { low, high });
        }
        let current = self.pending_window(store, chain_id)?;
        if low < current.nonce_low || high < current.nonce_high {
            return Err(NonceError::WindowRegression {
                chain_id,
                low,
                high,
                current_low: current.nonce_low,
                current_high: current.nonce_high,
            });
        }

        let window = PendingNonces {
            chain_id,
            nonce_low: low,
            nonce_high: high,
        };
        put_record(store, &counter_key(chain_id), &ChainNonces { chain_id, nonce: high })?;
        put_record(store, &pending_key(chain_id), &window)?;
        self.prune_resolutions(store, chain_id, current.nonce_low, low)?;

        tracing::warn!(
            "[cb-04] Chain nonces reset: chain={} window=[{}, {}) by={}",
            chain_id,
            low,
            high,
            to_hex(signer)
        );
        Ok(window)
    }

    /// Seed counters, windows, trackers and ownership.
    pub fn import_genesis(
        &self,
        store: &mut dyn KeyValueStore,
        genesis: &NonceGenesis,
    ) -> Result<(), NonceError> {
        for counter in &genesis.chain_nonces {
            self.ensure_chain(counter.chain_id)?;
            let window = genesis
                .pending_nonces
                .iter()
                .find(|w| w.chain_id == counter.chain_id)
                .copied()
                .unwrap_or(PendingNonces {
                    chain_id: counter.chain_id,
                    nonce_low: counter.nonce,
                    nonce_high: counter.nonce,
                });
            if !invariant_window_ordered(&window) {
                return Err(NonceError::InvalidWindow {
                    low: window.nonce_low,
                    high: window.nonce_high,
                });
            }
            invariant_counter_matches(counter, &window)?;
            put_record(store, &counter_key(counter.chain_id), counter)?;
            put_record(store, &pending_key(counter.chain_id), &window)?;
        }
        for (chain_id, nonce, resolution) in &genesis.resolutions {
            put_record(store, &resolved_key(*chain_id, *nonce), resolution)?;
        }
        for tracker in &genesis.out_tx_trackers {
            put_record(store, &tracker_key(tracker.chain_id, tracker.nonce), tracker)?;
        }
        for entry in &genesis.nonce_to_xmsg {
            put_record(store, &nonce_to_xmsg_key(entry.chain_id, entry.nonce), entry)?;
        }
        Ok(())
    }
}
