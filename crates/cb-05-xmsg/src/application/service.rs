//! # Xmsg State Machine Service
//!
//! Turns finalized inbound and outbound ballots into xmsg transitions.
//!
//! Every transition that touches nonces runs inside a store overlay, so a
//! nonce is never left allocated without an owning xmsg and an xmsg never
//! reaches a pending-outbound status without holding a nonce.

use std::sync::Arc;

use cb_01_observer_registry::ObserverRegistry;
use cb_02_ballot_engine::{BallotEngine, BallotId, BallotStatus};
use cb_04_nonce_allocator::{NonceAllocator, TrackerUpdate, TxHashEntry};
use shared_types::{
    get_record, put_record, scan_records, to_hex, with_overlay, Address, BlockContext, ChainId,
    Hash, KeyValueStore, PolicyTier, StoreKey,
};

use crate::algorithms::{effective_window, WithdrawBudget};
use crate::config::XmsgConfig;
use crate::domain::{
    invariant_outbound_has_nonce, invariant_queued_unscheduled, FinalizedInbound, InTxTracker,
    InboundTxParams, InboundVote, OutboundTxParams, OutboundVote, PendingXmsgs, RateLimitedPending,
    RateLimiterFlags, ReceiveStatus, StatusRecord, TrackerOutcome, TrackerProof, Xmsg, XmsgError,
    XmsgGenesis, XmsgIndex, XmsgStatus, XmsgVoteOutcome,
};
use crate::metrics;
use crate::ports::InclusionProver;

const PREFIX_XMSG: &str = "xmsg";

fn xmsg_key(index: &XmsgIndex) -> Vec<u8> {
    StoreKey::new(PREFIX_XMSG).push("record").bytes(index.as_bytes()).build()
}

fn in_tx_key(in_tx_hash: &Hash, index: &XmsgIndex) -> Vec<u8> {
    StoreKey::new(PREFIX_XMSG)
        .push("intx")
        .bytes(in_tx_hash)
        .bytes(index.as_bytes())
        .build()
}

fn in_tx_prefix(in_tx_hash: &Hash) -> Vec<u8> {
    StoreKey::new(PREFIX_XMSG).push("intx").bytes(in_tx_hash).prefix()
}

fn finalized_key(chain_id: ChainId, in_tx_hash: &Hash, event_index: u64) -> Vec<u8> {
    StoreKey::new(PREFIX_XMSG)
        .push("finalized")
        .chain(chain_id)
        .bytes(in_tx_hash)
        .height(event_index)
        .build()
}

fn queue_key(chain_id: ChainId, seq: u64) -> Vec<u8> {
    StoreKey::new(PREFIX_XMSG).push("queue").chain(chain_id).height(seq).build()
}

fn queue_prefix(chain_id: ChainId) -> Vec<u8> {
    StoreKey::new(PREFIX_XMSG).push("queue").chain(chain_id).prefix()
}

fn queue_seq_key(chain_id: ChainId) -> Vec<u8> {
    StoreKey::new(PREFIX_XMSG).push("queueseq").chain(chain_id).build()
}

fn in_tx_tracker_key(chain_id: ChainId, tx_hash: &Hash) -> Vec<u8> {
    StoreKey::new(PREFIX_XMSG)
        .push("intracker")
        .chain(chain_id)
        .bytes(tx_hash)
        .build()
}

fn rate_limiter_key() -> Vec<u8> {
    StoreKey::new(PREFIX_XMSG).push("ratelimiter").build()
}

/// xmsg State Machine.
pub struct XmsgStateMachine {
    config: XmsgConfig,
    registry: Arc<ObserverRegistry>,
    ballots: Arc<BallotEngine>,
    nonces: Arc<NonceAllocator>,
    prover: Arc<dyn InclusionProver>,
}

impl XmsgStateMachine {
    /// Create a state machine over its sibling services.
    pub fn new(
        config: XmsgConfig,
        registry: Arc<ObserverRegistry>,
        ballots: Arc<BallotEngine>,
        nonces: Arc<NonceAllocator>,
        prover: Arc<dyn InclusionProver>,
    ) -> Self {
        Self {
            config,
            registry,
            ballots,
            nonces,
            prover,
        }
    }

    /// State machine configuration.
    pub fn config(&self) -> &XmsgConfig {
        &self.config
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Xmsg by index.
    pub fn get_xmsg(&self, store: &dyn KeyValueStore, index: &XmsgIndex) -> Result<Option<Xmsg>, XmsgError> {
        Ok(get_record(store, &xmsg_key(index))?)
    }

    /// Xmsg by index, or `XmsgNotFound`.
    pub fn require_xmsg(&self, store: &dyn KeyValueStore, index: &XmsgIndex) -> Result<Xmsg, XmsgError> {
        self.get_xmsg(store, index)?
            .ok_or_else(|| XmsgError::XmsgNotFound(index.to_string()))
    }

    /// Every xmsg, in index order.
    pub fn list_xmsgs(&self, store: &dyn KeyValueStore) -> Result<Vec<Xmsg>, XmsgError> {
        let prefix = StoreKey::new(PREFIX_XMSG).push("record").prefix();
        Ok(scan_records::<Xmsg>(store, &prefix)?.into_iter().map(|(_, v)| v).collect())
    }

    /// Xmsg that owns `(chain, nonce)`.
    pub fn xmsg_by_nonce(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        nonce: u64,
    ) -> Result<Option<Xmsg>, XmsgError> {
        match self.nonces.get_nonce_to_xmsg(store, chain_id, nonce)? {
            Some(index) => self.get_xmsg(store, &XmsgIndex(index)),
            None => Ok(None),
        }
    }

    /// Xmsgs created from events in one inbound transaction.
    pub fn xmsgs_by_in_tx_hash(
        &self,
        store: &dyn KeyValueStore,
        in_tx_hash: &Hash,
    ) -> Result<Vec<Xmsg>, XmsgError> {
        let prefix = in_tx_prefix(in_tx_hash);
        let mut xmsgs = Vec::new();
        for (key, _) in store.prefix_scan(&prefix)? {
            let tail = &key[prefix.len()..];
            let Some(index) = parse_index(tail) else {
                continue;
            };
            if let Some(xmsg) = self.get_xmsg(store, &index)? {
                xmsgs.push(xmsg);
            }
        }
        Ok(xmsgs)
    }

    /// Finalization marker for an inbound event.
    pub fn get_finalized_inbound(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        in_tx_hash: &Hash,
        event_index: u64,
    ) -> Result<Option<FinalizedInbound>, XmsgError> {
        Ok(get_record(store, &finalized_key(chain_id, in_tx_hash, event_index))?)
    }

    /// True if the inbound event already produced an xmsg.
    pub fn is_finalized_inbound(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        in_tx_hash: &Hash,
        event_index: u64,
    ) -> Result<bool, XmsgError> {
        Ok(store.exists(&finalized_key(chain_id, in_tx_hash, event_index))?)
    }

    /// Xmsgs parked for a nonce on `chain_id`, oldest first.
    pub fn awaiting_queue(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<Vec<XmsgIndex>, XmsgError> {
        Ok(self
            .queue_entries(store, chain_id)?
            .into_iter()
            .map(|(_, index)| index)
            .collect())
    }

    /// Pending xmsgs holding a nonce on `chain_id`, in nonce order.
    ///
    /// Walks the chain's pending window. Nonces confirmed out of order are
    /// skipped; `total_pending` is the window size.
    pub fn list_pending_xmsgs(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        limit: Option<u32>,
    ) -> Result<PendingXmsgs, XmsgError> {
        let limit = self.config.query_limit(limit);
        let window = self.nonces.pending_window(store, chain_id)?;
        let mut xmsgs = Vec::new();
        for nonce in window.nonce_low..window.nonce_high {
            if xmsgs.len() >= limit {
                break;
            }
            let xmsg = self
                .xmsg_by_nonce(store, chain_id, nonce)?
                .ok_or(XmsgError::NoXmsgForNonce { chain_id, nonce })?;
            if holds_pending_nonce(&xmsg, chain_id, nonce) {
                xmsgs.push(xmsg);
            }
        }
        Ok(PendingXmsgs {
            xmsgs,
            total_pending: window.len(),
        })
    }

    /// Pending xmsgs on every supported chain, throttled by the withdraw
    /// rate limiter.
    ///
    /// With the limiter off this is the concatenation of
    /// [`list_pending_xmsgs`](Self::list_pending_xmsgs) per chain. With one,
    /// every pending leg's amount is charged against the window budget;
    /// once the budget is exceeded no xmsgs are returned, only the totals.
    pub fn list_pending_within_rate_limit(
        &self,
        store: &dyn KeyValueStore,
        current_height: u64,
        limit: Option<u32>,
    ) -> Result<RateLimitedPending, XmsgError> {
        let limit = self.config.query_limit(limit);
        let flags = self.rate_limiter_flags(store)?;
        let mut chains = Vec::new();
        for chain in self.registry.chains().external_chains() {
            if self.registry.is_supported_chain(store, chain.id)? {
                chains.push(chain.id);
            }
        }

        let per_block = match flags.active_rate() {
            Some(rate) => rate,
            None => {
                let mut result = RateLimitedPending {
                    window_blocks: flags.window_blocks,
                    ..Default::default()
                };
                for chain_id in chains {
                    let remaining = limit.saturating_sub(result.xmsgs.len());
                    if remaining == 0 {
                        result.total_pending += self.nonces.pending_window(store, chain_id)?.len();
                        continue;
                    }
                    let pending = self.list_pending_xmsgs(store, chain_id, Some(remaining as u32))?;
                    result.total_pending += pending.total_pending;
                    result.xmsgs.extend(pending.xmsgs.into_iter().take(remaining));
                }
                return Ok(result);
            }
        };

        let mut windows = Vec::with_capacity(chains.len());
        let mut oldest: Option<u64> = None;
        for chain_id in chains {
            let window = self.nonces.pending_window(store, chain_id)?;
            if !window.is_empty() {
                if let Some(xmsg) = self.xmsg_by_nonce(store, chain_id, window.nonce_low)? {
                    let height = xmsg.inbound.finalized_height;
                    oldest = Some(oldest.map_or(height, |h| h.min(height)));
                }
            }
            windows.push((chain_id, window));
        }

        let window_blocks =
            effective_window(current_height, flags.window_blocks, oldest);
        let mut budget = WithdrawBudget::new(per_block, window_blocks);
        let mut exceeded = false;
        let mut total_pending = 0;
        let mut xmsgs = Vec::new();

        for (chain_id, window) in windows {
            total_pending += window.len();
            for nonce in window.nonce_low..window.nonce_high {
                let xmsg = self
                    .xmsg_by_nonce(store, chain_id, nonce)?
                    .ok_or(XmsgError::NoXmsgForNonce { chain_id, nonce })?;
                if !holds_pending_nonce(&xmsg, chain_id, nonce) {
                    continue;
                }
                let amount = xmsg.current_outbound().map(|leg| leg.amount).unwrap_or_default();
                if !budget.charge(amount) {
                    exceeded = true;
                    continue;
                }
                if xmsgs.len() < limit {
                    xmsgs.push(xmsg);
                }
            }
        }

        if exceeded {
            tracing::warn!(
                "[cb-05] Withdraw rate limit exceeded: spent={} limit={} window={}",
                budget.spent(),
                budget.limit(),
                window_blocks
            );
            xmsgs.clear();
        }
        xmsgs.sort_by_key(|x: &Xmsg| {
            let leg = x.current_outbound();
            (
                leg.map(|l| l.receiver_chain_id).unwrap_or_default(),
                leg.and_then(|l| l.nonce).unwrap_or_default(),
            )
        });

        Ok(RateLimitedPending {
            xmsgs,
            total_pending,
            window_blocks,
            window_amount: budget.spent(),
            rate_limit_exceeded: exceeded,
        })
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    /// Vote on an inbound event.
    ///
    /// When this vote finalizes the ballot as success, the xmsg is created
    /// and either scheduled with a nonce or parked in the chain's queue.
    /// An event finalizes at most once; a competing ballot for the same
    /// event is rejected.
    pub fn vote_inbound(
        &self,
        store: &mut dyn KeyValueStore,
        vote: &InboundVote,
        ctx: &BlockContext,
    ) -> Result<XmsgVoteOutcome, XmsgError> {
        if !self.registry.crosschain_flags(store)?.is_inbound_enabled {
            return Err(XmsgError::InboundDisabled);
        }
        if !self.registry.chains().is_external(vote.sender_chain_id) {
            return Err(XmsgError::InvalidSenderChain(vote.sender_chain_id));
        }
        self.registry.supported_chain_params(store, vote.sender_chain_id)?;
        if !self.is_home_chain(vote.receiver_chain_id) {
            self.registry.supported_chain_params(store, vote.receiver_chain_id)?;
        }

        let operator = self.registry.resolve_signer(store, &vote.signer)?.unwrap_or(vote.signer);
        let observation = vote.observation();
        let ballot_id = observation.ballot_id();

        if let Some(done) =
            self.get_finalized_inbound(store, vote.sender_chain_id, &vote.in_tx_hash, vote.event_index)?
        {
            if done.ballot_id != ballot_id {
                return Err(XmsgError::ObservedTxAlreadyFinalized {
                    chain_id: vote.sender_chain_id,
                    in_tx_hash: to_hex(&vote.in_tx_hash),
                    event_index: vote.event_index,
                });
            }
        }

        let outcome = self
            .ballots
            .vote_on_observation(store, &observation, &operator, vote.vote, ctx)?;

        let mut xmsg = None;
        if outcome.finalized_now {
            match outcome.status() {
                BallotStatus::FinalizedSuccess => {
                    xmsg = Some(with_overlay(store, |s| {
                        self.finalize_inbound(s, vote, ballot_id, ctx)
                    })?);
                }
                status => {
                    tracing::info!(
                        "[cb-05] Inbound rejected by ballot: chain={} tx={} event={} status={}",
                        vote.sender_chain_id,
                        to_hex(&vote.in_tx_hash),
                        vote.event_index,
                        status.as_str()
                    );
                }
            }
        }

        Ok(XmsgVoteOutcome {
            ballot_id,
            ballot_status: outcome.status(),
            ballot_created: outcome.created,
            xmsg,
        })
    }

    fn finalize_inbound(
        &self,
        store: &mut dyn KeyValueStore,
        vote: &InboundVote,
        ballot_id: BallotId,
        ctx: &BlockContext,
    ) -> Result<Xmsg, XmsgError> {
        let index = vote.xmsg_index();
        if self.get_xmsg(store, &index)?.is_some() {
            return Err(XmsgError::XmsgAlreadyExists(index.to_string()));
        }

        let marker = FinalizedInbound {
            chain_id: vote.sender_chain_id,
            in_tx_hash: vote.in_tx_hash,
            event_index: vote.event_index,
            ballot_id,
        };
        put_record(
            store,
            &finalized_key(marker.chain_id, &marker.in_tx_hash, marker.event_index),
            &marker,
        )?;

        let mut xmsg = Xmsg {
            index,
            message: vote.message.clone(),
            allow_revert: vote.allow_revert,
            status: StatusRecord {
                status: XmsgStatus::PendingInbound,
                message: "inbound finalized".into(),
                last_update_timestamp: ctx.timestamp,
            },
            inbound: InboundTxParams {
                sender_chain_id: vote.sender_chain_id,
                sender: vote.sender.clone(),
                in_tx_hash: vote.in_tx_hash,
                in_block_height: vote.in_block_height,
                event_index: vote.event_index,
                amount: vote.amount,
                ballot_id,
                finalized_height: ctx.height,
            },
            outbound: vec![OutboundTxParams::new(
                vote.receiver_chain_id,
                vote.receiver.clone(),
                vote.amount,
            )],
        };
        store.put(&in_tx_key(&vote.in_tx_hash, &index), &[])?;
        self.remove_in_tx_tracker(store, vote.sender_chain_id, &vote.in_tx_hash)?;
        metrics::record_xmsg_created();
        tracing::info!(
            "[cb-05] Xmsg created: index={} sender_chain={} receiver_chain={} amount={}",
            index,
            vote.sender_chain_id,
            vote.receiver_chain_id,
            vote.amount
        );

        if self.is_home_chain(vote.receiver_chain_id) {
            self.transition(
                &mut xmsg,
                XmsgStatus::Aborted,
                "receiver is the home chain; no executor available",
                ctx,
            )?;
        } else {
            self.schedule_or_park(store, &mut xmsg, ctx)?;
        }
        self.put_xmsg(store, &xmsg)?;
        Ok(xmsg)
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    /// Vote on the result of an outbound transaction.
    ///
    /// The vote must name the chain and nonce of the xmsg's current leg,
    /// unless the ballot already finalized (late votes are recorded for
    /// reward accounting only). Finalization confirms the nonce and moves
    /// the xmsg on: success mines the leg, failure reverts or aborts.
    pub fn vote_outbound(
        &self,
        store: &mut dyn KeyValueStore,
        vote: &OutboundVote,
        ctx: &BlockContext,
    ) -> Result<XmsgVoteOutcome, XmsgError> {
        self.registry.supported_chain_params(store, vote.receiver_chain_id)?;
        let operator = self.registry.resolve_signer(store, &vote.signer)?.unwrap_or(vote.signer);
        let xmsg = self.require_xmsg(store, &vote.xmsg_index)?;

        let observation = vote.observation();
        let ballot_id = observation.ballot_id();
        let already_final = self
            .ballots
            .get_ballot(store, &ballot_id)?
            .is_some_and(|ballot| ballot.is_finalized());
        if !already_final {
            check_outbound(&xmsg, vote)?;
        }

        let outcome = self.ballots.vote_on_observation(
            store,
            &observation,
            &operator,
            vote.status.as_vote(),
            ctx,
        )?;

        let mut touched = None;
        if outcome.finalized_now {
            let status = outcome.status();
            touched = Some(with_overlay(store, |s| {
                self.finalize_outbound(s, xmsg, vote, ballot_id, status, ctx)
            })?);
        }

        Ok(XmsgVoteOutcome {
            ballot_id,
            ballot_status: outcome.status(),
            ballot_created: outcome.created,
            xmsg: touched,
        })
    }

    fn finalize_outbound(
        &self,
        store: &mut dyn KeyValueStore,
        mut xmsg: Xmsg,
        vote: &OutboundVote,
        ballot_id: BallotId,
        status: BallotStatus,
        ctx: &BlockContext,
    ) -> Result<Xmsg, XmsgError> {
        let nonce = invariant_outbound_has_nonce(&xmsg)?;
        let chain_id = vote.receiver_chain_id;
        let received = if status == BallotStatus::FinalizedSuccess {
            ReceiveStatus::Success
        } else {
            ReceiveStatus::Failed
        };

        if let Some(leg) = xmsg.current_outbound_mut() {
            leg.ballot_id = Some(ballot_id);
            leg.observed_tx_hash = Some(vote.observed_tx_hash);
            leg.observed_block_height = vote.observed_block_height;
            leg.receive_status = Some(received);
        }

        // A failed transaction still consumed the nonce on chain.
        self.nonces.confirm_nonce(store, chain_id, nonce, vote.observed_tx_hash)?;
        self.nonces.remove_tracker(store, chain_id, nonce)?;

        match (xmsg.status(), received) {
            (XmsgStatus::PendingOutbound, ReceiveStatus::Success) => {
                self.transition(&mut xmsg, XmsgStatus::OutboundMined, "outbound mined", ctx)?;
            }
            (XmsgStatus::PendingRevert, ReceiveStatus::Success) => {
                self.transition(&mut xmsg, XmsgStatus::Reverted, "revert mined", ctx)?;
            }
            (XmsgStatus::PendingOutbound, ReceiveStatus::Failed) if xmsg.allow_revert => {
                self.start_revert(store, &mut xmsg, ctx)?;
            }
            (XmsgStatus::PendingOutbound, ReceiveStatus::Failed) => {
                self.transition(
                    &mut xmsg,
                    XmsgStatus::Aborted,
                    "outbound failed; revert not allowed",
                    ctx,
                )?;
            }
            (XmsgStatus::PendingRevert, ReceiveStatus::Failed) => {
                self.transition(&mut xmsg, XmsgStatus::Aborted, "revert failed", ctx)?;
            }
            (other, _) => {
                return Err(XmsgError::OutboundNotExpected {
                    index: xmsg.index.to_string(),
                    status: other.as_str(),
                });
            }
        }
        self.put_xmsg(store, &xmsg)?;

        self.drain_queue(store, chain_id, ctx)?;
        Ok(xmsg)
    }

    /// Append a revert leg back to the sender and reserve its nonce.
    fn start_revert(
        &self,
        store: &mut dyn KeyValueStore,
        xmsg: &mut Xmsg,
        ctx: &BlockContext,
    ) -> Result<(), XmsgError> {
        let sender_chain = xmsg.inbound.sender_chain_id;
        if !self.registry.is_supported_chain(store, sender_chain)? {
            return self.transition(
                xmsg,
                XmsgStatus::Aborted,
                format!("outbound failed; sender chain {} not supported for revert", sender_chain),
                ctx,
            );
        }

        let tss = self.registry.require_tss(store)?;
        let amount = xmsg.current_outbound().map(|leg| leg.amount).unwrap_or(xmsg.inbound.amount);
        let nonce = self.nonces.allocate_reserved_nonce(store, sender_chain)?;
        self.nonces.set_nonce_to_xmsg(store, sender_chain, nonce, xmsg.index.0)?;

        let mut leg = OutboundTxParams::new(sender_chain, xmsg.inbound.sender.clone(), amount);
        leg.nonce = Some(nonce);
        leg.tss_pubkey = tss.pubkey;
        xmsg.outbound.push(leg);

        self.transition(
            xmsg,
            XmsgStatus::PendingRevert,
            format!("outbound failed; revert nonce {} on chain {}", nonce, sender_chain),
            ctx,
        )?;
        invariant_outbound_has_nonce(xmsg)?;
        Ok(())
    }

    // =========================================================================
    // OUT-TX TRACKER
    // =========================================================================

    /// Report a candidate outbound hash for `(chain, nonce)`.
    ///
    /// Observers and the Emergency tier may report without a proof; anyone
    /// else must attach a light-client inclusion proof of the hash. A
    /// supplied proof is always checked. If the owning xmsg is no longer
    /// pending, its tracker is dropped instead.
    pub fn add_to_out_tx_tracker(
        &self,
        store: &mut dyn KeyValueStore,
        signer: &Address,
        chain_id: ChainId,
        nonce: u64,
        tx_hash: Hash,
        proof: Option<&TrackerProof>,
    ) -> Result<TrackerOutcome, XmsgError> {
        self.registry.supported_chain_params(store, chain_id)?;
        let xmsg = self
            .xmsg_by_nonce(store, chain_id, nonce)?
            .ok_or(XmsgError::NoXmsgForNonce { chain_id, nonce })?;

        if xmsg.status().is_terminal() {
            self.nonces.remove_tracker(store, chain_id, nonce)?;
            tracing::info!(
                "[cb-05] Tracker dropped for finished xmsg: index={} chain={} nonce={}",
                xmsg.index,
                chain_id,
                nonce
            );
            return Ok(TrackerOutcome::Removed);
        }

        let operator = self.registry.resolve_signer(store, signer)?.unwrap_or(*signer);
        let trusted = self.registry.is_authorized(signer, PolicyTier::Emergency)
            || self.registry.is_non_tombstoned_observer(store, &operator)?;

        let proved = match proof {
            Some(proof) => {
                if !self.prover.prove(store, chain_id, proof, &tx_hash)? {
                    return Err(XmsgError::ProofVerificationFailed(to_hex(&tx_hash)));
                }
                true
            }
            None if trusted => false,
            None => return Err(XmsgError::ProofRequired(to_hex(signer))),
        };

        let update = self.nonces.add_tracker_hash(
            store,
            chain_id,
            nonce,
            TxHashEntry {
                tx_hash,
                signer: *signer,
                proved,
            },
        )?;
        tracing::debug!(
            "[cb-05] Tracker updated: chain={} nonce={} hash={} proved={} update={:?}",
            chain_id,
            nonce,
            to_hex(&tx_hash),
            proved,
            update
        );
        Ok(TrackerOutcome::Updated(update))
    }

    // =========================================================================
    // IN-TX TRACKER
    // =========================================================================

    /// Inbound tracker for `(chain, tx_hash)`.
    pub fn get_in_tx_tracker(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
        tx_hash: &Hash,
    ) -> Result<Option<InTxTracker>, XmsgError> {
        Ok(get_record(store, &in_tx_tracker_key(chain_id, tx_hash))?)
    }

    /// Inbound trackers, for one chain or all, in `(chain, hash)` order.
    pub fn list_in_tx_trackers(
        &self,
        store: &dyn KeyValueStore,
        chain_id: Option<ChainId>,
    ) -> Result<Vec<InTxTracker>, XmsgError> {
        let key = StoreKey::new(PREFIX_XMSG).push("intracker");
        let prefix = match chain_id {
            Some(chain_id) => key.chain(chain_id).prefix(),
            None => key.prefix(),
        };
        Ok(scan_records::<InTxTracker>(store, &prefix)?.into_iter().map(|(_, v)| v).collect())
    }

    /// Report an inbound transaction observers may have missed.
    ///
    /// Same trust rule as the out-tx tracker: observers and the Emergency
    /// tier report freely, anyone else must prove the hash is in a stored
    /// header of `chain_id`. The tracker lives until an inbound event from
    /// the transaction finalizes.
    pub fn add_to_in_tx_tracker(
        &self,
        store: &mut dyn KeyValueStore,
        signer: &Address,
        chain_id: ChainId,
        tx_hash: Hash,
        proof: Option<&TrackerProof>,
    ) -> Result<TrackerUpdate, XmsgError> {
        if !self.registry.chains().is_external(chain_id) {
            return Err(XmsgError::InvalidSenderChain(chain_id));
        }
        self.registry.supported_chain_params(store, chain_id)?;

        let operator = self.registry.resolve_signer(store, signer)?.unwrap_or(*signer);
        let trusted = self.registry.is_authorized(signer, PolicyTier::Emergency)
            || self.registry.is_non_tombstoned_observer(store, &operator)?;
        let proved = match proof {
            Some(proof) => {
                if !self.prover.prove(store, chain_id, proof, &tx_hash)? {
                    return Err(XmsgError::ProofVerificationFailed(to_hex(&tx_hash)));
                }
                true
            }
            None if trusted => false,
            None => return Err(XmsgError::ProofRequired(to_hex(signer))),
        };

        let key = in_tx_tracker_key(chain_id, &tx_hash);
        let update = match self.get_in_tx_tracker(store, chain_id, &tx_hash)? {
            None => {
                let tracker = InTxTracker {
                    chain_id,
                    tx_hash,
                    signer: *signer,
                    proved,
                };
                put_record(store, &key, &tracker)?;
                TrackerUpdate::Created
            }
            Some(mut tracker) if proved && !tracker.proved => {
                tracker.proved = true;
                put_record(store, &key, &tracker)?;
                TrackerUpdate::MarkedProved
            }
            Some(_) => TrackerUpdate::Unchanged,
        };
        tracing::debug!(
            "[cb-05] In-tx tracker updated: chain={} hash={} proved={} update={:?}",
            chain_id,
            to_hex(&tx_hash),
            proved,
            update
        );
        Ok(update)
    }

    fn remove_in_tx_tracker(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
        tx_hash: &Hash,
    ) -> Result<bool, XmsgError> {
        let key = in_tx_tracker_key(chain_id, tx_hash);
        if !store.exists(&key)? {
            return Ok(false);
        }
        store.delete(&key)?;
        tracing::debug!(
            "[cb-05] In-tx tracker removed: chain={} hash={}",
            chain_id,
            to_hex(tx_hash)
        );
        Ok(true)
    }

    // =========================================================================
    // RATE LIMITER
    // =========================================================================

    /// Current rate limiter settings; the configured defaults until the
    /// first update.
    pub fn rate_limiter_flags(&self, store: &dyn KeyValueStore) -> Result<RateLimiterFlags, XmsgError> {
        Ok(get_record(store, &rate_limiter_key())?.unwrap_or_else(|| RateLimiterFlags {
            enabled: self.config.rate_limit_per_block.is_some(),
            window_blocks: self.config.rate_limit_window_blocks,
            rate_per_block: self.config.rate_limit_per_block.unwrap_or_default(),
        }))
    }

    /// Replace the rate limiter settings (`Operational`). Returns the
    /// previous settings.
    pub fn update_rate_limiter_flags(
        &self,
        store: &mut dyn KeyValueStore,
        signer: &Address,
        flags: RateLimiterFlags,
    ) -> Result<RateLimiterFlags, XmsgError> {
        self.registry.ensure_authorized(signer, PolicyTier::Operational)?;
        validate_rate_limiter_flags(&flags)?;

        let previous = self.rate_limiter_flags(store)?;
        put_record(store, &rate_limiter_key(), &flags)?;
        tracing::info!(
            "[cb-05] Rate limiter updated: enabled={} window={} rate={} by={}",
            flags.enabled,
            flags.window_blocks,
            flags.rate_per_block,
            to_hex(signer)
        );
        Ok(previous)
    }

    // =========================================================================
    // ADMIN
    // =========================================================================

    /// Abort a pending xmsg and give back its nonce. Requires `Emergency`.
    pub fn abort_stuck_xmsg(
        &self,
        store: &mut dyn KeyValueStore,
        signer: &Address,
        index: &XmsgIndex,
        ctx: &BlockContext,
    ) -> Result<Xmsg, XmsgError> {
        self.registry.ensure_authorized(signer, PolicyTier::Emergency)?;

        with_overlay(store, |s| {
            let mut xmsg = self.require_xmsg(s, index)?;
            if xmsg.status().is_terminal() {
                return Err(XmsgError::XmsgNotPending {
                    index: index.to_string(),
                    status: xmsg.status().as_str(),
                });
            }

            let (chain_id, nonce) = match xmsg.current_outbound() {
                Some(leg) => (leg.receiver_chain_id, leg.nonce),
                None => return Err(XmsgError::MissingNonce(index.to_string())),
            };
            match nonce {
                Some(nonce) => {
                    self.nonces.release_nonce(s, chain_id, nonce)?;
                    self.nonces.remove_tracker(s, chain_id, nonce)?;
                }
                None => {
                    self.dequeue(s, chain_id, index)?;
                }
            }

            self.transition(&mut xmsg, XmsgStatus::Aborted, "aborted by emergency authority", ctx)?;
            self.put_xmsg(s, &xmsg)?;
            tracing::warn!("[cb-05] Xmsg aborted: index={} signer={}", index, to_hex(signer));

            self.drain_queue(s, chain_id, ctx)?;
            Ok(xmsg)
        })
    }

    // =========================================================================
    // NONCE QUEUE
    // =========================================================================

    /// Schedule parked xmsgs for `chain_id` while the chain accepts them.
    ///
    /// Returns how many were scheduled.
    pub fn drain_awaiting(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
        ctx: &BlockContext,
    ) -> Result<usize, XmsgError> {
        with_overlay(store, |s| self.drain_queue(s, chain_id, ctx))
    }

    /// [`drain_awaiting`](Self::drain_awaiting) for every external chain.
    pub fn drain_all_awaiting(
        &self,
        store: &mut dyn KeyValueStore,
        ctx: &BlockContext,
    ) -> Result<usize, XmsgError> {
        let chains: Vec<ChainId> = self.registry.chains().external_chains().map(|c| c.id).collect();
        with_overlay(store, |s| {
            let mut scheduled = 0;
            for chain_id in chains {
                scheduled += self.drain_queue(s, chain_id, ctx)?;
            }
            Ok(scheduled)
        })
    }

    fn drain_queue(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
        ctx: &BlockContext,
    ) -> Result<usize, XmsgError> {
        let mut scheduled = 0;
        for (key, index) in self.queue_entries(store, chain_id)? {
            if self.blocked_reason(store, chain_id)?.is_some() {
                break;
            }
            store.delete(&key)?;
            let mut xmsg = self.require_xmsg(store, &index)?;
            if xmsg.status() != XmsgStatus::PendingInbound {
                continue;
            }
            debug_assert!(invariant_queued_unscheduled(&xmsg));
            self.schedule(store, &mut xmsg, ctx)?;
            self.put_xmsg(store, &xmsg)?;
            scheduled += 1;
        }
        if scheduled > 0 {
            tracing::info!("[cb-05] Drained nonce queue: chain={} scheduled={}", chain_id, scheduled);
        }
        Ok(scheduled)
    }

    /// Why new outbound legs on `chain_id` cannot get a nonce right now.
    fn blocked_reason(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<Option<&'static str>, XmsgError> {
        if !self.registry.crosschain_flags(store)?.is_outbound_enabled {
            return Ok(Some("outbound disabled"));
        }
        if self.registry.get_tss(store)?.is_none() {
            return Ok(Some("no TSS"));
        }
        if self.nonces.is_window_full(store, chain_id)? {
            return Ok(Some("pending window full"));
        }
        Ok(None)
    }

    fn schedule_or_park(
        &self,
        store: &mut dyn KeyValueStore,
        xmsg: &mut Xmsg,
        ctx: &BlockContext,
    ) -> Result<(), XmsgError> {
        let chain_id = xmsg
            .current_outbound()
            .map(|leg| leg.receiver_chain_id)
            .ok_or_else(|| XmsgError::MissingNonce(xmsg.index.to_string()))?;

        // Parked xmsgs go first.
        let reason = match self.blocked_reason(store, chain_id)? {
            Some(reason) => Some(reason),
            None if !self.queue_entries(store, chain_id)?.is_empty() => Some("queue not empty"),
            None => None,
        };
        match reason {
            Some(reason) => {
                self.enqueue(store, chain_id, &xmsg.index)?;
                tracing::info!(
                    "[cb-05] Xmsg parked: index={} chain={} reason={}",
                    xmsg.index,
                    chain_id,
                    reason
                );
                Ok(())
            }
            None => self.schedule(store, xmsg, ctx),
        }
    }

    /// Reserve a nonce for the primary leg and move to `PendingOutbound`.
    fn schedule(
        &self,
        store: &mut dyn KeyValueStore,
        xmsg: &mut Xmsg,
        ctx: &BlockContext,
    ) -> Result<(), XmsgError> {
        let tss = self.registry.require_tss(store)?;
        let chain_id = xmsg
            .current_outbound()
            .map(|leg| leg.receiver_chain_id)
            .ok_or_else(|| XmsgError::MissingNonce(xmsg.index.to_string()))?;

        let nonce = self.nonces.allocate_nonce(store, chain_id)?;
        self.nonces.set_nonce_to_xmsg(store, chain_id, nonce, xmsg.index.0)?;
        if let Some(leg) = xmsg.current_outbound_mut() {
            leg.nonce = Some(nonce);
            leg.tss_pubkey = tss.pubkey;
        }

        self.transition(
            xmsg,
            XmsgStatus::PendingOutbound,
            format!("nonce {} reserved on chain {}", nonce, chain_id),
            ctx,
        )?;
        invariant_outbound_has_nonce(xmsg)?;
        Ok(())
    }

    fn enqueue(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
        index: &XmsgIndex,
    ) -> Result<(), XmsgError> {
        let seq: u64 = get_record(store, &queue_seq_key(chain_id))?.unwrap_or(0);
        put_record(store, &queue_key(chain_id, seq), index)?;
        put_record(store, &queue_seq_key(chain_id), &(seq + 1))?;
        metrics::record_queued(&chain_id.to_string());
        Ok(())
    }

    fn dequeue(
        &self,
        store: &mut dyn KeyValueStore,
        chain_id: ChainId,
        index: &XmsgIndex,
    ) -> Result<bool, XmsgError> {
        for (key, queued) in self.queue_entries(store, chain_id)? {
            if queued == *index {
                store.delete(&key)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn queue_entries(
        &self,
        store: &dyn KeyValueStore,
        chain_id: ChainId,
    ) -> Result<Vec<(Vec<u8>, XmsgIndex)>, XmsgError> {
        Ok(scan_records::<XmsgIndex>(store, &queue_prefix(chain_id))?)
    }

    // =========================================================================
    // GENESIS
    // =========================================================================

    /// Seed xmsgs, finalized inbound markers, nonce queues, inbound
    /// trackers and rate limiter settings.
    pub fn import_genesis(
        &self,
        store: &mut dyn KeyValueStore,
        genesis: &XmsgGenesis,
    ) -> Result<(), XmsgError> {
        for xmsg in &genesis.xmsgs {
            self.put_xmsg(store, xmsg)?;
            store.put(&in_tx_key(&xmsg.inbound.in_tx_hash, &xmsg.index), &[])?;
        }
        for marker in &genesis.finalized_inbounds {
            put_record(
                store,
                &finalized_key(marker.chain_id, &marker.in_tx_hash, marker.event_index),
                marker,
            )?;
        }
        for (chain_id, index) in &genesis.awaiting {
            self.enqueue(store, *chain_id, index)?;
        }
        for tracker in &genesis.in_tx_trackers {
            put_record(store, &in_tx_tracker_key(tracker.chain_id, &tracker.tx_hash), tracker)?;
        }
        if let Some(flags) = &genesis.rate_limiter_flags {
            validate_rate_limiter_flags(flags)?;
            put_record(store, &rate_limiter_key(), flags)?;
        }
        Ok(())
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn is_home_chain(&self, chain_id: ChainId) -> bool {
        self.registry.chains().home_chain().is_some_and(|home| home.id == chain_id)
    }

    fn put_xmsg(&self, store: &mut dyn KeyValueStore, xmsg: &Xmsg) -> Result<(), XmsgError> {
        Ok(put_record(store, &xmsg_key(&xmsg.index), xmsg)?)
    }

    fn transition(
        &self,
        xmsg: &mut Xmsg,
        to: XmsgStatus,
        message: impl Into<String>,
        ctx: &BlockContext,
    ) -> Result<(), XmsgError> {
        let from = xmsg.status();
        xmsg.transition(to, message, ctx.timestamp)?;
        metrics::record_transition(to.as_str());
        tracing::info!(
            "[cb-05] Xmsg transition: index={} {} -> {} ({})",
            xmsg.index,
            from.as_str(),
            to.as_str(),
            xmsg.status.message
        );
        Ok(())
    }
}

/// An enabled limiter needs a window to slide over.
fn validate_rate_limiter_flags(flags: &RateLimiterFlags) -> Result<(), XmsgError> {
    if flags.enabled && flags.window_blocks == 0 {
        return Err(XmsgError::InvalidRateLimiterFlags(
            "enabled limiter with a zero-block window".into(),
        ));
    }
    Ok(())
}

/// The vote must match the current leg of an xmsg awaiting an outbound.
fn check_outbound(xmsg: &Xmsg, vote: &OutboundVote) -> Result<(), XmsgError> {
    if !xmsg.status().awaits_outbound() {
        return Err(XmsgError::OutboundNotExpected {
            index: xmsg.index.to_string(),
            status: xmsg.status().as_str(),
        });
    }
    let nonce = invariant_outbound_has_nonce(xmsg)?;
    let chain = xmsg
        .current_outbound()
        .map(|leg| leg.receiver_chain_id)
        .unwrap_or_default();
    if chain != vote.receiver_chain_id || nonce != vote.nonce {
        return Err(XmsgError::OutboundMismatch {
            index: xmsg.index.to_string(),
            expected_chain: chain,
            expected_nonce: nonce,
            chain_id: vote.receiver_chain_id,
            nonce: vote.nonce,
        });
    }
    Ok(())
}

/// True if `xmsg` is pending and its current leg holds `(chain, nonce)`.
fn holds_pending_nonce(xmsg: &Xmsg, chain_id: ChainId, nonce: u64) -> bool {
    xmsg.status().awaits_outbound()
        && xmsg
            .current_outbound()
            .is_some_and(|leg| leg.receiver_chain_id == chain_id && leg.nonce == Some(nonce))
}

fn parse_index(hex_str: &[u8]) -> Option<XmsgIndex> {
    let bytes = hex::decode(hex_str).ok()?;
    let hash: Hash = bytes.try_into().ok()?;
    Some(XmsgIndex(hash))
}
