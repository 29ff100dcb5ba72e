//! # Bridge Messages
//!
//! Every state-changing entry point of the core, as delivered by the host.
//! The host has already verified the signature over each message; `signer`
//! is the verified submitting address.

use cb_01_observer_registry::{ChainParams, CrosschainFlags, Observer, TssRecord};
use cb_03_light_client::{HeaderData, HeaderVoteOutcome, VerificationFlags};
use cb_04_nonce_allocator::{PendingNonces, TrackerUpdate};
use cb_05_xmsg::{
    InboundVote, OutboundVote, RateLimiterFlags, TrackerOutcome, TrackerProof, Xmsg, XmsgIndex,
    XmsgVoteOutcome,
};
use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, Hash};

/// A signed transaction payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeMsg {
    /// Admin: add an observer.
    AddObserver {
        /// Submitter
        signer: Address,
        /// Operator address
        operator: Address,
        /// Hot key that submits votes
        grantee: Address,
    },
    /// Admin: remove an observer.
    RemoveObserver {
        /// Submitter
        signer: Address,
        /// Operator address
        operator: Address,
    },
    /// Operator or Admin: rotate an observer's grantee.
    UpdateObserverGrantee {
        /// Submitter
        signer: Address,
        /// Operator address
        operator: Address,
        /// New grantee
        grantee: Address,
    },
    /// Admin: install a new TSS key.
    SetTss {
        /// Submitter
        signer: Address,
        /// New key record
        tss: TssRecord,
    },
    /// Admin: add or change a chain's observation parameters.
    UpsertChainParams {
        /// Submitter
        signer: Address,
        /// New parameters
        params: ChainParams,
    },
    /// Emergency (disable) or Operational (enable): crosschain switches.
    UpdateCrosschainFlags {
        /// Submitter
        signer: Address,
        /// New switches
        flags: CrosschainFlags,
    },
    /// Emergency (disable) or Operational (enable): proof verification.
    UpdateVerificationFlags {
        /// Submitter
        signer: Address,
        /// New switches
        flags: VerificationFlags,
    },
    /// Observer: vote on an external block header.
    VoteBlockHeader {
        /// Submitter
        signer: Address,
        /// External chain
        chain_id: ChainId,
        /// Claimed header hash
        block_hash: Hash,
        /// Claimed height
        height: u64,
        /// Encoded header
        header: HeaderData,
    },
    /// Observer: vote on an inbound event.
    VoteInbound(InboundVote),
    /// Observer: vote on an outbound result.
    VoteOutbound(OutboundVote),
    /// Observer, Emergency or anyone with a proof: report an outbound hash.
    AddToOutTxTracker {
        /// Submitter
        signer: Address,
        /// Destination chain
        chain_id: ChainId,
        /// Leg nonce
        nonce: u64,
        /// Candidate outbound hash
        tx_hash: Hash,
        /// Inclusion proof, required from non-observers
        proof: Option<TrackerProof>,
    },
    /// Observer, Emergency or anyone with a proof: report a missed inbound
    /// transaction.
    AddToInTxTracker {
        /// Submitter
        signer: Address,
        /// Sender chain
        chain_id: ChainId,
        /// Inbound transaction hash
        tx_hash: Hash,
        /// Inclusion proof, required from non-observers
        proof: Option<TrackerProof>,
    },
    /// Operational: replace the withdraw rate limiter settings.
    UpdateRateLimiterFlags {
        /// Submitter
        signer: Address,
        /// New settings
        flags: RateLimiterFlags,
    },
    /// Emergency: abort a stuck xmsg.
    AbortStuckXmsg {
        /// Submitter
        signer: Address,
        /// Xmsg to abort
        index: XmsgIndex,
    },
    /// Admin: overwrite a chain's pending window.
    ResetChainNonces {
        /// Submitter
        signer: Address,
        /// Destination chain
        chain_id: ChainId,
        /// New low
        low: u64,
        /// New high
        high: u64,
    },
}

impl BridgeMsg {
    /// Verified submitting address.
    pub fn signer(&self) -> &Address {
        match self {
            BridgeMsg::AddObserver { signer, .. }
            | BridgeMsg::RemoveObserver { signer, .. }
            | BridgeMsg::UpdateObserverGrantee { signer, .. }
            | BridgeMsg::SetTss { signer, .. }
            | BridgeMsg::UpsertChainParams { signer, .. }
            | BridgeMsg::UpdateCrosschainFlags { signer, .. }
            | BridgeMsg::UpdateVerificationFlags { signer, .. }
            | BridgeMsg::VoteBlockHeader { signer, .. }
            | BridgeMsg::AddToOutTxTracker { signer, .. }
            | BridgeMsg::AddToInTxTracker { signer, .. }
            | BridgeMsg::UpdateRateLimiterFlags { signer, .. }
            | BridgeMsg::AbortStuckXmsg { signer, .. }
            | BridgeMsg::ResetChainNonces { signer, .. } => signer,
            BridgeMsg::VoteInbound(vote) => &vote.signer,
            BridgeMsg::VoteOutbound(vote) => &vote.signer,
        }
    }

    /// Message type label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeMsg::AddObserver { .. } => "add_observer",
            BridgeMsg::RemoveObserver { .. } => "remove_observer",
            BridgeMsg::UpdateObserverGrantee { .. } => "update_observer_grantee",
            BridgeMsg::SetTss { .. } => "set_tss",
            BridgeMsg::UpsertChainParams { .. } => "upsert_chain_params",
            BridgeMsg::UpdateCrosschainFlags { .. } => "update_crosschain_flags",
            BridgeMsg::UpdateVerificationFlags { .. } => "update_verification_flags",
            BridgeMsg::VoteBlockHeader { .. } => "vote_block_header",
            BridgeMsg::VoteInbound(_) => "vote_inbound",
            BridgeMsg::VoteOutbound(_) => "vote_outbound",
            BridgeMsg::AddToOutTxTracker { .. } => "add_to_out_tx_tracker",
            BridgeMsg::AddToInTxTracker { .. } => "add_to_in_tx_tracker",
            BridgeMsg::UpdateRateLimiterFlags { .. } => "update_rate_limiter_flags",
            BridgeMsg::AbortStuckXmsg { .. } => "abort_stuck_xmsg",
            BridgeMsg::ResetChainNonces { .. } => "reset_chain_nonces",
        }
    }
}

/// Result of a delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsgResponse {
    /// Observer after the change.
    Observer(Observer),
    /// Change applied; `scheduled` parked xmsgs got a nonce as a result.
    Applied {
        /// Xmsgs drained from the nonce queues
        scheduled: usize,
    },
    /// Crosschain switches before the change.
    CrosschainFlags {
        /// Previous switches
        previous: CrosschainFlags,
        /// Xmsgs drained from the nonce queues
        scheduled: usize,
    },
    /// Verification switches before the change.
    VerificationFlags(VerificationFlags),
    /// Header vote result.
    HeaderVote(HeaderVoteOutcome),
    /// Inbound or outbound vote result.
    XmsgVote(XmsgVoteOutcome),
    /// Tracker change.
    Tracker(TrackerOutcome),
    /// Inbound tracker change.
    InTxTracker(TrackerUpdate),
    /// Rate limiter settings before the change.
    RateLimiterFlags(RateLimiterFlags),
    /// Aborted xmsg.
    Aborted(Xmsg),
    /// Pending window after a reset.
    NonceWindow {
        /// New window
        window: PendingNonces,
        /// Xmsgs drained from the nonce queue
        scheduled: usize,
    },
}
