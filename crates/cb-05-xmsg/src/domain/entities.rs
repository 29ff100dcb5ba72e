//! # Domain Entities
//!
//! The xmsg record, its status machine and its inbound/outbound legs.

use cb_02_ballot_engine::{BallotId, BallotStatus};
use cb_04_nonce_allocator::TrackerUpdate;
use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, Hash, U256};

use super::errors::XmsgError;
use super::value_objects::{ReceiveStatus, XmsgIndex};

/// Lifecycle of a cross-chain message.
///
/// ```text
/// PendingInbound ──► PendingOutbound ──► OutboundMined
///       │                  │
///       │                  ├──► PendingRevert ──► Reverted
///       │                  │          │
///       └──────────────────┴──────────┴──► Aborted
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XmsgStatus {
    /// Inbound finalized; waiting for a nonce on the destination chain.
    #[default]
    PendingInbound,
    /// Primary outbound leg holds a nonce and awaits observation.
    PendingOutbound,
    /// Revert leg holds a nonce on the sender chain and awaits observation.
    PendingRevert,
    /// Primary outbound leg mined successfully.
    OutboundMined,
    /// Revert leg mined successfully.
    Reverted,
    /// Given up.
    Aborted,
}

impl XmsgStatus {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: XmsgStatus) -> bool {
        match (self, next) {
            (Self::PendingInbound, Self::PendingOutbound) => true,
            (Self::PendingInbound, Self::Aborted) => true, // Unroutable or stuck
            (Self::PendingOutbound, Self::OutboundMined) => true,
            (Self::PendingOutbound, Self::PendingRevert) => true,
            (Self::PendingOutbound, Self::Aborted) => true,
            (Self::PendingRevert, Self::Reverted) => true,
            (Self::PendingRevert, Self::Aborted) => true,
            _ => false,
        }
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::OutboundMined | Self::Reverted | Self::Aborted)
    }

    /// Check if still in flight.
    pub fn is_pending(&self) -> bool {
        !self.is_terminal()
    }

    /// True if a leg is out and waiting for an outbound ballot.
    pub fn awaits_outbound(&self) -> bool {
        matches!(self, Self::PendingOutbound | Self::PendingRevert)
    }

    /// Label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingInbound => "pending_inbound",
            Self::PendingOutbound => "pending_outbound",
            Self::PendingRevert => "pending_revert",
            Self::OutboundMined => "outbound_mined",
            Self::Reverted => "reverted",
            Self::Aborted => "aborted",
        }
    }
}

/// Status plus a human-readable reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Current status.
    pub status: XmsgStatus,
    /// Why the last transition happened.
    pub message: String,
    /// Block timestamp of the last transition.
    pub last_update_timestamp: u64,
}

/// The inbound event that created the xmsg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundTxParams {
    /// Chain the event happened on.
    pub sender_chain_id: ChainId,
    /// Sender on that chain.
    pub sender: Vec<u8>,
    /// Inbound transaction hash.
    pub in_tx_hash: Hash,
    /// External block containing the transaction.
    pub in_block_height: u64,
    /// Event position inside the transaction.
    pub event_index: u64,
    /// Transferred amount.
    pub amount: U256,
    /// Ballot that finalized the event.
    pub ballot_id: BallotId,
    /// Bridge height at which the ballot finalized.
    pub finalized_height: u64,
}

/// One outbound attempt. Element 0 is the primary leg; later ones revert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundTxParams {
    /// Destination chain.
    pub receiver_chain_id: ChainId,
    /// Recipient on the destination chain.
    pub receiver: Vec<u8>,
    /// Amount to deliver.
    pub amount: U256,
    /// Nonce reserved for the leg; `None` while queued.
    pub nonce: Option<u64>,
    /// TSS key the leg is signed with.
    pub tss_pubkey: String,
    /// Ballot that finalized the outbound observation.
    pub ballot_id: Option<BallotId>,
    /// Hash of the mined outbound transaction.
    pub observed_tx_hash: Option<Hash>,
    /// External block containing the outbound transaction.
    pub observed_block_height: u64,
    /// Execution result agreed by the ballot.
    pub receive_status: Option<ReceiveStatus>,
}

impl OutboundTxParams {
    /// Unscheduled leg.
    pub fn new(receiver_chain_id: ChainId, receiver: Vec<u8>, amount: U256) -> Self {
        Self {
            receiver_chain_id,
            receiver,
            amount,
            nonce: None,
            tss_pubkey: String::new(),
            ballot_id: None,
            observed_tx_hash: None,
            observed_block_height: 0,
            receive_status: None,
        }
    }
}

/// A cross-chain message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xmsg {
    /// Identifier.
    pub index: XmsgIndex,
    /// Call payload.
    pub message: Vec<u8>,
    /// Whether a failed primary leg may be reverted to the sender.
    pub allow_revert: bool,
    /// Status record.
    pub status: StatusRecord,
    /// Originating event.
    pub inbound: InboundTxParams,
    /// Outbound attempts, oldest first.
    pub outbound: Vec<OutboundTxParams>,
}

impl Xmsg {
    /// Current outbound leg.
    pub fn current_outbound(&self) -> Option<&OutboundTxParams> {
        self.outbound.last()
    }

    /// Current outbound leg, mutable.
    pub fn current_outbound_mut(&mut self) -> Option<&mut OutboundTxParams> {
        self.outbound.last_mut()
    }

    /// Current status.
    pub fn status(&self) -> XmsgStatus {
        self.status.status
    }

    /// Move to `to`, recording the reason and block timestamp.
    pub fn transition(
        &mut self,
        to: XmsgStatus,
        message: impl Into<String>,
        timestamp: u64,
    ) -> Result<(), XmsgError> {
        let from = self.status.status;
        if !from.can_transition_to(to) {
            return Err(XmsgError::InvalidTransition {
                from: from.as_str(),
                to: to.as_str(),
            });
        }
        self.status = StatusRecord {
            status: to,
            message: message.into(),
            last_update_timestamp: timestamp,
        };
        Ok(())
    }
}

/// Marker that an inbound event finalized, and which ballot did it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedInbound {
    /// Sender chain.
    pub chain_id: ChainId,
    /// Inbound transaction hash.
    pub in_tx_hash: Hash,
    /// Event index.
    pub event_index: u64,
    /// Ballot that finalized it.
    pub ballot_id: BallotId,
}

/// Result of an inbound or outbound vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmsgVoteOutcome {
    /// Ballot voted on.
    pub ballot_id: BallotId,
    /// Ballot status after the vote.
    pub ballot_status: BallotStatus,
    /// True if this vote created the ballot.
    pub ballot_created: bool,
    /// Xmsg touched by this vote, if the vote finalized the ballot.
    pub xmsg: Option<Xmsg>,
}

/// Result of an out-tx tracker submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerOutcome {
    /// The tracker was created or updated.
    Updated(TrackerUpdate),
    /// The xmsg is no longer pending; its tracker was dropped instead.
    Removed,
}

/// An inbound transaction reported for observers to look at.
///
/// Dropped once an inbound event from that transaction finalizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InTxTracker {
    /// Sender chain.
    pub chain_id: ChainId,
    /// Inbound transaction hash.
    pub tx_hash: Hash,
    /// First reporter.
    pub signer: Address,
    /// True once any report carried a verified inclusion proof.
    pub proved: bool,
}

/// Withdraw rate limiter settings, adjustable at runtime.
///
/// A disabled limiter, or a zero rate, lists every pending xmsg.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimiterFlags {
    /// Master switch.
    pub enabled: bool,
    /// Width of the sliding window, in bridge blocks.
    pub window_blocks: u64,
    /// Amount allowed per block inside the window.
    pub rate_per_block: U256,
}

impl RateLimiterFlags {
    /// Per-block rate if the limiter applies.
    pub fn active_rate(&self) -> Option<U256> {
        (self.enabled && !self.rate_per_block.is_zero()).then_some(self.rate_per_block)
    }
}

/// Pending xmsgs for one chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingXmsgs {
    /// Pending xmsgs in nonce order, capped by the query limit.
    pub xmsgs: Vec<Xmsg>,
    /// Size of the chain's pending window.
    pub total_pending: u64,
}

/// Pending xmsgs across chains, with the withdraw rate limiter applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitedPending {
    /// Pending xmsgs ordered by `(chain, nonce)`.
    pub xmsgs: Vec<Xmsg>,
    /// Nonces in flight across all chains.
    pub total_pending: u64,
    /// Width of the sliding window in blocks.
    pub window_blocks: u64,
    /// Amount counted inside the window.
    pub window_amount: U256,
    /// True if some xmsgs were withheld because the window limit was hit.
    pub rate_limit_exceeded: bool,
}

/// Genesis state for the state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmsgGenesis {
    /// Xmsgs, with their inbound-hash index rebuilt on import.
    pub xmsgs: Vec<Xmsg>,
    /// Inbound events already finalized.
    pub finalized_inbounds: Vec<FinalizedInbound>,
    /// Xmsgs queued for a nonce, per chain, in FIFO order.
    pub awaiting: Vec<(ChainId, XmsgIndex)>,
    /// Reported inbound transactions not yet finalized.
    pub in_tx_trackers: Vec<InTxTracker>,
    /// Rate limiter settings; the configured defaults apply when absent.
    pub rate_limiter_flags: Option<RateLimiterFlags>,
}
