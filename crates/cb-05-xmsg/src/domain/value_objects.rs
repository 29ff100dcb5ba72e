//! # Value Objects
//!
//! Xmsg identifiers and the observation payloads observers vote with.

use std::fmt;

use cb_02_ballot_engine::{Observation, ObservationType, VoteType};
use cb_03_light_client::Proof;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{Address, ChainId, Hash, U256};

/// Deterministic xmsg identifier.
///
/// Derived from the originating chain, the sender, the inbound transaction
/// hash and the event index, so the same inbound event always maps to the
/// same xmsg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct XmsgIndex(pub Hash);

impl XmsgIndex {
    /// Derive the index of an inbound event.
    pub fn derive(sender_chain_id: ChainId, sender: &[u8], in_tx_hash: &Hash, event_index: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"cb-xmsg");
        hasher.update(sender_chain_id.to_be_bytes());
        hasher.update((sender.len() as u64).to_be_bytes());
        hasher.update(sender);
        hasher.update(in_tx_hash);
        hasher.update(event_index.to_be_bytes());
        Self(hasher.finalize().into())
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

impl fmt::Display for XmsgIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Execution result of an outbound transaction as seen by an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiveStatus {
    /// Transaction mined and succeeded.
    Success,
    /// Transaction mined and failed.
    Failed,
}

impl ReceiveStatus {
    /// Ballot vote this status maps to.
    pub fn as_vote(&self) -> VoteType {
        match self {
            ReceiveStatus::Success => VoteType::Success,
            ReceiveStatus::Failed => VoteType::Failure,
        }
    }

    /// Label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiveStatus::Success => "success",
            ReceiveStatus::Failed => "failed",
        }
    }
}

/// An observer's report of an inbound event on an external chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundVote {
    /// Submitting address (operator or grantee).
    pub signer: Address,
    /// Chain the event happened on.
    pub sender_chain_id: ChainId,
    /// Sender on the external chain.
    pub sender: Vec<u8>,
    /// Destination chain.
    pub receiver_chain_id: ChainId,
    /// Recipient on the destination chain.
    pub receiver: Vec<u8>,
    /// Inbound transaction hash.
    pub in_tx_hash: Hash,
    /// External block containing the transaction.
    pub in_block_height: u64,
    /// Event position inside the transaction.
    pub event_index: u64,
    /// Transferred amount.
    pub amount: U256,
    /// Call payload.
    pub message: Vec<u8>,
    /// Whether a failed outbound may be reverted to the sender.
    pub allow_revert: bool,
    /// The observer's verdict.
    pub vote: VoteType,
}

impl InboundVote {
    /// Index of the xmsg this event creates.
    pub fn xmsg_index(&self) -> XmsgIndex {
        XmsgIndex::derive(self.sender_chain_id, &self.sender, &self.in_tx_hash, self.event_index)
    }

    /// Canonical claim: every field except `signer` and `vote`.
    pub fn claim(&self) -> Vec<u8> {
        let mut claim = Vec::with_capacity(160 + self.sender.len() + self.receiver.len() + self.message.len());
        claim.extend_from_slice(&self.sender_chain_id.to_be_bytes());
        push_bytes(&mut claim, &self.sender);
        claim.extend_from_slice(&self.receiver_chain_id.to_be_bytes());
        push_bytes(&mut claim, &self.receiver);
        claim.extend_from_slice(&self.in_tx_hash);
        claim.extend_from_slice(&self.in_block_height.to_be_bytes());
        claim.extend_from_slice(&self.event_index.to_be_bytes());
        let mut amount = [0u8; 32];
        self.amount.to_big_endian(&mut amount);
        claim.extend_from_slice(&amount);
        push_bytes(&mut claim, &self.message);
        claim.push(u8::from(self.allow_revert));
        claim
    }

    /// Ballot observation for this vote.
    pub fn observation(&self) -> Observation {
        Observation::new(ObservationType::InboundTx, self.sender_chain_id, self.claim())
    }
}

/// An observer's report of an outbound transaction result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundVote {
    /// Submitting address (operator or grantee).
    pub signer: Address,
    /// Xmsg the outbound belongs to.
    pub xmsg_index: XmsgIndex,
    /// Destination chain of the leg.
    pub receiver_chain_id: ChainId,
    /// Nonce of the leg.
    pub nonce: u64,
    /// Observed outbound transaction hash.
    pub observed_tx_hash: Hash,
    /// External block containing the transaction.
    pub observed_block_height: u64,
    /// Observed execution result.
    pub status: ReceiveStatus,
}

impl OutboundVote {
    /// Canonical claim: the leg and the observed transaction.
    ///
    /// The receive status is the vote value, not part of the claim, so
    /// disagreeing observers land on the same ballot.
    pub fn claim(&self) -> Vec<u8> {
        let mut claim = Vec::with_capacity(32 + 8 + 8 + 32 + 8);
        claim.extend_from_slice(self.xmsg_index.as_bytes());
        claim.extend_from_slice(&self.receiver_chain_id.to_be_bytes());
        claim.extend_from_slice(&self.nonce.to_be_bytes());
        claim.extend_from_slice(&self.observed_tx_hash);
        claim.extend_from_slice(&self.observed_block_height.to_be_bytes());
        claim
    }

    /// Ballot observation for this vote.
    pub fn observation(&self) -> Observation {
        Observation::new(ObservationType::OutboundTx, self.receiver_chain_id, self.claim())
    }
}

/// Light-client inclusion proof backing a tracker hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerProof {
    /// Block the transaction is in.
    pub block_hash: Hash,
    /// Inclusion proof.
    pub proof: Proof,
    /// Transaction position in the block.
    pub tx_index: u64,
}

fn push_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
    out.extend_from_slice(bytes);
}
