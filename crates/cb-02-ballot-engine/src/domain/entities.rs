//! # Domain Entities
//!
//! Ballots: one unit of consensus over one factual claim.

use std::collections::BTreeMap;
use std::fmt;

use cb_01_observer_registry::Threshold;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{Address, ChainId, Hash};

/// Deterministic ballot identifier: a hash of the claim being voted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BallotId(pub Hash);

impl BallotId {
    /// Derive an identifier from the claim.
    ///
    /// `claim` must be a canonical encoding of everything the observers
    /// agree on, and must exclude the vote value and the voter so that
    /// conflicting votes land on the same ballot.
    pub fn derive(observation_type: ObservationType, chain_id: ChainId, claim: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"cb-ballot");
        hasher.update([observation_type.tag()]);
        hasher.update(chain_id.to_be_bytes());
        hasher.update(claim);
        Self(hasher.finalize().into())
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

impl fmt::Display for BallotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Kind of claim a ballot decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationType {
    /// An inbound transaction on an external chain.
    InboundTx,
    /// The outcome of an outbound transaction on an external chain.
    OutboundTx,
    /// An external block header.
    BlockHeader,
}

impl ObservationType {
    fn tag(&self) -> u8 {
        match self {
            ObservationType::InboundTx => 1,
            ObservationType::OutboundTx => 2,
            ObservationType::BlockHeader => 3,
        }
    }

    /// Label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationType::InboundTx => "inbound_tx",
            ObservationType::OutboundTx => "outbound_tx",
            ObservationType::BlockHeader => "block_header",
        }
    }
}

/// One voter's slot on a ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteType {
    /// No vote cast yet.
    NotVoted,
    /// The claim holds.
    Success,
    /// The claim does not hold.
    Failure,
}

impl VoteType {
    /// Label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::NotVoted => "not_voted",
            VoteType::Success => "success",
            VoteType::Failure => "failure",
        }
    }
}

/// Ballot lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BallotStatus {
    /// Accepting votes; outcome undecided.
    InProgress,
    /// Success votes reached the threshold.
    FinalizedSuccess,
    /// The failure policy declared the claim rejected.
    FinalizedFailure,
}

impl BallotStatus {
    /// True for either finalized status.
    pub fn is_finalized(&self) -> bool {
        !matches!(self, BallotStatus::InProgress)
    }

    /// The vote value that agrees with this outcome, if finalized.
    pub fn winning_vote(&self) -> Option<VoteType> {
        match self {
            BallotStatus::InProgress => None,
            BallotStatus::FinalizedSuccess => Some(VoteType::Success),
            BallotStatus::FinalizedFailure => Some(VoteType::Failure),
        }
    }

    /// Label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            BallotStatus::InProgress => "in_progress",
            BallotStatus::FinalizedSuccess => "finalized_success",
            BallotStatus::FinalizedFailure => "finalized_failure",
        }
    }
}

/// Vote counts over a ballot's voter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    /// Success votes.
    pub success: u64,
    /// Failure votes.
    pub failure: u64,
    /// Voters that have not voted.
    pub not_voted: u64,
}

impl Tally {
    /// Size of the voter list.
    pub fn total(&self) -> u64 {
        self.success + self.failure + self.not_voted
    }
}

/// A ballot.
///
/// `votes[i]` belongs to `voter_list[i]`. The voter list is fixed when the
/// ballot is created and never changes afterwards, whatever happens to the
/// observer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    /// Identifier.
    pub id: BallotId,
    /// Claim kind.
    pub observation_type: ObservationType,
    /// Chain the claim is about.
    pub chain_id: ChainId,
    /// Voter snapshot, in observer-set order.
    pub voter_list: Vec<Address>,
    /// Votes aligned with `voter_list`.
    pub votes: Vec<VoteType>,
    /// Finalization threshold.
    pub threshold: Threshold,
    /// Current status.
    pub status: BallotStatus,
    /// Height at which the ballot was created.
    pub creation_height: u64,
    /// Height at which the ballot finalized.
    pub finalized_height: Option<u64>,
}

impl Ballot {
    /// Create an in-progress ballot with every slot `NotVoted`.
    pub fn new(
        id: BallotId,
        observation_type: ObservationType,
        chain_id: ChainId,
        voter_list: Vec<Address>,
        threshold: Threshold,
        creation_height: u64,
    ) -> Self {
        let votes = vec![VoteType::NotVoted; voter_list.len()];
        Self {
            id,
            observation_type,
            chain_id,
            voter_list,
            votes,
            threshold,
            status: BallotStatus::InProgress,
            creation_height,
            finalized_height: None,
        }
    }

    /// Slot index of a voter.
    pub fn voter_index(&self, voter: &Address) -> Option<usize> {
        self.voter_list.iter().position(|v| v == voter)
    }

    /// Vote cast by a voter, if the voter is on the list.
    pub fn vote_of(&self, voter: &Address) -> Option<VoteType> {
        self.voter_index(voter).map(|i| self.votes[i])
    }

    /// True if the voter is on the list and has voted.
    pub fn has_voted(&self, voter: &Address) -> bool {
        matches!(self.vote_of(voter), Some(v) if v != VoteType::NotVoted)
    }

    /// Count votes.
    pub fn tally(&self) -> Tally {
        self.votes.iter().fold(Tally::default(), |mut t, v| {
            match v {
                VoteType::Success => t.success += 1,
                VoteType::Failure => t.failure += 1,
                VoteType::NotVoted => t.not_voted += 1,
            }
            t
        })
    }

    /// True once the ballot has left `InProgress`.
    pub fn is_finalized(&self) -> bool {
        self.status.is_finalized()
    }

    /// Height from which the ballot counts as matured.
    pub fn maturity_height(&self, maturity_blocks: u64) -> u64 {
        self.creation_height.saturating_add(maturity_blocks)
    }

    /// Add each voter's reward units for this ballot to `rewards`.
    ///
    /// A vote that matches the outcome earns +1; a contrary vote or no
    /// vote earns -1. Returns the number of positive units handed out.
    /// In-progress ballots contribute nothing.
    pub fn reward_distribution(&self, rewards: &mut BTreeMap<Address, i64>) -> u64 {
        let Some(winning) = self.status.winning_vote() else {
            return 0;
        };

        let mut positive = 0;
        for (voter, vote) in self.voter_list.iter().zip(self.votes.iter()) {
            let entry = rewards.entry(*voter).or_insert(0);
            if *vote == winning {
                *entry += 1;
                positive += 1;
            } else {
                *entry -= 1;
            }
        }
        positive
    }
}

/// Result of a successfully recorded vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    /// The ballot after the vote.
    pub ballot: Ballot,
    /// True if this vote created the ballot.
    pub created: bool,
    /// True if this vote moved the ballot out of `InProgress`.
    ///
    /// Finalization side effects run if and only if this is set, which
    /// happens at most once per ballot.
    pub finalized_now: bool,
}

impl VoteOutcome {
    /// Status after the vote.
    pub fn status(&self) -> BallotStatus {
        self.ballot.status
    }
}
