//! # Value Objects
//!
//! Inputs to ballot creation.

use cb_01_observer_registry::Threshold;
use shared_types::{Address, ChainId};

use super::entities::{BallotId, ObservationType};

/// A claim submitted by an observer, before the ballot exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// Claim kind.
    pub observation_type: ObservationType,
    /// Chain the claim is about.
    pub chain_id: ChainId,
    /// Canonical encoding of the claim (excludes voter and vote value).
    pub claim: Vec<u8>,
}

impl Observation {
    /// Create an observation.
    pub fn new(observation_type: ObservationType, chain_id: ChainId, claim: Vec<u8>) -> Self {
        Self {
            observation_type,
            chain_id,
            claim,
        }
    }

    /// Ballot identifier this observation votes on.
    pub fn ballot_id(&self) -> BallotId {
        BallotId::derive(self.observation_type, self.chain_id, &self.claim)
    }
}

/// Parameters for a ballot that may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBallot {
    /// Identifier.
    pub id: BallotId,
    /// Claim kind.
    pub observation_type: ObservationType,
    /// Chain the claim is about.
    pub chain_id: ChainId,
    /// Voter snapshot to fix if the ballot is created.
    pub voters: Vec<Address>,
    /// Threshold to fix if the ballot is created.
    pub threshold: Threshold,
}
