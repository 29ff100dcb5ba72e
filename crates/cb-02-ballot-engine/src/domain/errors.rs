//! # Domain Errors
//!
//! Error types for the Ballot Engine.

use cb_01_observer_registry::RegistryError;
use shared_types::StoreError;
use thiserror::Error;

/// Ballot Engine error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BallotError {
    /// Storage failure.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Registry lookup failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Voter is not in the ballot's voter list, or is tombstoned.
    #[error("Not an authorized voter: {0}")]
    NotAuthorizedVoter(String),

    /// Vote attempted on a finalized ballot where it is not accepted.
    #[error("Ballot already finalized: {0}")]
    BallotAlreadyFinalized(String),

    /// Voter already voted on this ballot.
    #[error("Duplicate vote by {voter} on ballot {ballot}")]
    DuplicateVote {
        /// Ballot identifier
        ballot: String,
        /// Hex voter address
        voter: String,
    },

    /// Vote value is not a decision (e.g. `NotVoted`).
    #[error("Invalid vote: {0}")]
    InvalidVote(String),

    /// Ballot does not exist.
    #[error("Ballot not found: {0}")]
    BallotNotFound(String),

    /// A ballot needs at least one voter.
    #[error("Empty voter set for ballot {0}")]
    EmptyVoterSet(String),

    /// Stored ballot has `votes` and `voter_list` of different length.
    #[error("Corrupt ballot {0}: votes not aligned with voter list")]
    MisalignedVotes(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_vote_error() {
        let err = BallotError::DuplicateVote {
            ballot: "b1".to_string(),
            voter: "v4".to_string(),
        };
        assert!(err.to_string().contains("Duplicate vote"));
        assert!(err.to_string().contains("b1"));
    }

    #[test]
    fn test_not_authorized_voter_error() {
        let err = BallotError::NotAuthorizedVoter("abcd".to_string());
        assert!(err.to_string().contains("abcd"));
    }

    #[test]
    fn test_registry_error_converts() {
        let err: BallotError = RegistryError::TssNotFound.into();
        assert!(matches!(err, BallotError::Registry(_)));
    }
}
