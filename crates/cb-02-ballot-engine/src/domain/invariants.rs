//! # Domain Invariants
//!
//! Business rules for ballots.

use super::entities::{Ballot, BallotStatus};
use super::errors::BallotError;

/// Invariant: one vote slot per voter.
pub fn invariant_votes_aligned(ballot: &Ballot) -> Result<(), BallotError> {
    if ballot.votes.len() != ballot.voter_list.len() {
        return Err(BallotError::MisalignedVotes(ballot.id.to_string()));
    }
    Ok(())
}

/// Invariant: a status only ever moves from `InProgress` to a finalized status.
pub fn invariant_status_transition(from: BallotStatus, to: BallotStatus) -> bool {
    from == to || (from == BallotStatus::InProgress && to.is_finalized())
}
