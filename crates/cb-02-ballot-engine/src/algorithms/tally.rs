//! # Tally Evaluation
//!
//! Decides whether a tally finalizes a ballot.
//!
//! Success is checked first: `success · d ≥ n · N`, i.e. at least
//! `ceil(T·N)` success votes. Failure depends on the configured policy.

use cb_01_observer_registry::Threshold;
use serde::{Deserialize, Serialize};

use crate::domain::{BallotStatus, Tally};

/// When a ballot is declared `FinalizedFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Failure votes alone must reach the same threshold as success.
    /// A ballot whose voters split or go silent stays `InProgress`.
    SymmetricThreshold,
    /// Fail as soon as the remaining un-voted slots can no longer lift
    /// success to the threshold.
    #[default]
    SuccessUnreachable,
}

/// Evaluate a tally. Returns the finalized status, or `None` to stay open.
pub fn evaluate(tally: &Tally, threshold: &Threshold, policy: FailurePolicy) -> Option<BallotStatus> {
    let total = tally.total();
    if total == 0 {
        return None;
    }
    if threshold.is_reached(tally.success, total) {
        return Some(BallotStatus::FinalizedSuccess);
    }

    let failed = match policy {
        FailurePolicy::SymmetricThreshold => threshold.is_reached(tally.failure, total),
        FailurePolicy::SuccessUnreachable => {
            !threshold.is_reached(tally.success + tally.not_voted, total)
        }
    };

    failed.then_some(BallotStatus::FinalizedFailure)
}
