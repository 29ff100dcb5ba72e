//! # Ballot Configuration

use serde::{Deserialize, Serialize};

use crate::algorithms::FailurePolicy;

/// Ballot Engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallotConfig {
    /// Blocks after creation before a finalized ballot is listed as matured.
    pub maturity_blocks: u64,
    /// When a ballot finalizes as failed.
    pub failure_policy: FailurePolicy,
    /// Let a voter replace their vote while the ballot is in progress.
    pub allow_vote_overwrite: bool,
    /// Record first votes that arrive after finalization (no status change).
    pub accept_late_votes: bool,
}

impl Default for BallotConfig {
    fn default() -> Self {
        Self {
            maturity_blocks: 100,
            failure_policy: FailurePolicy::SuccessUnreachable,
            allow_vote_overwrite: false,
            accept_late_votes: true,
        }
    }
}

impl BallotConfig {
    /// Create a config for testing (short maturity window).
    pub fn for_testing() -> Self {
        Self {
            maturity_blocks: 2,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BallotConfig::default();
        assert_eq!(config.maturity_blocks, 100);
        assert_eq!(config.failure_policy, FailurePolicy::SuccessUnreachable);
        assert!(!config.allow_vote_overwrite);
        assert!(config.accept_late_votes);
    }

    #[test]
    fn test_testing_config() {
        assert_eq!(BallotConfig::for_testing().maturity_blocks, 2);
    }
}
