//! # CB-02 Ballot Engine
//!
//! Turns independent, possibly conflicting observer reports into one
//! finalized fact per claim.
//!
//! **Subsystem ID:** 02
//! **Architecture:** Hexagonal (Domain + Ports + Adapters + Application service)
//!
//! ## Purpose
//!
//! - Deterministic ballot identifiers derived from the claim
//! - Voter list and threshold fixed when a ballot is created
//! - Tally evaluation with a configurable failure policy
//! - Exactly-once finalization signal (`VoteOutcome::finalized_now`)
//! - Per-creation-height index feeding the matured ballot list
//!
//! ## Finalization Rule
//!
//! With `N` voters and threshold `n/d`, a ballot finalizes as success as
//! soon as `success · d ≥ n · N`. Failure follows [`FailurePolicy`].
//! A finalized ballot never changes status again.
//!
//! ## Module Structure
//!
//! ```text
//! cb-02-ballot-engine/
//! ├── domain/          # Ballot, BallotId, VoteType, Observation, errors
//! ├── algorithms/      # Tally evaluation, FailurePolicy
//! ├── ports/           # ObserverDirectory (driven port)
//! ├── adapters/        # RegistryDirectory
//! ├── application/     # BallotEngine service
//! ├── config.rs        # BallotConfig
//! └── metrics.rs       # Prometheus counters (feature = "metrics")
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;

// Re-exports
pub use adapters::RegistryDirectory;
pub use algorithms::{evaluate, FailurePolicy};
pub use application::BallotEngine;
pub use config::BallotConfig;
pub use domain::{
    Ballot, BallotError, BallotId, BallotStatus, NewBallot, Observation, ObservationType, Tally,
    VoteOutcome, VoteType,
};
pub use ports::ObserverDirectory;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    #[allow(clippy::const_is_empty)]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
