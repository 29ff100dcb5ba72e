//! # CB-05 Cross-Chain Message State Machine
//!
//! Turns finalized observation ballots into cross-chain messages (xmsgs)
//! and drives each xmsg from inbound finalization to a terminal status.
//!
//! **Subsystem ID:** 05
//! **Architecture:** Hexagonal (Domain + Ports/Adapters + Application service)
//!
//! ## Purpose
//!
//! - Inbound ballots create xmsgs, at most once per inbound event
//! - Outbound legs get a nonce from CB-04 or wait in a per-chain FIFO queue
//! - Outbound ballots mine, revert or abort the current leg
//! - Out-tx trackers accept hashes from observers or with a light-client proof
//! - Emergency abort of stuck xmsgs
//! - Pending queries throttled by a withdraw rate limiter
//!
//! ## Lifecycle
//!
//! ```text
//! PendingInbound ──► PendingOutbound ──► OutboundMined
//!       │                  │
//!       │                  ├──► PendingRevert ──► Reverted
//!       │                  │          │
//!       └──────────────────┴──────────┴──► Aborted
//! ```
//!
//! ## Invariants
//!
//! - A `PendingOutbound` or `PendingRevert` xmsg's current leg holds a nonce
//! - A queued xmsg is `PendingInbound` and holds no nonce
//! - Nonce allocation and the status change commit together or not at all
//!
//! ## Module Structure
//!
//! ```text
//! cb-05-xmsg/
//! ├── domain/          # Xmsg, XmsgStatus, votes, errors, invariants
//! ├── algorithms/      # Withdraw rate limiter
//! ├── ports/           # InclusionProver
//! ├── adapters/        # LightClientProver (CB-03)
//! ├── application/     # XmsgStateMachine service
//! ├── config.rs        # XmsgConfig
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
pub use adapters::LightClientProver;
pub use algorithms::{effective_window, WithdrawBudget};
pub use application::XmsgStateMachine;
pub use config::XmsgConfig;
pub use domain::{
    invariant_outbound_has_nonce, invariant_queued_unscheduled, FinalizedInbound, InTxTracker,
    InboundTxParams, InboundVote, OutboundTxParams, OutboundVote, PendingXmsgs, RateLimitedPending,
    RateLimiterFlags, ReceiveStatus, StatusRecord, TrackerOutcome, TrackerProof, Xmsg, XmsgError,
    XmsgGenesis, XmsgIndex, XmsgStatus, XmsgVoteOutcome,
};
pub use ports::InclusionProver;

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
