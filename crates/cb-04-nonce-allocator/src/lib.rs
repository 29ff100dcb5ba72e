//! # CB-04 Outbound Nonce Allocator
//!
//! Assigns per-destination-chain nonces to outbound legs and tracks the
//! window of nonces still in flight.
//!
//! **Subsystem ID:** 04
//! **Architecture:** Domain + Algorithms + Application service
//!
//! ## Purpose
//!
//! - Strictly increasing, never reused nonces per chain
//! - Pending window `[low, high)` that coalesces out-of-order confirmations
//! - Optional cap on nonces in flight (backpressure)
//! - Out-tx trackers holding candidate outbound hashes per nonce
//! - Nonce-to-xmsg ownership and an Admin-tier reset
//!
//! ## Invariants
//!
//! - `low <= high`, and neither ever decreases outside an admin reset
//! - The chain counter always equals `high`
//!
//! ## Module Structure
//!
//! ```text
//! cb-04-nonce-allocator/
//! ├── domain/          # ChainNonces, PendingNonces, OutTxTracker, errors
//! ├── algorithms/      # Window coalescing
//! ├── application/     # NonceAllocator service
//! ├── config.rs        # AllocatorConfig
//! └── metrics.rs       # Prometheus counters (feature = "metrics")
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod metrics;

// Re-exports
pub use algorithms::advance_low;
pub use application::NonceAllocator;
pub use config::AllocatorConfig;
pub use domain::{
    ChainNonces, NonceError, NonceGenesis, NonceResolution, NonceToXmsg, OutTxTracker,
    PendingNonces, TrackerUpdate, TxHashEntry,
};

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
