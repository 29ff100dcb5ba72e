//! # CB-01 Observer Registry
//!
//! The authorized observer set, TSS key metadata, per-chain observation
//! parameters and the crosschain on/off switches.
//!
//! **Subsystem ID:** 01  
//! **Architecture:** Hexagonal (Domain + Application service)
//!
//! ## Purpose
//!
//! Pure lookup/state component consulted by every other subsystem:
//! - Voter eligibility (member of the set and not tombstoned)
//! - Voter-list snapshots for new ballots
//! - Ballot thresholds per chain
//! - The current TSS, whose nonces the allocator hands out
//!
//! ## Authorization
//!
//! | Change | Required tier |
//! |--------|---------------|
//! | Add / remove observer | Admin |
//! | Rotate grantee | Admin or the operator |
//! | Set TSS | Admin |
//! | Chain params | Admin |
//! | Crosschain flags | Emergency to disable, Operational to enable |
//!
//! ## Module Structure
//!
//! ```text
//! cb-01-observer-registry/
//! ├── domain/          # Observer, ObserverSet, TssRecord, ChainParams, Threshold
//! ├── application/     # ObserverRegistry service
//! └── config.rs        # RegistryConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod application;
pub mod config;
pub mod domain;

// Re-exports
pub use application::ObserverRegistry;
pub use config::RegistryConfig;
pub use domain::{
    invariant_set_strictly_ordered, invariant_tss_supersedes, ChainParams, CrosschainFlags,
    Observer, ObserverSet, ObserverStatus, RegistryError, RegistryGenesis, Threshold, TssRecord,
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
