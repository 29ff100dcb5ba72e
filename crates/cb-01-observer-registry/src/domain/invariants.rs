//! # Domain Invariants
//!
//! Business rules for the Observer Registry.

use super::entities::{ObserverSet, TssRecord};
use super::errors::RegistryError;

/// Invariant: the observer set is strictly ascending (sorted, no duplicates).
pub fn invariant_set_strictly_ordered(set: &ObserverSet) -> bool {
    set.as_slice().windows(2).all(|w| w[0] < w[1])
}

/// Invariant: TSS records only move forward.
///
/// A new record must have a keygen height above the current one. History is
/// append-only, so an older key can never become current again.
pub fn invariant_tss_supersedes(
    current: Option<&TssRecord>,
    proposed: &TssRecord,
) -> Result<(), RegistryError> {
    if proposed.pubkey.is_empty() {
        return Err(RegistryError::InvalidTss("empty pubkey".to_string()));
    }
    if let Some(current) = current {
        if proposed.keygen_height <= current.keygen_height {
            return Err(RegistryError::StaleKeygen {
                current: current.keygen_height,
                proposed: proposed.keygen_height,
            });
        }
    }
    Ok(())
}
