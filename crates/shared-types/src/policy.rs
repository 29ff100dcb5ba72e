//! # Policy Authorization
//!
//! The bridge core never implements the policy engine. It asks a single
//! boolean question, "is this address authorized at this tier?", through
//! the `PolicyAuthorizer` port.
//!
//! ## Tiers
//!
//! | Tier | Typical use |
//! |------|-------------|
//! | Emergency | Disable verification or crosschain flags, abort stuck xmsgs |
//! | Operational | Re-enable flags |
//! | Admin | Observer set, TSS and chain-parameter changes, nonce resets |
//!
//! Tiers are independent groups, not a hierarchy: an Admin grant does not
//! imply Emergency.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::Address;

/// Authorization tier required by an administrative message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PolicyTier {
    /// Fast, low-bar actions that only reduce what the bridge does.
    Emergency,
    /// Actions that restore or extend functionality.
    Operational,
    /// Membership and key management.
    Admin,
}

/// Port to the host's policy engine.
pub trait PolicyAuthorizer: Send + Sync {
    /// True if `address` holds `tier`.
    fn is_authorized(&self, address: &Address, tier: PolicyTier) -> bool;
}

/// One grant entry, as written in genesis files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyGrant {
    /// Grantee address.
    pub address: Address,
    /// Granted tier.
    pub tier: PolicyTier,
}

/// Table-backed `PolicyAuthorizer`.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    /// tier -> addresses holding it
    grants: BTreeMap<PolicyTier, BTreeSet<Address>>,
}

impl PolicyTable {
    /// Create an empty table (nobody is authorized).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from grant entries.
    pub fn from_grants<'a>(grants: impl IntoIterator<Item = &'a PolicyGrant>) -> Self {
        let mut table = Self::new();
        for grant in grants {
            table.grant(grant.address, grant.tier);
        }
        table
    }

    /// Grant a tier.
    pub fn grant(&mut self, address: Address, tier: PolicyTier) {
        self.grants.entry(tier).or_default().insert(address);
    }

    /// Revoke a tier. Returns true if the grant existed.
    pub fn revoke(&mut self, address: &Address, tier: PolicyTier) -> bool {
        self.grants
            .get_mut(&tier)
            .map(|set| set.remove(address))
            .unwrap_or(false)
    }
}

impl PolicyAuthorizer for PolicyTable {
    fn is_authorized(&self, address: &Address, tier: PolicyTier) -> bool {
        self.grants
            .get(&tier)
            .map(|set| set.contains(address))
            .unwrap_or(false)
    }
}

/// Tier required to move a set of on/off switches from `current` to `proposed`.
///
/// Turning any switch on needs `Operational`; a change that only turns
/// switches off (or changes nothing) needs `Emergency`. Slices are compared
/// position by position.
pub fn required_tier_for_flag_update(current: &[bool], proposed: &[bool]) -> PolicyTier {
    let enables = current
        .iter()
        .zip(proposed.iter())
        .any(|(before, after)| !before && *after);

    if enables {
        PolicyTier::Operational
    } else {
        PolicyTier::Emergency
    }
}
