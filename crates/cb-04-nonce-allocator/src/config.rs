//! # Allocator Configuration

use serde::{Deserialize, Serialize};

/// Outbound Nonce Allocator configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Cap on nonces in flight per chain; `None` means unlimited.
    pub max_pending_per_chain: Option<u64>,
    /// Candidate hashes kept per tracker.
    pub max_tracker_hashes: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_pending_per_chain: None,
            max_tracker_hashes: 2,
        }
    }
}

impl AllocatorConfig {
    /// Create a config for testing (small window).
    pub fn for_testing() -> Self {
        Self {
            max_pending_per_chain: Some(3),
            ..Self::default()
        }
    }
}
