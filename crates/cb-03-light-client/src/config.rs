//! # Light Client Configuration

use serde::{Deserialize, Serialize};

/// Light client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightClientConfig {
    /// Heights retained per chain; 0 keeps everything.
    pub header_retention: u64,
    /// Largest accepted encoded header.
    pub max_header_bytes: usize,
    /// How far a Bitcoin header timestamp may run ahead of the chain clock.
    pub max_future_drift_secs: u64,
}

impl Default for LightClientConfig {
    fn default() -> Self {
        Self {
            header_retention: 1000,
            max_header_bytes: 4096,
            max_future_drift_secs: 2 * 60 * 60,
        }
    }
}

impl LightClientConfig {
    /// Create a config for testing (small retention window).
    pub fn for_testing() -> Self {
        Self {
            header_retention: 5,
            ..Self::default()
        }
    }
}
