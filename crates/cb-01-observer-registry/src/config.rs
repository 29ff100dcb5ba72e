//! # Registry Configuration

use serde::{Deserialize, Serialize};

/// Observer Registry configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Upper bound on the observer set size.
    pub max_observers: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { max_observers: 128 }
    }
}

impl RegistryConfig {
    /// Create a config for testing (smaller values).
    pub fn for_testing() -> Self {
        Self { max_observers: 8 }
    }
}
