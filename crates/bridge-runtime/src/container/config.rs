//! # Bridge Configuration
//!
//! Unified configuration for every subsystem plus the chain registry and
//! the policy grants. Loaded from JSON; every section except `chains` may be
//! omitted and falls back to its defaults.

use std::path::Path;

use bridge_telemetry::TelemetryConfig;
use cb_01_observer_registry::RegistryConfig;
use cb_02_ballot_engine::BallotConfig;
use cb_03_light_client::LightClientConfig;
use cb_04_nonce_allocator::AllocatorConfig;
use cb_05_xmsg::XmsgConfig;
use serde::{Deserialize, Serialize};
use shared_types::{ChainRegistry, PolicyGrant, PolicyTable};
use thiserror::Error;

/// Complete bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Known chains. Exactly one may be the home chain.
    pub chains: ChainRegistry,
    /// Policy grants consulted by administrative messages.
    #[serde(default)]
    pub policy: Vec<PolicyGrant>,
    /// Observer registry.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Ballot engine.
    #[serde(default)]
    pub ballot: BallotConfig,
    /// Light client.
    #[serde(default)]
    pub light_client: LightClientConfig,
    /// Nonce allocator.
    #[serde(default)]
    pub allocator: AllocatorConfig,
    /// Xmsg state machine.
    #[serde(default)]
    pub xmsg: XmsgConfig,
    /// Logging.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl BridgeConfig {
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Policy table built from the grants.
    pub fn policy_table(&self) -> PolicyTable {
        PolicyTable::from_grants(&self.policy)
    }

    /// Test configuration: the testing chain set and small subsystem limits.
    pub fn for_testing() -> Self {
        Self {
            chains: ChainRegistry::for_testing(),
            policy: Vec::new(),
            registry: RegistryConfig::for_testing(),
            ballot: BallotConfig::for_testing(),
            light_client: LightClientConfig::for_testing(),
            allocator: AllocatorConfig::for_testing(),
            xmsg: XmsgConfig::for_testing(),
            telemetry: TelemetryConfig::for_testing(),
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("Failed to read config: {0}")]
    Io(String),

    /// Document is not valid for the target type.
    #[error("Failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::PolicyTier;

    const MINIMAL: &str = r#"{
        "chains": [
            { "id": 1, "name": "ethereum", "family": "Evm" },
            { "id": 7000, "name": "concord", "family": "Home" }
        ]
    }"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = BridgeConfig::from_json_str(MINIMAL).unwrap();
        assert!(config.chains.is_external(1));
        assert!(!config.chains.is_external(7000));
        assert_eq!(config.ballot, BallotConfig::default());
        assert_eq!(config.xmsg, XmsgConfig::default());
        assert!(config.policy.is_empty());
    }

    #[test]
    fn test_policy_grants_parsed() {
        let json = format!(
            r#"{{
                "chains": [{{ "id": 1, "name": "ethereum", "family": "Evm" }}],
                "policy": [{{ "address": {:?}, "tier": "Emergency" }}],
                "allocator": {{ "max_pending_per_chain": 16 }}
            }}"#,
            [7u8; 20]
        );
        let config = BridgeConfig::from_json_str(&json).unwrap();
        assert_eq!(config.allocator.max_pending_per_chain, Some(16));
        assert_eq!(config.allocator.max_tracker_hashes, 2);

        use shared_types::PolicyAuthorizer;
        let table = config.policy_table();
        assert!(table.is_authorized(&[7u8; 20], PolicyTier::Emergency));
        assert!(!table.is_authorized(&[7u8; 20], PolicyTier::Admin));
    }

    #[test]
    fn test_duplicate_home_chain_rejected() {
        let json = r#"{
            "chains": [
                { "id": 7000, "name": "a", "family": "Home" },
                { "id": 7001, "name": "b", "family": "Home" }
            ]
        }"#;
        assert!(matches!(BridgeConfig::from_json_str(json), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = BridgeConfig::from_json_file("/nonexistent/bridge.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_round_trip_through_file() {
        let config = BridgeConfig::for_testing();
        let path = std::env::temp_dir().join(format!("cb-config-{}.json", std::process::id()));
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();
        let loaded = BridgeConfig::from_json_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
