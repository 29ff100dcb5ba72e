//! Telemetry configuration from environment variables.

use std::env;

use serde::{Deserialize, Serialize};

/// Configuration for logging and metrics export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive such as `info,cb_02_ballot_engine=debug`
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Network identifier (testnet, mainnet, devnet)
    pub network: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "concord-bridge".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            network: "testnet".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CB_SERVICE_NAME`: Service name (default: concord-bridge)
    /// - `CB_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `CB_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `CB_JSON_LOGS`: Enable JSON logs (default: false outside containers)
    /// - `CB_NETWORK`: Network name (default: testnet)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("CB_SERVICE_NAME")
                .unwrap_or_else(|_| "concord-bridge".to_string()),

            log_level: env::var("CB_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("CB_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("CB_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            network: env::var("CB_NETWORK").unwrap_or_else(|_| "testnet".to_string()),
        }
    }

    /// Quiet configuration for tests: warnings only, plain text.
    pub fn for_testing() -> Self {
        Self {
            log_level: "warn".to_string(),
            network: "devnet".to_string(),
            ..Self::default()
        }
    }

    /// Service name qualified by network.
    pub fn full_service_name(&self) -> String {
        format!("{}-{}", self.service_name, self.network)
    }
}
