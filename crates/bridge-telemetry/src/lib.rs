//! # Bridge Telemetry
//!
//! Observability for the Concord Bridge core.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with `EnvFilter`, plain or JSON lines
//! - **Metrics**: text export of the Prometheus default registry, fed by the
//!   feature-gated `metrics` modules of the component crates
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bridge_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CB_SERVICE_NAME` | `concord-bridge` | Service name in logs |
//! | `CB_LOG_LEVEL` | `info` | Log level filter |
//! | `CB_JSON_LOGS` | `false` | JSON log lines |
//! | `CB_NETWORK` | `testnet` | Network label |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, StructuredLogger};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// Metrics could not be encoded.
    #[error("Failed to export metrics: {0}")]
    MetricsExport(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Guard returned by `init_telemetry`. Hold it for the lifetime of the process.
pub struct TelemetryGuard {
    logger: StructuredLogger,
}

impl TelemetryGuard {
    /// The installed logger.
    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = self.logger.service(), "Shutting down telemetry");
    }
}

/// Initialize logging for the process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let logger = init_logging(&config)?;
    Ok(TelemetryGuard { logger })
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
