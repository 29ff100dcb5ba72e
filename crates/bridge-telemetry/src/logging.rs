//! Structured logging.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either a
//! human-readable or a JSON fmt layer. JSON lines carry consistent fields:
//! - `timestamp`, `level`, `target`
//! - `subsystem`: emitting component (`runtime` for message delivery)
//! - message fields such as `msg_type`, `signer`, `height`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Handle returned by a successful `init_logging`.
#[derive(Debug)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    /// Service name the subscriber was installed for.
    pub fn service(&self) -> &str {
        &self.service
    }
}

/// Install the global subscriber.
///
/// Fails with `TelemetryError::LoggingInit` if the filter directive is
/// invalid or a global subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<StructuredLogger, TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("log level {:?}: {}", config.log_level, e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match (config.console_output, config.json_logs) {
        (false, _) => registry.try_init(),
        (true, true) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        (true, false) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .try_init(),
    };
    installed.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::info!(
        service = %config.full_service_name(),
        json_logs = config.json_logs,
        "Structured logging initialized"
    );

    Ok(StructuredLogger {
        service: config.full_service_name(),
    })
}

/// Log an event with a `subsystem` field.
#[macro_export]
macro_rules! log_event {
    ($level:ident, $subsystem:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            subsystem = $subsystem,
            $($($field)*,)?
            $msg
        )
    };
}
