//! Prometheus export.
//!
//! Component crates register their counters in the default Prometheus
//! registry behind their own `metrics` feature. This module only gathers
//! and encodes whatever is registered.
//!
//! All metrics follow the naming convention: `cb_<component>_<metric>_<unit>`

use prometheus::{Encoder, TextEncoder};

use crate::TelemetryError;

/// Encode every metric in the default registry in the text exposition format.
pub fn export_text() -> Result<String, TelemetryError> {
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsExport(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsExport(e.to_string()))
}

/// Number of metric families currently registered.
pub fn registered_families() -> usize {
    prometheus::gather().len()
}
