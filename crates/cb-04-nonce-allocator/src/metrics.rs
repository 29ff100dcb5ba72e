//! # Nonce Metrics
//!
//! Prometheus metrics for outbound nonce bookkeeping.
//!
//! ## Metrics Exported
//!
//! - `cb_nonce_allocated_total` - Nonces handed out (by chain)
//! - `cb_nonce_resolved_total` - Nonces confirmed or released (by resolution)
//! - `cb_nonce_pending` - Current window size (by chain)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter_vec, register_int_gauge_vec, IntCounterVec, IntGaugeVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Nonces allocated, labeled by chain
    pub static ref NONCES_ALLOCATED: IntCounterVec = register_int_counter_vec!(
        "cb_nonce_allocated_total",
        "Total number of outbound nonces allocated",
        &["chain"]
    )
    .expect("Failed to create NONCES_ALLOCATED metric");

    /// Nonces resolved, labeled by resolution
    pub static ref NONCES_RESOLVED: IntCounterVec = register_int_counter_vec!(
        "cb_nonce_resolved_total",
        "Total number of outbound nonces confirmed or released",
        &["resolution"]
    )
    .expect("Failed to create NONCES_RESOLVED metric");

    /// Window size, labeled by chain
    pub static ref NONCES_PENDING: IntGaugeVec = register_int_gauge_vec!(
        "cb_nonce_pending",
        "Outbound nonces currently in flight",
        &["chain"]
    )
    .expect("Failed to create NONCES_PENDING metric");
}

/// Record an allocation and the new window size
#[cfg(feature = "metrics")]
pub fn record_nonce_allocated(chain: &str, pending: u64) {
    NONCES_ALLOCATED.with_label_values(&[chain]).inc();
    NONCES_PENDING
        .with_label_values(&[chain])
        .set(i64::try_from(pending).unwrap_or(i64::MAX));
}

/// Record a resolution and the new window size
#[cfg(feature = "metrics")]
pub fn record_nonce_resolved(chain: &str, resolution: &str, pending: u64) {
    NONCES_RESOLVED.with_label_values(&[resolution]).inc();
    NONCES_PENDING
        .with_label_values(&[chain])
        .set(i64::try_from(pending).unwrap_or(i64::MAX));
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_nonce_allocated(_chain: &str, _pending: u64) {}

#[cfg(not(feature = "metrics"))]
pub fn record_nonce_resolved(_chain: &str, _resolution: &str, _pending: u64) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop_when_disabled() {
        record_nonce_allocated("97", 1);
        record_nonce_resolved("97", "confirmed", 0);
    }
}
