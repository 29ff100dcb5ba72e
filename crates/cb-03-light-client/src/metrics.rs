//! # Light Client Metrics
//!
//! Enable with the `metrics` feature.
//!
//! - `cb_light_client_headers_stored_total` - Headers stored (by chain family)
//! - `cb_light_client_proofs_verified_total` - Proof verifications (by result)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter_vec, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Headers stored, labeled by header variant
    pub static ref HEADERS_STORED: IntCounterVec = register_int_counter_vec!(
        "cb_light_client_headers_stored_total",
        "Total number of block headers stored",
        &["variant"]
    )
    .expect("Failed to create HEADERS_STORED metric");

    /// Proof verifications, labeled by result
    pub static ref PROOFS_VERIFIED: IntCounterVec = register_int_counter_vec!(
        "cb_light_client_proofs_verified_total",
        "Total number of proof verifications",
        &["result"]
    )
    .expect("Failed to create PROOFS_VERIFIED metric");
}

/// Record a stored header
#[cfg(feature = "metrics")]
pub fn record_header_stored(variant: &str) {
    HEADERS_STORED.with_label_values(&[variant]).inc();
}

/// Record a proof verification
#[cfg(feature = "metrics")]
pub fn record_proof_verified(valid: bool) {
    let result = if valid { "valid" } else { "invalid" };
    PROOFS_VERIFIED.with_label_values(&[result]).inc();
}

#[cfg(not(feature = "metrics"))]
pub fn record_header_stored(_variant: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_proof_verified(_valid: bool) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_noop_when_disabled() {
        record_header_stored("ethereum");
        record_proof_verified(true);
        record_proof_verified(false);
    }
}
