//! # Xmsg Metrics
//!
//! Prometheus metrics for the cross-chain message lifecycle.
//!
//! ## Metrics Exported
//!
//! - `cb_xmsg_created_total` - Xmsgs created from finalized inbound ballots
//! - `cb_xmsg_transitions_total` - Status transitions (by target status)
//! - `cb_xmsg_queued_total` - Xmsgs parked waiting for a nonce (by chain)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Xmsgs created
    pub static ref XMSG_CREATED: IntCounter = register_int_counter!(
        "cb_xmsg_created_total",
        "Total number of xmsgs created"
    )
    .expect("Failed to create XMSG_CREATED metric");

    /// Transitions, labeled by target status
    pub static ref XMSG_TRANSITIONS: IntCounterVec = register_int_counter_vec!(
        "cb_xmsg_transitions_total",
        "Total number of xmsg status transitions",
        &["status"]
    )
    .expect("Failed to create XMSG_TRANSITIONS metric");

    /// Xmsgs queued, labeled by chain
    pub static ref XMSG_QUEUED: IntCounterVec = register_int_counter_vec!(
        "cb_xmsg_queued_total",
        "Total number of xmsgs parked waiting for an outbound nonce",
        &["chain"]
    )
    .expect("Failed to create XMSG_QUEUED metric");
}

/// Record a new xmsg
#[cfg(feature = "metrics")]
pub fn record_xmsg_created() {
    XMSG_CREATED.inc();
}

/// Record a status transition
#[cfg(feature = "metrics")]
pub fn record_transition(status: &str) {
    XMSG_TRANSITIONS.with_label_values(&[status]).inc();
}

/// Record an xmsg parked in the nonce queue
#[cfg(feature = "metrics")]
pub fn record_queued(chain: &str) {
    XMSG_QUEUED.with_label_values(&[chain]).inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_xmsg_created() {}

#[cfg(not(feature = "metrics"))]
pub fn record_transition(_status: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_queued(_chain: &str) {}
