//! # Ballot Metrics
//!
//! Prometheus metrics for ballot activity.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! cb-02-ballot-engine = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `cb_ballot_created_total` - Ballots created (by observation type)
//! - `cb_ballot_finalized_total` - Ballots finalized (by outcome)
//! - `cb_ballot_votes_total` - Votes recorded (by vote value)

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter_vec, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Ballots created, labeled by observation type
    pub static ref BALLOTS_CREATED: IntCounterVec = register_int_counter_vec!(
        "cb_ballot_created_total",
        "Total number of ballots created",
        &["observation_type"]
    )
    .expect("Failed to create BALLOTS_CREATED metric");

    /// Ballots finalized, labeled by outcome
    pub static ref BALLOTS_FINALIZED: IntCounterVec = register_int_counter_vec!(
        "cb_ballot_finalized_total",
        "Total number of ballots finalized",
        &["outcome"]
    )
    .expect("Failed to create BALLOTS_FINALIZED metric");

    /// Votes recorded, labeled by vote value
    pub static ref VOTES_CAST: IntCounterVec = register_int_counter_vec!(
        "cb_ballot_votes_total",
        "Total number of votes recorded",
        &["vote"]
    )
    .expect("Failed to create VOTES_CAST metric");
}

/// Record a ballot creation
#[cfg(feature = "metrics")]
pub fn record_ballot_created(observation_type: &str) {
    BALLOTS_CREATED.with_label_values(&[observation_type]).inc();
}

/// Record a ballot finalization
#[cfg(feature = "metrics")]
pub fn record_ballot_finalized(outcome: &str) {
    BALLOTS_FINALIZED.with_label_values(&[outcome]).inc();
}

/// Record a vote
#[cfg(feature = "metrics")]
pub fn record_vote_cast(vote: &str) {
    VOTES_CAST.with_label_values(&[vote]).inc();
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub fn record_ballot_created(_observation_type: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_ballot_finalized(_outcome: &str) {}

#[cfg(not(feature = "metrics"))]
pub fn record_vote_cast(_vote: &str) {}
