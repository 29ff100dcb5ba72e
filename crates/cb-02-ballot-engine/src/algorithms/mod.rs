//! Ballot algorithms.

pub mod tally;

pub use tally::{evaluate, FailurePolicy};
