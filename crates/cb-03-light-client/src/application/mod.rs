//! Application layer for the Light-Client Header Store.

pub mod service;

pub use service::{HeaderVoteOutcome, LightClient};
