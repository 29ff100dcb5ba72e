//! Application layer for the Ballot Engine.

pub mod service;

pub use service::BallotEngine;
