//! # Ports Layer
//!
//! Outbound dependencies of the state machine.

pub mod outbound;

pub use outbound::InclusionProver;
