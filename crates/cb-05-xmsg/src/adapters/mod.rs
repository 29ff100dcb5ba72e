//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits against sibling subsystems.

mod light_client_prover;

pub use light_client_prover::LightClientProver;
