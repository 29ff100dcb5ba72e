//! # Container Module
//!
//! Configuration and subsystem wiring.

pub mod config;
pub mod services;

pub use config::{BridgeConfig, ConfigError};
pub use services::BridgeServices;
