//! # Adapters Layer
//!
//! - `registry.rs` - `ObserverDirectory` over the observer registry service

pub mod registry;

pub use registry::RegistryDirectory;
