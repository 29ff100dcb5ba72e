//! Application layer for the Observer Registry.

pub mod service;

pub use service::ObserverRegistry;
