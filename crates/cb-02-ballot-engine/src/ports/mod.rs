//! # Ports Layer
//!
//! - `outbound.rs` - Driven ports (observer state the engine consults)

pub mod outbound;

pub use outbound::ObserverDirectory;
