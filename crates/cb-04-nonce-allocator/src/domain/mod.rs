//! Domain layer for the Outbound Nonce Allocator.

pub mod entities;
pub mod errors;
pub mod invariants;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
