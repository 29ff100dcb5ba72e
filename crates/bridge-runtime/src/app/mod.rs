//! # Application Module
//!
//! Message types, the executor and the runtime error taxonomy.

pub mod errors;
pub mod executor;
pub mod messages;

pub use errors::{BridgeError, ErrorKind};
pub use executor::BridgeApp;
pub use messages::{BridgeMsg, MsgResponse};
