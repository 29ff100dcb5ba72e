//! # Bridge Runtime
//!
//! Host boundary of the Concord Bridge core.
//!
//! ## Execution Model
//!
//! - The host delivers one signed message at a time, in block order
//! - Every message runs in its own store overlay behind a panic boundary;
//!   a failed message leaves nothing behind
//! - A block executes against a private copy of the committed state and is
//!   swapped in as the new immutable snapshot on commit
//! - Queries read committed snapshots concurrently, without blocking block
//!   execution
//!
//! ## Modular Structure
//!
//! - `container/` - `BridgeConfig` and subsystem wiring
//! - `genesis/` - Genesis document and import
//! - `app/` - `BridgeMsg`, the executor and `BridgeError`
//! - `handlers/` - `QueryService` over committed snapshots
//! - `node` - Block execution and snapshot commit
//!
//! ## Failure Taxonomy
//!
//! | Kind | Meaning | Retry |
//! |------|---------|-------|
//! | `Rejected` | Invalid, unauthorized or untimely request | Only with a different request |
//! | `InvariantViolation` | Internal check failed or a handler panicked | Never |
//! | `Storage` | Backend failure | May succeed later |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod app;
pub mod container;
pub mod genesis;
pub mod handlers;
pub mod node;

// Re-exports
pub use app::{BridgeApp, BridgeError, BridgeMsg, ErrorKind, MsgResponse};
pub use container::{BridgeConfig, BridgeServices, ConfigError};
pub use genesis::Genesis;
pub use handlers::QueryService;
pub use node::{BlockResult, BridgeNode};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
