//! # Shared Types Crate
//!
//! Primitives and ports shared by every Concord Bridge subsystem.
//!
//! ## Contents
//!
//! - **Entities**: `Hash`, `Address`, `ChainId`, `BlockContext`
//! - **Chains**: the explicitly constructed `ChainRegistry` handed to every
//!   component that needs chain-family dispatch
//! - **Store**: the `KeyValueStore` port, the ordered `InMemoryKVStore`
//!   adapter and the `CacheStore` overlay used for all-or-nothing mutation
//! - **Codec**: bincode record helpers and module-scoped key construction
//! - **Policy**: the `PolicyAuthorizer` port and a table-backed adapter
//!
//! ## Design Principles
//!
//! - **No global state**: chain metadata and authorization are values passed
//!   by reference, never process-wide constants.
//! - **Deterministic iteration**: every store adapter iterates in key order so
//!   two nodes replaying the same block produce the same writes.

pub mod chains;
pub mod codec;
pub mod entities;
pub mod errors;
pub mod overlay;
pub mod policy;
pub mod store;

pub use chains::{Chain, ChainFamily, ChainRegistry};
pub use codec::{delete_record, get_record, put_record, scan_records, StoreKey};
pub use entities::*;
pub use errors::*;
pub use overlay::{with_overlay, CacheStore};
pub use policy::{required_tier_for_flag_update, PolicyAuthorizer, PolicyGrant, PolicyTable, PolicyTier};
pub use store::{BatchOperation, InMemoryKVStore, KeyValueStore, ScanResult};
