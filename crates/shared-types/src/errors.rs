//! # Error Types
//!
//! Storage and registry errors shared across subsystems.

use thiserror::Error;

use crate::ChainId;

/// Errors raised by a key-value store adapter or the record codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend operation failed.
    #[error("Database error: {0}")]
    Backend(String),

    /// Record could not be encoded.
    #[error("Failed to encode record: {0}")]
    Encode(String),

    /// Stored bytes could not be decoded into the expected record.
    #[error("Corrupt record at key {key}: {reason}")]
    Decode {
        /// Key of the corrupt record
        key: String,
        /// Decoder message
        reason: String,
    },
}

/// Errors raised while building a `ChainRegistry`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainRegistryError {
    /// Two chains share one identifier.
    #[error("Duplicate chain id: {0}")]
    DuplicateChain(ChainId),

    /// More than one chain claims the home family.
    #[error("Multiple home chains configured: {0} and {1}")]
    MultipleHomeChains(ChainId, ChainId),
}
