//! # Runtime Errors
//!
//! Every subsystem error surfaced at the transaction boundary, plus the
//! three-way classification callers use to decide whether a retry could
//! ever help.

use cb_01_observer_registry::RegistryError;
use cb_02_ballot_engine::BallotError;
use cb_03_light_client::LightClientError;
use cb_04_nonce_allocator::NonceError;
use cb_05_xmsg::XmsgError;
use shared_types::StoreError;
use thiserror::Error;

/// Error returned by `BridgeApp::deliver` and the query service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Storage failure outside any subsystem.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Observer registry.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Ballot engine.
    #[error(transparent)]
    Ballot(#[from] BallotError),

    /// Light client.
    #[error(transparent)]
    LightClient(#[from] LightClientError),

    /// Nonce allocator.
    #[error(transparent)]
    Nonce(#[from] NonceError),

    /// Xmsg state machine.
    #[error(transparent)]
    Xmsg(#[from] XmsgError),

    /// Execution panicked; the transaction was discarded.
    #[error("Transaction panicked: {0}")]
    Panicked(String),
}

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed, unauthorized or untimely request. Nothing was written.
    Rejected,
    /// Internal consistency check failed. Nothing was written.
    InvariantViolation,
    /// The store failed. Nothing was written.
    Storage,
}

impl ErrorKind {
    /// Label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Rejected => "rejected",
            ErrorKind::InvariantViolation => "invariant_violation",
            ErrorKind::Storage => "storage",
        }
    }
}

impl BridgeError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        if self.is_storage() {
            return ErrorKind::Storage;
        }
        let invariant = match self {
            BridgeError::Panicked(_) => true,
            BridgeError::Nonce(e) => e.is_invariant_violation(),
            BridgeError::Xmsg(e) => e.is_invariant_violation(),
            BridgeError::Ballot(BallotError::MisalignedVotes(_)) => true,
            BridgeError::LightClient(LightClientError::Ballot(BallotError::MisalignedVotes(_))) => {
                true
            }
            _ => false,
        };
        if invariant {
            ErrorKind::InvariantViolation
        } else {
            ErrorKind::Rejected
        }
    }

    fn is_storage(&self) -> bool {
        fn registry(e: &RegistryError) -> bool {
            matches!(e, RegistryError::Store(_))
        }
        fn ballot(e: &BallotError) -> bool {
            match e {
                BallotError::Store(_) => true,
                BallotError::Registry(e) => registry(e),
                _ => false,
            }
        }
        fn light_client(e: &LightClientError) -> bool {
            match e {
                LightClientError::Store(_) => true,
                LightClientError::Registry(e) => registry(e),
                LightClientError::Ballot(e) => ballot(e),
                _ => false,
            }
        }
        fn nonce(e: &NonceError) -> bool {
            matches!(e, NonceError::Store(_))
        }

        match self {
            BridgeError::Store(_) => true,
            BridgeError::Registry(e) => registry(e),
            BridgeError::Ballot(e) => ballot(e),
            BridgeError::LightClient(e) => light_client(e),
            BridgeError::Nonce(e) => nonce(e),
            BridgeError::Xmsg(e) => match e {
                XmsgError::Store(_) => true,
                XmsgError::Registry(e) => registry(e),
                XmsgError::Ballot(e) => ballot(e),
                XmsgError::Nonce(e) => nonce(e),
                XmsgError::LightClient(e) => light_client(e),
                _ => false,
            },
            BridgeError::Panicked(_) => false,
        }
    }
}
