//! # Genesis Module
//!
//! Initial bridge state, one section per subsystem.
//!
//! ## Import Order
//!
//! 1. Registry: observers, TSS, chain params, crosschain flags
//! 2. Light client: verification flags, trusted headers
//! 3. Nonce allocator: counters, windows, trackers, ownership
//! 4. Xmsg: records, finalized-inbound markers, nonce queues
//!
//! Import bypasses authorization and runs inside one overlay: a failing
//! section leaves the store untouched.

use std::path::Path;

use cb_01_observer_registry::RegistryGenesis;
use cb_03_light_client::LightClientGenesis;
use cb_04_nonce_allocator::NonceGenesis;
use cb_05_xmsg::XmsgGenesis;
use serde::{Deserialize, Serialize};
use shared_types::{with_overlay, KeyValueStore};
use tracing::info;

use crate::app::BridgeError;
use crate::container::{BridgeServices, ConfigError};

/// Genesis document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Genesis {
    /// Observer registry section.
    pub registry: RegistryGenesis,
    /// Light client section.
    pub light_client: LightClientGenesis,
    /// Nonce allocator section.
    pub nonces: NonceGenesis,
    /// Xmsg section.
    pub xmsg: XmsgGenesis,
}

impl Genesis {
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Write every section into `store`.
    pub fn apply(
        &self,
        services: &BridgeServices,
        store: &mut dyn KeyValueStore,
    ) -> Result<(), BridgeError> {
        with_overlay(store, |s| {
            services.registry.import_genesis(s, &self.registry)?;
            services.light_client.import_genesis(s, &self.light_client)?;
            services.nonces.import_genesis(s, &self.nonces)?;
            services.xmsg.import_genesis(s, &self.xmsg)?;
            Ok::<_, BridgeError>(())
        })?;

        info!(
            observers = self.registry.observers.len(),
            chain_params = self.registry.chain_params.len(),
            headers = self.light_client.block_headers.len(),
            xmsgs = self.xmsg.xmsgs.len(),
            "[runtime] Genesis imported"
        );
        Ok(())
    }
}
