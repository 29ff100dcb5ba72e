//! # Service Container
//!
//! Holds every subsystem service, wired in dependency order:
//!
//! ```text
//! Level 0: ChainRegistry, PolicyTable (static, built from config)
//! Level 1: ObserverRegistry (CB-01)
//! Level 2: BallotEngine (CB-02), NonceAllocator (CB-04)
//! Level 3: LightClient (CB-03)
//! Level 4: XmsgStateMachine (CB-05), proving through CB-03
//! ```
//!
//! Services are stateless over the store, so one container is shared by
//! block execution and every query thread.

use std::sync::Arc;

use cb_01_observer_registry::ObserverRegistry;
use cb_02_ballot_engine::{BallotEngine, RegistryDirectory};
use cb_03_light_client::LightClient;
use cb_04_nonce_allocator::NonceAllocator;
use cb_05_xmsg::{LightClientProver, XmsgStateMachine};
use shared_types::{ChainRegistry, PolicyAuthorizer};
use tracing::info;

use crate::container::config::BridgeConfig;

/// All subsystem services.
pub struct BridgeServices {
    /// Known chains.
    pub chains: Arc<ChainRegistry>,
    /// Host policy port.
    pub policy: Arc<dyn PolicyAuthorizer>,
    /// Observer Registry (Subsystem 1).
    pub registry: Arc<ObserverRegistry>,
    /// Ballot Engine (Subsystem 2).
    pub ballots: Arc<BallotEngine>,
    /// Light Client (Subsystem 3).
    pub light_client: Arc<LightClient>,
    /// Nonce Allocator (Subsystem 4).
    pub nonces: Arc<NonceAllocator>,
    /// Xmsg State Machine (Subsystem 5).
    pub xmsg: Arc<XmsgStateMachine>,
}

impl BridgeServices {
    /// Wire every subsystem from `config`, using its policy grants.
    pub fn new(config: &BridgeConfig) -> Self {
        Self::with_policy(config, Arc::new(config.policy_table()))
    }

    /// Wire every subsystem with an externally supplied policy engine.
    pub fn with_policy(config: &BridgeConfig, policy: Arc<dyn PolicyAuthorizer>) -> Self {
        let chains = Arc::new(config.chains.clone());

        let registry = Arc::new(ObserverRegistry::new(
            config.registry.clone(),
            chains.clone(),
            policy.clone(),
        ));
        let ballots = Arc::new(BallotEngine::new(
            config.ballot.clone(),
            Arc::new(RegistryDirectory::new(registry.clone())),
        ));
        let nonces = Arc::new(NonceAllocator::new(
            config.allocator.clone(),
            chains.clone(),
            policy.clone(),
        ));
        let light_client = Arc::new(LightClient::new(
            config.light_client.clone(),
            registry.clone(),
            ballots.clone(),
        ));
        let xmsg = Arc::new(XmsgStateMachine::new(
            config.xmsg.clone(),
            registry.clone(),
            ballots.clone(),
            nonces.clone(),
            Arc::new(LightClientProver::new(light_client.clone())),
        ));

        info!(
            chains = chains.len(),
            "[runtime] Subsystems wired: registry, ballots, nonces, light-client, xmsg"
        );

        Self {
            chains,
            policy,
            registry,
            ballots,
            light_client,
            nonces,
            xmsg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_services_share_chain_registry() {
        let services = BridgeServices::new(&BridgeConfig::for_testing());
        assert_eq!(services.chains.len(), 4);
        assert_eq!(services.registry.chains().len(), 4);
        assert_eq!(services.xmsg.config(), &BridgeConfig::for_testing().xmsg);
        assert_eq!(services.nonces.config().max_pending_per_chain, Some(3));
    }
}
