//! # Bridge Node
//!
//! Executes blocks against a private copy of the committed state and swaps
//! the result in as the new committed snapshot.
//!
//! ## Thread Safety
//!
//! - Block execution is serialized by a mutex
//! - The committed snapshot sits behind a `RwLock<Arc<_>>`; readers only
//!   hold the lock long enough to clone the `Arc`
//! - A reader keeps the snapshot it cloned until it drops it, so a query
//!   never observes a half-applied block

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use shared_types::{BlockContext, InMemoryKVStore};
use tracing::info;

use crate::app::{BridgeApp, BridgeError, BridgeMsg, MsgResponse};
use crate::container::BridgeConfig;
use crate::genesis::Genesis;
use crate::handlers::QueryService;

/// State committed at one height.
#[derive(Debug, Clone)]
struct Committed {
    store: Arc<InMemoryKVStore>,
    height: u64,
}

/// Outcome of one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockResult {
    /// Height the block committed at.
    pub height: u64,
    /// One entry per message, in delivery order.
    pub results: Vec<Result<MsgResponse, BridgeError>>,
}

impl BlockResult {
    /// Number of messages that were applied.
    pub fn applied(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }
}

/// Block executor plus committed state.
pub struct BridgeNode {
    app: Arc<BridgeApp>,
    committed: RwLock<Committed>,
    execution: Mutex<()>,
}

impl BridgeNode {
    /// Wire the subsystems and commit `genesis` at height 0.
    pub fn new(config: &BridgeConfig, genesis: &Genesis) -> Result<Self, BridgeError> {
        Self::from_app(Arc::new(BridgeApp::new(config)), genesis)
    }

    /// Commit `genesis` at height 0 using an existing app.
    pub fn from_app(app: Arc<BridgeApp>, genesis: &Genesis) -> Result<Self, BridgeError> {
        let mut store = InMemoryKVStore::new();
        app.init_genesis(&mut store, genesis)?;
        Ok(Self {
            app,
            committed: RwLock::new(Committed {
                store: Arc::new(store),
                height: 0,
            }),
            execution: Mutex::new(()),
        })
    }

    /// The executor.
    pub fn app(&self) -> &Arc<BridgeApp> {
        &self.app
    }

    /// Last committed height.
    pub fn height(&self) -> u64 {
        self.committed.read().height
    }

    /// Last committed state.
    pub fn snapshot(&self) -> Arc<InMemoryKVStore> {
        self.committed.read().store.clone()
    }

    /// Query service over the last committed state.
    pub fn query(&self) -> QueryService {
        let committed = self.committed.read().clone();
        QueryService::new(self.app.clone(), committed.store, committed.height)
    }

    /// Execute `msgs` as the next block and commit it.
    ///
    /// Failed messages are reported in the result and leave no trace; the
    /// block itself always commits.
    pub fn execute_block(&self, msgs: &[BridgeMsg], timestamp: u64) -> BlockResult {
        let _guard = self.execution.lock();
        let (mut working, height) = {
            let committed = self.committed.read();
            (committed.store.as_ref().clone(), committed.height + 1)
        };

        let ctx = BlockContext::new(height, timestamp);
        let results: Vec<_> = msgs
            .iter()
            .map(|msg| self.app.deliver(&mut working, msg, &ctx))
            .collect();

        *self.committed.write() = Committed {
            store: Arc::new(working),
            height,
        };

        let result = BlockResult { height, results };
        info!(
            "[runtime] Block committed: height={} messages={} applied={}",
            height,
            msgs.len(),
            result.applied()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_01_observer_registry::{ChainParams, Observer, RegistryGenesis};
    use cb_03_light_client::VerificationFlags;
    use shared_types::{PolicyGrant, PolicyTier};

    const OPERATIONAL: [u8; 20] = [0x0a; 20];

    fn create_test_node() -> BridgeNode {
        let mut config = BridgeConfig::for_testing();
        config.policy.push(PolicyGrant {
            address: OPERATIONAL,
            tier: PolicyTier::Operational,
        });
        let genesis = Genesis {
            registry: RegistryGenesis {
                observers: vec![Observer::new([1u8; 20], [11u8; 20])],
                chain_params: vec![ChainParams::supported(1)],
                ..Default::default()
            },
            ..Default::default()
        };
        BridgeNode::new(&config, &genesis).unwrap()
    }

    fn enable_verification() -> BridgeMsg {
        BridgeMsg::UpdateVerificationFlags {
            signer: OPERATIONAL,
            flags: VerificationFlags::all_enabled(),
        }
    }

    #[test]
    fn test_genesis_commits_at_zero() {
        let node = create_test_node();
        assert_eq!(node.height(), 0);
        assert_eq!(node.query().observer_set().unwrap().len(), 1);
    }

    #[test]
    fn test_block_swaps_snapshot() {
        let node = create_test_node();
        let before = node.query();

        let result = node.execute_block(&[enable_verification()], 1_700_000_000);
        assert_eq!(result.height, 1);
        assert_eq!(result.applied(), 1);

        assert_eq!(before.verification_flags().unwrap(), VerificationFlags::default());
        assert_eq!(node.query().verification_flags().unwrap(), VerificationFlags::all_enabled());
        assert_eq!(node.query().height(), 1);
    }

    #[test]
    fn test_failed_message_does_not_abort_block() {
        let node = create_test_node();
        let bad = BridgeMsg::UpdateVerificationFlags {
            signer: [0x55; 20],
            flags: VerificationFlags::all_enabled(),
        };
        let result = node.execute_block(&[bad, enable_verification()], 1_700_000_000);
        assert_eq!(result.applied(), 1);
        assert!(result.results[0].is_err());
        assert_eq!(node.height(), 1);
    }

    #[test]
    fn test_concurrent_readers_see_committed_state() {
        let node = Arc::new(create_test_node());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let node = node.clone();
                std::thread::spawn(move || {
                    let query = node.query();
                    let flags = query.verification_flags().unwrap();
                    (query.height(), flags)
                })
            })
            .collect();
        node.execute_block(&[enable_verification()], 1_700_000_000);

        for handle in handles {
            let (height, flags) = handle.join().unwrap();
            match height {
                0 => assert_eq!(flags, VerificationFlags::default()),
                1 => assert_eq!(flags, VerificationFlags::all_enabled()),
                other => panic!("unexpected height {other}"),
            }
        }
    }
}
