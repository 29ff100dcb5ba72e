//! # Chain Registry
//!
//! Static metadata about every chain the bridge knows: its identifier, a
//! human-readable name and the family that selects header and proof
//! decoding. Built once at start-up and passed by reference.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ChainId, ChainRegistryError};

/// Chain family. Drives header/proof dispatch and verification flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainFamily {
    /// Ethereum-compatible chain (RLP headers, Merkle-Patricia proofs).
    Evm,
    /// Bitcoin-like chain (80-byte headers, double-SHA256 merkle proofs).
    Bitcoin,
    /// The bridge chain itself.
    Home,
}

impl ChainFamily {
    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "evm",
            ChainFamily::Bitcoin => "bitcoin",
            ChainFamily::Home => "home",
        }
    }
}

/// A chain known to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Chain identifier.
    pub id: ChainId,
    /// Human-readable name.
    pub name: String,
    /// Chain family.
    pub family: ChainFamily,
}

impl Chain {
    /// Create a chain entry.
    pub fn new(id: ChainId, name: impl Into<String>, family: ChainFamily) -> Self {
        Self {
            id,
            name: name.into(),
            family,
        }
    }

    /// True for chains observed by the bridge (not the home chain).
    pub fn is_external(&self) -> bool {
        self.family != ChainFamily::Home
    }
}

/// Registry of known chains, keyed by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Chain>", into = "Vec<Chain>")]
pub struct ChainRegistry {
    chains: BTreeMap<ChainId, Chain>,
}

impl ChainRegistry {
    /// Build a registry, rejecting duplicate ids and more than one home chain.
    pub fn new(chains: impl IntoIterator<Item = Chain>) -> Result<Self, ChainRegistryError> {
        let mut map = BTreeMap::new();
        let mut home: Option<ChainId> = None;
        for chain in chains {
            if chain.family == ChainFamily::Home {
                if let Some(existing) = home {
                    return Err(ChainRegistryError::MultipleHomeChains(existing, chain.id));
                }
                home = Some(chain.id);
            }
            if map.contains_key(&chain.id) {
                return Err(ChainRegistryError::DuplicateChain(chain.id));
            }
            map.insert(chain.id, chain);
        }
        Ok(Self { chains: map })
    }

    /// Registry with the chains used across the test suites.
    ///
    /// | id | name | family |
    /// |----|------|--------|
    /// | 1 | eth_mainnet | Evm |
    /// | 97 | bsc_testnet | Evm |
    /// | 18444 | btc_regtest | Bitcoin |
    /// | 7000 | concord | Home |
    pub fn for_testing() -> Self {
        let mut chains = BTreeMap::new();
        for chain in [
            Chain::new(1, "eth_mainnet", ChainFamily::Evm),
            Chain::new(97, "bsc_testnet", ChainFamily::Evm),
            Chain::new(18444, "btc_regtest", ChainFamily::Bitcoin),
            Chain::new(7000, "concord", ChainFamily::Home),
        ] {
            chains.insert(chain.id, chain);
        }
        Self { chains }
    }

    /// Look up a chain.
    pub fn get(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(&id)
    }

    /// Family of a chain, if known.
    pub fn family(&self, id: ChainId) -> Option<ChainFamily> {
        self.chains.get(&id).map(|c| c.family)
    }

    /// True if the chain is known and is not the home chain.
    pub fn is_external(&self, id: ChainId) -> bool {
        self.get(id).map(Chain::is_external).unwrap_or(false)
    }

    /// The home chain, if configured.
    pub fn home_chain(&self) -> Option<&Chain> {
        self.chains.values().find(|c| c.family == ChainFamily::Home)
    }

    /// All chains in id order.
    pub fn chains(&self) -> impl Iterator<Item = &Chain> {
        self.chains.values()
    }

    /// External chains in id order.
    pub fn external_chains(&self) -> impl Iterator<Item = &Chain> {
        self.chains.values().filter(|c| c.is_external())
    }

    /// Number of registered chains.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// True if no chain is registered.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

impl TryFrom<Vec<Chain>> for ChainRegistry {
    type Error = ChainRegistryError;

    fn try_from(chains: Vec<Chain>) -> Result<Self, Self::Error> {
        Self::new(chains)
    }
}

impl From<ChainRegistry> for Vec<Chain> {
    fn from(registry: ChainRegistry) -> Self {
        registry.chains.into_values().collect()
    }
}
