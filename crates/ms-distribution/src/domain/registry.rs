//! # Chain Support Resolver
//!
//! Single source of truth mapping a chain id to its display name, RPC endpoint
//! and (when deployed) payout contract and settlement asset.

use super::errors::Address;
use super::value_objects::{ChainId, NativeCurrency};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static metadata for a chain the platform knows about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownChain {
    /// Chain identifier.
    pub chain_id: ChainId,
    /// Human-readable name.
    pub display_name: String,
    /// Public RPC endpoint.
    pub rpc_endpoint: String,
    /// Gas currency, for wallet registration.
    pub native_currency: NativeCurrency,
    /// Block explorer, for wallet registration.
    pub explorer_url: Option<String>,
}

/// Payout contract and settlement asset deployed on one chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutDeployment {
    /// Batch payout contract.
    pub payout_contract: Address,
    /// Settlement asset (USDC) on this chain.
    pub settlement_asset: Address,
}

/// Resolved view of a chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainInfo {
    /// Chain identifier.
    pub chain_id: ChainId,
    /// Display name, `"Chain {id}"` when unknown.
    pub display_name: String,
    /// RPC endpoint when known.
    pub rpc_endpoint: Option<String>,
    /// Known-chain metadata when known.
    pub known: Option<KnownChain>,
    /// Payout deployment when supported.
    pub deployment: Option<PayoutDeployment>,
}

impl ChainInfo {
    /// A chain is supported iff it has a payout contract.
    pub fn is_supported(&self) -> bool {
        self.deployment.is_some()
    }

    /// Payout contract address.
    pub fn payout_contract(&self) -> Option<Address> {
        self.deployment.map(|d| d.payout_contract)
    }

    /// Settlement asset address.
    pub fn settlement_asset(&self) -> Option<Address> {
        self.deployment.map(|d| d.settlement_asset)
    }
}

/// Registry of known chains and payout deployments.
#[derive(Clone, Debug, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<ChainId, KnownChain>,
    deployments: BTreeMap<ChainId, PayoutDeployment>,
}

impl ChainRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with well-known EVM chains and no deployments.
    pub fn with_known_chains() -> Self {
        let mut registry = Self::new();
        for chain in builtin_chains() {
            registry.register_chain(chain);
        }
        registry
    }

    /// Add or replace a known chain.
    pub fn register_chain(&mut self, chain: KnownChain) {
        self.chains.insert(chain.chain_id, chain);
    }

    /// Add or replace a payout deployment.
    pub fn register_deployment(&mut self, chain_id: ChainId, deployment: PayoutDeployment) {
        self.deployments.insert(chain_id, deployment);
    }

    /// Known-chain metadata.
    pub fn known_chain(&self, chain_id: ChainId) -> Option<&KnownChain> {
        self.chains.get(&chain_id)
    }

    /// Resolve a chain id. Unknown chains get a placeholder name and are
    /// never supported, even if a deployment was registered for them.
    pub fn resolve(&self, chain_id: ChainId) -> ChainInfo {
        match self.chains.get(&chain_id) {
            Some(known) => ChainInfo {
                chain_id,
                display_name: known.display_name.clone(),
                rpc_endpoint: Some(known.rpc_endpoint.clone()),
                known: Some(known.clone()),
                deployment: self.deployments.get(&chain_id).copied(),
            },
            None => ChainInfo {
                chain_id,
                display_name: format!("Chain {}", chain_id),
                rpc_endpoint: None,
                known: None,
                deployment: None,
            },
        }
    }

    /// Check if a chain has a payout deployment.
    pub fn is_supported(&self, chain_id: ChainId) -> bool {
        self.resolve(chain_id).is_supported()
    }

    /// Display name for a chain.
    pub fn display_name(&self, chain_id: ChainId) -> String {
        self.resolve(chain_id).display_name
    }

    /// All supported chain ids.
    pub fn supported_chains(&self) -> Vec<ChainId> {
        self.deployments
            .keys()
            .filter(|id| self.chains.contains_key(id))
            .copied()
            .collect()
    }
}

fn known(
    chain_id: ChainId,
    name: &str,
    rpc: &str,
    currency: NativeCurrency,
    explorer: &str,
) -> KnownChain {
    KnownChain {
        chain_id,
        display_name: name.to_string(),
        rpc_endpoint: rpc.to_string(),
        native_currency: currency,
        explorer_url: Some(explorer.to_string()),
    }
}

/// Well-known EVM chains.
pub fn builtin_chains() -> Vec<KnownChain> {
    vec![
        known(
            ChainId::ETHEREUM,
            "Ethereum",
            "https://ethereum-rpc.publicnode.com",
            NativeCurrency::ether(),
            "https://etherscan.io",
        ),
        known(
            ChainId::OPTIMISM,
            "Optimism",
            "https://mainnet.optimism.io",
            NativeCurrency::ether(),
            "https://optimistic.etherscan.io",
        ),
        known(
            ChainId::POLYGON,
            "Polygon",
            "https://polygon-rpc.com",
            NativeCurrency::new("POL", "POL", 18),
            "https://polygonscan.com",
        ),
        known(
            ChainId::BASE,
            "Base",
            "https://mainnet.base.org",
            NativeCurrency::ether(),
            "https://basescan.org",
        ),
        known(
            ChainId::ARBITRUM,
            "Arbitrum One",
            "https://arb1.arbitrum.io/rpc",
            NativeCurrency::ether(),
            "https://arbiscan.io",
        ),
        known(
            ChainId::AVALANCHE,
            "Avalanche C-Chain",
            "https://api.avax.network/ext/bc/C/rpc",
            NativeCurrency::new("Avalanche", "AVAX", 18),
            "https://snowtrace.io",
        ),
        known(
            ChainId::SEPOLIA,
            "Sepolia",
            "https://rpc.sepolia.org",
            NativeCurrency::new("Sepolia Ether", "ETH", 18),
            "https://sepolia.etherscan.io",
        ),
        known(
            ChainId::BASE_SEPOLIA,
            "Base Sepolia",
            "https://sepolia.base.org",
            NativeCurrency::new("Sepolia Ether", "ETH", 18),
            "https://sepolia.basescan.org",
        ),
        known(
            ChainId::ARBITRUM_SEPOLIA,
            "Arbitrum Sepolia",
            "https://sepolia-rollup.arbitrum.io/rpc",
            NativeCurrency::new("Sepolia Ether", "ETH", 18),
            "https://sepolia.arbiscan.io",
        ),
    ]
}
