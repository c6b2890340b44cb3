//! Configuration for the distribution orchestrator.

use crate::domain::{
    builtin_chains, Address, ChainId, ChainRegistry, DistributionError, KnownChain,
    NativeCurrency, PayoutDeployment, BPS_DENOMINATOR,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::path::Path;

/// One chain-registry entry, in the registry table's wire format.
///
/// For a built-in chain every field except `chainId` is optional and
/// overrides the built-in value. Other chains need `displayName` and
/// `rpcEndpoint`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Chain identifier.
    pub chain_id: ChainId,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// RPC endpoint.
    #[serde(default)]
    pub rpc_endpoint: Option<String>,
    /// Gas currency (defaults to Ether).
    #[serde(default)]
    pub native_currency: Option<NativeCurrency>,
    /// Block explorer.
    #[serde(default)]
    pub explorer_url: Option<String>,
    /// Batch payout contract.
    #[serde(default)]
    pub payout_contract_address: Option<Address>,
    /// Settlement asset (USDC).
    #[serde(default)]
    pub settlement_asset_address: Option<Address>,
}

/// Distribution configuration
///
/// The JSON document is camelCase throughout, matching `ChainConfig`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DistributionConfig {
    /// Chain holding the treasury; bridge transfers start here
    pub settlement_chain_id: ChainId,
    /// Platform fee in basis points (500 = 5%)
    pub fee_bps: u64,
    /// Holders requested per indexer page
    pub snapshot_page_size: usize,
    /// Deployments and chain overrides
    pub chains: Vec<ChainConfig>,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            settlement_chain_id: ChainId::BASE,
            fee_bps: 500,
            snapshot_page_size: 1000,
            chains: Vec::new(),
        }
    }
}

impl DistributionConfig {
    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, DistributionError> {
        serde_json::from_str(json).map_err(|e| DistributionError::Config(e.to_string()))
    }

    /// Load a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, DistributionError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| DistributionError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Create configuration from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `MS_DISTRIBUTION_CONFIG`: JSON config file (default: built-in defaults)
    /// - `MS_FEE_BPS`: Fee rate override
    /// - `MS_SETTLEMENT_CHAIN_ID`: Settlement chain override
    /// - `MS_SNAPSHOT_PAGE_SIZE`: Indexer page size override
    pub fn from_env() -> Result<Self, DistributionError> {
        let mut config = match env::var("MS_DISTRIBUTION_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MS_*` overrides from an arbitrary lookup.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), DistributionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, DistributionError> {
            value
                .trim()
                .parse()
                .map_err(|_| DistributionError::Config(format!("{key}: invalid value {value:?}")))
        }

        if let Some(value) = lookup("MS_FEE_BPS") {
            self.fee_bps = parse("MS_FEE_BPS", &value)?;
        }
        if let Some(value) = lookup("MS_SETTLEMENT_CHAIN_ID") {
            self.settlement_chain_id = ChainId(parse("MS_SETTLEMENT_CHAIN_ID", &value)?);
        }
        if let Some(value) = lookup("MS_SNAPSHOT_PAGE_SIZE") {
            self.snapshot_page_size = parse("MS_SNAPSHOT_PAGE_SIZE", &value)?;
        }
        Ok(())
    }

    /// Reject inconsistent settings.
    pub fn validate(&self) -> Result<(), DistributionError> {
        if self.fee_bps > BPS_DENOMINATOR {
            return Err(DistributionError::InvalidFee(self.fee_bps));
        }
        if self.snapshot_page_size == 0 {
            return Err(DistributionError::Config(
                "snapshotPageSize must be positive".to_string(),
            ));
        }

        let builtin: BTreeSet<ChainId> = builtin_chains().iter().map(|c| c.chain_id).collect();
        let mut seen = BTreeSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.chain_id) {
                return Err(DistributionError::Config(format!(
                    "chain {} configured twice",
                    chain.chain_id
                )));
            }
            if chain.payout_contract_address.is_some() != chain.settlement_asset_address.is_some()
            {
                return Err(DistributionError::Config(format!(
                    "chain {}: payoutContractAddress and settlementAssetAddress must be set together",
                    chain.chain_id
                )));
            }
            if !builtin.contains(&chain.chain_id)
                && (chain.display_name.is_none() || chain.rpc_endpoint.is_none())
            {
                return Err(DistributionError::Config(format!(
                    "chain {}: displayName and rpcEndpoint are required for non built-in chains",
                    chain.chain_id
                )));
            }
        }
        Ok(())
    }

    /// Build the chain support resolver: built-in chains merged with the
    /// configured entries.
    pub fn registry(&self) -> Result<ChainRegistry, DistributionError> {
        self.validate()?;
        let mut registry = ChainRegistry::with_known_chains();

        for entry in &self.chains {
            let base = registry.known_chain(entry.chain_id).cloned();
            let known = match base {
                Some(mut known) => {
                    if let Some(name) = &entry.display_name {
                        known.display_name = name.clone();
                    }
                    if let Some(rpc) = &entry.rpc_endpoint {
                        known.rpc_endpoint = rpc.clone();
                    }
                    if let Some(currency) = &entry.native_currency {
                        known.native_currency = currency.clone();
                    }
                    if entry.explorer_url.is_some() {
                        known.explorer_url = entry.explorer_url.clone();
                    }
                    known
                }
                None => KnownChain {
                    chain_id: entry.chain_id,
                    display_name: entry.display_name.clone().unwrap_or_default(),
                    rpc_endpoint: entry.rpc_endpoint.clone().unwrap_or_default(),
                    native_currency: entry
                        .native_currency
                        .clone()
                        .unwrap_or_else(NativeCurrency::ether),
                    explorer_url: entry.explorer_url.clone(),
                },
            };
            registry.register_chain(known);

            if let (Some(payout_contract), Some(settlement_asset)) =
                (entry.payout_contract_address, entry.settlement_asset_address)
            {
                registry.register_deployment(
                    entry.chain_id,
                    PayoutDeployment {
                        payout_contract,
                        settlement_asset,
                    },
                );
            }
        }

        Ok(registry)
    }
}
