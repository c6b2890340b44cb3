//! # Domain Value Objects
//!
//! Immutable value types for profit distribution.

use serde::{Deserialize, Serialize};
use std::fmt;

/// EVM chain identifier (EIP-155).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Ethereum mainnet.
    pub const ETHEREUM: ChainId = ChainId(1);
    /// Optimism.
    pub const OPTIMISM: ChainId = ChainId(10);
    /// Polygon PoS.
    pub const POLYGON: ChainId = ChainId(137);
    /// Base.
    pub const BASE: ChainId = ChainId(8453);
    /// Arbitrum One.
    pub const ARBITRUM: ChainId = ChainId(42161);
    /// Avalanche C-Chain.
    pub const AVALANCHE: ChainId = ChainId(43114);
    /// Sepolia testnet.
    pub const SEPOLIA: ChainId = ChainId(11_155_111);
    /// Base Sepolia testnet.
    pub const BASE_SEPOLIA: ChainId = ChainId(84532);
    /// Arbitrum Sepolia testnet.
    pub const ARBITRUM_SEPOLIA: ChainId = ChainId(421_614);

    /// Raw numeric id.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Wallet representation: `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{:x}", self.0)
    }

    /// Parse a wallet hex id (`0x2105`).
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
        u64::from_str_radix(digits, 16).ok().map(ChainId)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        ChainId(id)
    }
}

/// Native gas currency metadata, as wallets expect it when registering a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Currency name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Decimal places.
    pub decimals: u8,
}

impl NativeCurrency {
    /// Create a new currency descriptor.
    pub fn new(name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
        }
    }

    /// Ether with 18 decimals.
    pub fn ether() -> Self {
        Self::new("Ether", "ETH", 18)
    }
}

/// Distribution session phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for the operator to enter an amount.
    #[default]
    AmountEntry,
    /// Snapshot fetched and allocated; per-chain breakdown available.
    Breakdown,
    /// Treasury funds being bridged to destination chains.
    Bridging,
    /// Per-chain payouts may be executed.
    Payout,
}

impl Phase {
    /// Check if a forward transition is valid. Cancel is handled separately.
    pub fn can_transition_to(&self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Self::AmountEntry, Self::Breakdown)
                | (Self::Breakdown, Self::Bridging)
                | (Self::Breakdown, Self::Payout) // pre-funded, skip bridging
                | (Self::Bridging, Self::Payout)
        )
    }
}

/// Per-chain bridge status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BridgeStatus {
    /// Not yet attempted.
    #[default]
    Pending,
    /// Transfer submitted, awaiting the bridge receipt.
    Bridging,
    /// Funds available on the destination chain.
    Complete,
    /// Bridge call failed.
    Error,
}

impl BridgeStatus {
    /// Check if transition is valid.
    ///
    /// `Pending -> Complete` covers chains that need no transfer (the
    /// settlement chain, zero totals); `Error -> Bridging` is an operator retry.
    pub fn can_transition_to(&self, next: BridgeStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Bridging)
                | (Self::Pending, Self::Complete)
                | (Self::Bridging, Self::Complete)
                | (Self::Bridging, Self::Error)
                | (Self::Error, Self::Bridging)
        )
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}
