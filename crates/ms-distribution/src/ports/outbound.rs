//! # Outbound Ports
//!
//! Traits for external collaborators: the holder snapshot indexer, the
//! bridge, the signing wallet and the on-chain payout contract.

use crate::domain::{Address, Amount, ChainId, DistributionError, HolderRecord, NativeCurrency, TxHash};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Snapshot
// =============================================================================

/// Snapshot query errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// Transport failure (HTTP, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Indexer returned GraphQL errors.
    #[error("Indexer error: {0}")]
    Indexer(String),

    /// Response did not match the expected shape.
    #[error("Malformed snapshot: {0}")]
    Malformed(String),
}

impl From<SnapshotError> for DistributionError {
    fn from(err: SnapshotError) -> Self {
        DistributionError::Snapshot(err.to_string())
    }
}

/// Balance snapshot source - outbound port.
///
/// Returns every holder of `project_id` with a positive balance, one record
/// per (project, holder).
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the holder snapshot for a project.
    async fn fetch_holders(&self, project_id: &str) -> Result<Vec<HolderRecord>, SnapshotError>;
}

// =============================================================================
// Bridge
// =============================================================================

/// Bridge transfer request. `amount` is a decimal string of smallest units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRequest {
    /// Chain funds leave from.
    pub source_chain: ChainId,
    /// Chain funds arrive on.
    pub destination_chain: ChainId,
    /// Asset on the source chain.
    pub asset: Address,
    /// Amount as a decimal string.
    pub amount: String,
}

/// Bridge confirmation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeReceipt {
    /// Bridge-specific transfer identifier.
    pub transfer_id: String,
    /// Source-chain transaction, when the bridge reports one.
    pub source_tx: Option<TxHash>,
}

/// Bridge errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// Bridge refused the transfer (route, liquidity, limits).
    #[error("Bridge rejected transfer: {0}")]
    Rejected(String),

    /// Transport or confirmation failure.
    #[error("Bridge transport error: {0}")]
    Transport(String),
}

/// Bridging primitive - outbound port. All-or-nothing per call.
#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Transfer `amount` of `asset` and wait for arrival.
    async fn bridge(&self, request: BridgeRequest) -> Result<BridgeReceipt, BridgeError>;
}

// =============================================================================
// Wallet
// =============================================================================

/// Chain registration request (`wallet_addEthereumChain` shape).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainRequest {
    /// Hex chain id.
    pub chain_id: String,
    /// Human-readable name.
    pub chain_name: String,
    /// RPC endpoints.
    pub rpc_urls: Vec<String>,
    /// Gas currency.
    pub native_currency: NativeCurrency,
    /// Block explorers.
    pub block_explorer_urls: Vec<String>,
}

/// Wallet errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Wallet does not know the chain (EIP-3326 code 4902).
    #[error("Unrecognized chain {0}")]
    UnrecognizedChain(String),

    /// User or wallet rejected the request.
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Wallet not reachable.
    #[error("Wallet unavailable: {0}")]
    Unavailable(String),
}

/// Signing wallet - outbound port.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Account that signs payouts and approvals.
    fn account(&self) -> Address;

    /// Chain the wallet is connected to.
    async fn active_chain(&self) -> Result<ChainId, WalletError>;

    /// Switch the active chain (`wallet_switchEthereumChain`).
    async fn switch_chain(&self, hex_chain_id: &str) -> Result<(), WalletError>;

    /// Register a chain with the wallet (`wallet_addEthereumChain`).
    async fn add_chain(&self, request: AddChainRequest) -> Result<(), WalletError>;
}

// =============================================================================
// Payout ledger
// =============================================================================

/// Transaction receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Inclusion block.
    pub block_number: u64,
    /// `status == 1`.
    pub success: bool,
}

/// `batchPayout(asset, recipients, amounts)` arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPayoutCall {
    /// Asset transferred.
    pub asset: Address,
    /// Recipients, index-aligned with `amounts`.
    pub recipients: Vec<Address>,
    /// Amounts, index-aligned with `recipients`.
    pub amounts: Vec<Amount>,
}

/// Ledger errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Call reverted; `data` is the raw revert payload.
    #[error("Execution reverted")]
    Reverted {
        /// Raw revert data.
        data: Vec<u8>,
    },

    /// RPC or signer failure.
    #[error("RPC error: {0}")]
    Rpc(String),
}

/// Settlement asset and payout contract access - outbound port.
///
/// Writes are signed by the wallet's account on its active chain.
#[async_trait]
pub trait PayoutLedger: Send + Sync {
    /// `asset.balanceOf(owner)`.
    async fn balance_of(
        &self,
        chain: ChainId,
        asset: Address,
        owner: Address,
    ) -> Result<Amount, LedgerError>;

    /// `asset.allowance(owner, spender)`.
    async fn allowance(
        &self,
        chain: ChainId,
        asset: Address,
        owner: Address,
        spender: Address,
    ) -> Result<Amount, LedgerError>;

    /// `asset.approve(spender, amount)`; `None` if no receipt was produced.
    async fn approve(
        &self,
        chain: ChainId,
        asset: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<Option<TxReceipt>, LedgerError>;

    /// `payout.batchPayout(...)`; `None` if no receipt was produced.
    async fn batch_payout(
        &self,
        chain: ChainId,
        payout_contract: Address,
        call: BatchPayoutCall,
    ) -> Result<Option<TxReceipt>, LedgerError>;
}
