//! # Domain Errors
//!
//! Error types for profit distribution.

use super::value_objects::{ChainId, Phase};
use primitive_types::{H160, H256, U256};
use thiserror::Error;
use uuid::Uuid;

/// Account or contract address (20-byte).
pub type Address = H160;

/// Settlement-asset amount in smallest units (6 decimals for USDC).
pub type Amount = U256;

/// Transaction hash (32-byte).
pub type TxHash = H256;

/// Settlement asset decimals.
pub const USDC_DECIMALS: u32 = 6;

/// Whole USDC to smallest units.
pub fn usdc(whole: u64) -> Amount {
    Amount::from(whole) * Amount::exp10(USDC_DECIMALS as usize)
}

fn join_chains(chains: &[ChainId]) -> String {
    chains
        .iter()
        .map(ChainId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Distribution error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DistributionError {
    /// Distribution amount is zero.
    #[error("Distribution amount must be greater than zero")]
    InvalidAmount,

    /// Fee rate above 100%.
    #[error("Invalid fee: {0} bps exceeds 10000")]
    InvalidFee(u64),

    /// Snapshot returned no holders.
    #[error("No holders found for project {0}")]
    NoHolders(String),

    /// Holders exist but their balances sum to zero.
    #[error("Empty pool: total holder balance is zero")]
    EmptyPool,

    /// Share computation exceeded 256 bits.
    #[error("Amount overflow while computing shares")]
    AmountOverflow,

    /// One or more chains have no payout deployment.
    #[error("Unsupported chain(s): {}", join_chains(.0))]
    UnsupportedChain(Vec<ChainId>),

    /// Wallet refused or failed to switch network.
    #[error("Failed to switch wallet to chain {chain_id}: {reason}")]
    ChainSwitch {
        /// Target chain
        chain_id: ChainId,
        /// Wallet message
        reason: String,
    },

    /// Payer cannot cover the chain total.
    #[error("Insufficient balance on chain {chain_id}: have {have}, need {need}")]
    InsufficientBalance {
        /// Chain checked
        chain_id: ChainId,
        /// Payer balance
        have: Amount,
        /// Chain total
        need: Amount,
    },

    /// Approval transaction produced no confirmation.
    #[error("Approval failed on chain {chain_id}: {reason}")]
    ApprovalFailed {
        /// Chain of the approval
        chain_id: ChainId,
        /// Reason
        reason: String,
    },

    /// Batch transaction produced no receipt.
    #[error("Payout failed on chain {chain_id}: {reason}")]
    PayoutFailed {
        /// Chain of the payout
        chain_id: ChainId,
        /// Reason
        reason: String,
    },

    /// Batch transaction reverted on chain.
    #[error("Payout reverted on chain {chain_id}: {reason}")]
    PayoutReverted {
        /// Chain of the payout
        chain_id: ChainId,
        /// Decoded revert reason
        reason: String,
    },

    /// Balance or allowance read failed.
    #[error("Ledger query failed on chain {chain_id}: {reason}")]
    LedgerQuery {
        /// Chain queried
        chain_id: ChainId,
        /// Reason
        reason: String,
    },

    /// Recipient and amount arrays disagree with the allocation.
    #[error("Batch length mismatch: {recipients} recipients, {amounts} amounts, {holders} holders")]
    BatchLengthMismatch {
        /// Recipient count
        recipients: usize,
        /// Amount count
        amounts: usize,
        /// Holders in the allocation
        holders: usize,
    },

    /// Bridge primitive failed for a chain.
    #[error("Bridge to chain {chain_id} failed: {reason}")]
    BridgeFailed {
        /// Destination chain
        chain_id: ChainId,
        /// Reason
        reason: String,
    },

    /// Snapshot query failed.
    #[error("Snapshot query failed: {0}")]
    Snapshot(String),

    /// Invalid phase or status transition.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Attempted state
        to: String,
    },

    /// Operation not available in the current phase.
    #[error("Operation requires phase {expected:?}, session is in {actual:?}")]
    WrongPhase {
        /// Phase the operation needs
        expected: Phase,
        /// Current phase
        actual: Phase,
    },

    /// Run was cancelled while the operation was running.
    #[error("Distribution run cancelled")]
    Cancelled,

    /// A run already exists in this session.
    #[error("A distribution run is already active (run {0})")]
    RunInProgress(Uuid),

    /// No run has been prepared.
    #[error("No active distribution run")]
    NoActiveRun,

    /// Chain has no allocation in the active run.
    #[error("Chain {0} is not part of this distribution")]
    ChainNotInRun(ChainId),

    /// A payout for this chain is already submitted.
    #[error("Payout already in flight on chain {0}")]
    PayoutInFlight(ChainId),

    /// Auto-distribute loop already running.
    #[error("Auto-distribute already running")]
    AutoDistributeRunning,

    /// Another bridge or payout step holds the signer.
    #[error("Another chain operation is in progress")]
    OperationInProgress,

    /// Bad configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DistributionError {
    /// Chain the error belongs to, for per-chain failures.
    pub fn chain_id(&self) -> Option<ChainId> {
        match self {
            Self::ChainSwitch { chain_id, .. }
            | Self::InsufficientBalance { chain_id, .. }
            | Self::ApprovalFailed { chain_id, .. }
            | Self::PayoutFailed { chain_id, .. }
            | Self::PayoutReverted { chain_id, .. }
            | Self::LedgerQuery { chain_id, .. }
            | Self::BridgeFailed { chain_id, .. } => Some(*chain_id),
            Self::ChainNotInRun(chain_id) | Self::PayoutInFlight(chain_id) => Some(*chain_id),
            _ => None,
        }
    }
}
