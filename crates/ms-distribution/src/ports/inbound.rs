//! # Inbound Ports
//!
//! API trait defining what the distribution orchestrator can do.

use crate::domain::{
    Amount, BridgeStatus, BridgeSummary, CancelOutcome, ChainId, ChainPayoutOutcome,
    DistributionError, DistributionRun, Phase,
};
use async_trait::async_trait;

/// Distribution API - inbound port.
///
/// Per-chain bridge and payout failures are reported as values
/// (`BridgeStatus::Error`, `ChainPayoutOutcome::Failed`); `Err` is reserved
/// for run-level failures and guard violations.
#[async_trait]
pub trait DistributionApi: Send + Sync {
    /// Fetch the snapshot and allocate (`AmountEntry -> Breakdown`).
    async fn prepare(
        &self,
        project_id: &str,
        total_amount: Amount,
    ) -> Result<DistributionRun, DistributionError>;

    /// Chains preventing the bridge step.
    fn blocking_chains(&self) -> Vec<ChainId>;

    /// Check if `Breakdown -> Bridging` is currently permitted.
    fn can_bridge(&self) -> bool;

    /// Bridge every chain sequentially, then enter `Payout`.
    async fn bridge_all(&self) -> Result<BridgeSummary, DistributionError>;

    /// Retry bridging one chain whose previous attempt failed.
    async fn retry_bridge(&self, chain: ChainId) -> Result<BridgeStatus, DistributionError>;

    /// Operator pre-funded every chain (`Breakdown -> Payout`).
    fn skip_bridging(&self) -> Result<(), DistributionError>;

    /// Pay out one chain.
    async fn payout_chain(&self, chain: ChainId) -> Result<ChainPayoutOutcome, DistributionError>;

    /// Pay out every chain in allocation order, one at a time.
    async fn auto_distribute(
        &self,
    ) -> Result<Vec<(ChainId, ChainPayoutOutcome)>, DistributionError>;

    /// Abandon the run, between chains.
    fn cancel(&self) -> CancelOutcome;

    /// Current run snapshot.
    fn run(&self) -> Option<DistributionRun>;

    /// Current phase.
    fn phase(&self) -> Phase;
}
