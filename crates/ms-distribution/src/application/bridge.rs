//! Bridge Orchestrator
//!
//! Moves treasury funds from the settlement chain to every destination
//! chain, one chain at a time.

use crate::domain::{
    Address, BridgeStatus, BridgeSummary, ChainAllocation, ChainId, ChainRegistry,
    DistributionError,
};
use crate::ports::outbound::{BridgeClient, BridgeRequest};
use ms_telemetry::{metric_inc, BRIDGE_TRANSFERS};
use std::sync::Arc;
use tracing::{info, warn};

/// Receives every bridge status transition as it happens.
pub trait BridgeObserver: Send + Sync {
    /// A chain entered `status`. `detail` carries the failure message for
    /// `BridgeStatus::Error`.
    fn on_status(&self, chain_id: ChainId, status: BridgeStatus, detail: Option<&str>);

    /// Checked between chains; `true` stops the loop before the next chain.
    fn should_stop(&self) -> bool {
        false
    }
}

/// Sequential bridge loop over a run's allocations.
pub struct BridgeOrchestrator {
    client: Arc<dyn BridgeClient>,
    settlement_chain: ChainId,
}

impl BridgeOrchestrator {
    /// Create an orchestrator bridging out of `settlement_chain`.
    pub fn new(client: Arc<dyn BridgeClient>, settlement_chain: ChainId) -> Self {
        Self {
            client,
            settlement_chain,
        }
    }

    /// Chain holding the treasury.
    pub fn settlement_chain(&self) -> ChainId {
        self.settlement_chain
    }

    /// Chains that prevent bridging: unsupported allocations, plus the
    /// settlement chain when it has no deployment itself.
    pub fn blocking_chains(
        &self,
        allocations: &[ChainAllocation],
        registry: &ChainRegistry,
    ) -> Vec<ChainId> {
        let mut blocking: Vec<ChainId> = allocations
            .iter()
            .map(|a| a.chain_id)
            .filter(|chain| !registry.is_supported(*chain))
            .collect();
        if !registry.is_supported(self.settlement_chain) && !blocking.contains(&self.settlement_chain)
        {
            blocking.push(self.settlement_chain);
        }
        blocking
    }

    /// Check that bridging may start and return the settlement asset.
    pub fn preflight(
        &self,
        allocations: &[ChainAllocation],
        registry: &ChainRegistry,
    ) -> Result<Address, DistributionError> {
        let blocking = self.blocking_chains(allocations, registry);
        if !blocking.is_empty() {
            return Err(DistributionError::UnsupportedChain(blocking));
        }
        registry
            .resolve(self.settlement_chain)
            .settlement_asset()
            .ok_or_else(|| DistributionError::UnsupportedChain(vec![self.settlement_chain]))
    }

    /// Bridge every allocation in order. A failed chain does not stop the
    /// loop; only `observer.should_stop()` does.
    pub async fn bridge_all(
        &self,
        allocations: &[ChainAllocation],
        asset: Address,
        observer: &dyn BridgeObserver,
    ) -> BridgeSummary {
        let mut summary = BridgeSummary::default();

        for allocation in allocations {
            if observer.should_stop() {
                info!(next_chain = %allocation.chain_id, "Bridge loop stopped before next chain");
                summary.stopped_early = true;
                break;
            }
            let status = self.bridge_chain(allocation, asset, observer).await;
            summary.statuses.push((allocation.chain_id, status));
        }

        info!(
            completed = summary.completed().len(),
            failed = summary.failed().len(),
            stopped_early = summary.stopped_early,
            "Bridge pass finished"
        );
        summary
    }

    /// Bridge one allocation. Also used for operator retries.
    pub async fn bridge_chain(
        &self,
        allocation: &ChainAllocation,
        asset: Address,
        observer: &dyn BridgeObserver,
    ) -> BridgeStatus {
        let chain_id = allocation.chain_id;

        // Funds already sit on the settlement chain; nothing to move for zero totals.
        if chain_id == self.settlement_chain || allocation.total_amount.is_zero() {
            observer.on_status(chain_id, BridgeStatus::Complete, None);
            metric_inc!(BRIDGE_TRANSFERS, &["skipped"]);
            return BridgeStatus::Complete;
        }

        observer.on_status(chain_id, BridgeStatus::Bridging, None);
        let request = BridgeRequest {
            source_chain: self.settlement_chain,
            destination_chain: chain_id,
            asset,
            amount: allocation.total_amount.to_string(),
        };

        match self.client.bridge(request).await {
            Ok(receipt) => {
                info!(
                    chain_id = %chain_id,
                    amount = %allocation.total_amount,
                    transfer_id = %receipt.transfer_id,
                    "Bridge transfer complete"
                );
                observer.on_status(chain_id, BridgeStatus::Complete, None);
                metric_inc!(BRIDGE_TRANSFERS, &["complete"]);
                BridgeStatus::Complete
            }
            Err(err) => {
                let message = err.to_string();
                warn!(chain_id = %chain_id, error = %message, "Bridge transfer failed");
                observer.on_status(chain_id, BridgeStatus::Error, Some(&message));
                metric_inc!(BRIDGE_TRANSFERS, &["error"]);
                BridgeStatus::Error
            }
        }
    }
}
