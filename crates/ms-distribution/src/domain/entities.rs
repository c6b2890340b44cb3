//! # Domain Entities
//!
//! Holder snapshots, per-chain allocations and the distribution run.

use super::errors::{Address, Amount, DistributionError, TxHash};
use super::value_objects::{BridgeStatus, ChainId, Phase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One holder's position in a project vault, as indexed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderRecord {
    /// Holder account.
    pub account_address: Address,
    /// Chain the holder deposited from.
    pub origin_chain_id: ChainId,
    /// Share-token balance.
    pub balance: Amount,
}

impl HolderRecord {
    /// Create a new record.
    pub fn new(account_address: Address, origin_chain_id: ChainId, balance: Amount) -> Self {
        Self {
            account_address,
            origin_chain_id,
            balance,
        }
    }
}

/// A holder's computed profit share.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderShare {
    /// Recipient account.
    pub account_address: Address,
    /// Chain the payout lands on.
    pub origin_chain_id: ChainId,
    /// Amount in settlement-asset units.
    pub profit_share: Amount,
}

/// All holder shares destined for one chain.
///
/// `total_amount` is the sum of the member shares; it is only ever set by
/// [`ChainAllocation::new`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAllocation {
    /// Destination chain.
    pub chain_id: ChainId,
    /// Human-readable chain name.
    pub chain_display_name: String,
    /// Sum of `holders[*].profit_share`.
    pub total_amount: Amount,
    /// Shares in snapshot order.
    pub holders: Vec<HolderShare>,
    /// Whether a payout deployment exists for the chain.
    pub is_supported: bool,
}

impl ChainAllocation {
    /// Build an allocation, summing the member shares.
    pub fn new(
        chain_id: ChainId,
        chain_display_name: String,
        is_supported: bool,
        holders: Vec<HolderShare>,
    ) -> Self {
        let total_amount = holders
            .iter()
            .fold(Amount::zero(), |acc, h| acc.saturating_add(h.profit_share));
        Self {
            chain_id,
            chain_display_name,
            total_amount,
            holders,
            is_supported,
        }
    }

    /// Recipients in holder order.
    pub fn recipients(&self) -> Vec<Address> {
        self.holders.iter().map(|h| h.account_address).collect()
    }

    /// Amounts in holder order.
    pub fn amounts(&self) -> Vec<Amount> {
        self.holders.iter().map(|h| h.profit_share).collect()
    }
}

/// Result of allocating one distribution amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionBreakdown {
    /// Gross amount entered by the operator.
    pub total_amount: Amount,
    /// Platform fee rate in basis points.
    pub fee_bps: u64,
    /// `floor(total_amount * fee_bps / 10000)`.
    pub fee_amount: Amount,
    /// `total_amount - fee_amount`.
    pub net_distributable: Amount,
    /// Per-chain allocations in first-appearance order.
    pub chains: Vec<ChainAllocation>,
}

impl DistributionBreakdown {
    /// Sum of all chain totals.
    pub fn allocated_total(&self) -> Amount {
        self.chains
            .iter()
            .fold(Amount::zero(), |acc, c| acc.saturating_add(c.total_amount))
    }

    /// Floor-division remainder left unallocated.
    pub fn dust(&self) -> Amount {
        self.net_distributable.saturating_sub(self.allocated_total())
    }

    /// Number of holder shares across all chains.
    pub fn holder_count(&self) -> usize {
        self.chains.iter().map(|c| c.holders.len()).sum()
    }

    /// Chains without a payout deployment.
    pub fn unsupported_chains(&self) -> Vec<ChainId> {
        self.chains
            .iter()
            .filter(|c| !c.is_supported)
            .map(|c| c.chain_id)
            .collect()
    }

    /// Get allocation for a chain.
    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainAllocation> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }
}

/// Outcome of one chain payout attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainPayoutOutcome {
    /// Batch confirmed.
    Succeeded {
        /// Batch transaction hash.
        tx_hash: TxHash,
        /// Recipients paid.
        recipients: usize,
        /// Amount paid.
        total: Amount,
    },
    /// A step failed; the chain may be retried.
    Failed {
        /// Human-readable failure.
        message: String,
    },
}

impl ChainPayoutOutcome {
    /// Check if the payout succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Result of one pass over all chains by the bridge orchestrator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSummary {
    /// Final status per attempted chain, in allocation order.
    pub statuses: Vec<(ChainId, BridgeStatus)>,
    /// Loop stopped before the last chain because of a cancel.
    pub stopped_early: bool,
}

impl BridgeSummary {
    /// Chains whose funds arrived.
    pub fn completed(&self) -> Vec<ChainId> {
        self.with_status(BridgeStatus::Complete)
    }

    /// Chains whose bridge call failed.
    pub fn failed(&self) -> Vec<ChainId> {
        self.with_status(BridgeStatus::Error)
    }

    fn with_status(&self, status: BridgeStatus) -> Vec<ChainId> {
        self.statuses
            .iter()
            .filter(|(_, s)| *s == status)
            .map(|(c, _)| *c)
            .collect()
    }
}

/// What `cancel` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelOutcome {
    /// Session reset to a fresh amount entry.
    Reset,
    /// A chain step is running; reset happens when it returns.
    Deferred,
}

/// One operator-initiated distribution session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DistributionRun {
    /// Correlation id for logs and events.
    pub run_id: Uuid,
    /// Project (vault) the snapshot was taken for.
    pub project_id: String,
    /// Current phase.
    pub phase: Phase,
    /// Fee, net amount and per-chain allocations.
    pub breakdown: DistributionBreakdown,
    /// Bridge progress per chain.
    pub bridge_status: BTreeMap<ChainId, BridgeStatus>,
    /// Last bridge failure message per chain.
    pub bridge_errors: BTreeMap<ChainId, String>,
    /// Payout in-flight flag per chain.
    pub payout_status: BTreeMap<ChainId, bool>,
    /// Last payout outcome per chain.
    pub payout_results: BTreeMap<ChainId, ChainPayoutOutcome>,
}

impl DistributionRun {
    /// Create a run in the breakdown phase.
    pub fn new(project_id: &str, breakdown: DistributionBreakdown) -> Self {
        let bridge_status = breakdown
            .chains
            .iter()
            .map(|c| (c.chain_id, BridgeStatus::Pending))
            .collect();
        let payout_status = breakdown.chains.iter().map(|c| (c.chain_id, false)).collect();
        Self {
            run_id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            phase: Phase::Breakdown,
            breakdown,
            bridge_status,
            bridge_errors: BTreeMap::new(),
            payout_status,
            payout_results: BTreeMap::new(),
        }
    }

    /// Gross distribution amount.
    pub fn total_amount(&self) -> Amount {
        self.breakdown.total_amount
    }

    /// Fee rate in basis points.
    pub fn fee_bps(&self) -> u64 {
        self.breakdown.fee_bps
    }

    /// Per-chain allocations.
    pub fn allocations(&self) -> &[ChainAllocation] {
        &self.breakdown.chains
    }

    /// Move to the next phase.
    pub fn advance(&mut self, next: Phase) -> Result<(), DistributionError> {
        if !self.phase.can_transition_to(next) {
            return Err(DistributionError::InvalidTransition {
                from: format!("{:?}", self.phase),
                to: format!("{:?}", next),
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Record a bridge status change.
    pub fn set_bridge_status(
        &mut self,
        chain_id: ChainId,
        next: BridgeStatus,
    ) -> Result<(), DistributionError> {
        let current = self
            .bridge_status
            .get(&chain_id)
            .copied()
            .ok_or(DistributionError::ChainNotInRun(chain_id))?;
        if !current.can_transition_to(next) {
            return Err(DistributionError::InvalidTransition {
                from: format!("{:?}", current),
                to: format!("{:?}", next),
            });
        }
        self.bridge_status.insert(chain_id, next);
        Ok(())
    }

    /// Bridge status for a chain.
    pub fn bridge_status_of(&self, chain_id: ChainId) -> Option<BridgeStatus> {
        self.bridge_status.get(&chain_id).copied()
    }

    /// Check if a payout is in flight for the chain.
    pub fn is_payout_in_flight(&self, chain_id: ChainId) -> bool {
        self.payout_status.get(&chain_id).copied().unwrap_or(false)
    }

    /// First chain with a payout in flight.
    pub fn in_flight_chain(&self) -> Option<ChainId> {
        self.payout_status
            .iter()
            .find(|(_, in_flight)| **in_flight)
            .map(|(chain, _)| *chain)
    }
}
