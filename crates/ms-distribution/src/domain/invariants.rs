//! # Domain Invariants
//!
//! Business rules checked by the allocator and the payout executor.

use super::entities::{ChainAllocation, DistributionBreakdown};
use super::errors::{Address, Amount, DistributionError};

/// Basis-point denominator (10000 bps = 100%).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Invariant: fee and net partition the gross amount exactly.
pub fn invariant_fee_conservation(breakdown: &DistributionBreakdown) -> bool {
    breakdown
        .fee_amount
        .checked_add(breakdown.net_distributable)
        .map(|sum| sum == breakdown.total_amount)
        .unwrap_or(false)
}

/// Invariant: chain total equals the sum of its member shares.
pub fn invariant_chain_total(allocation: &ChainAllocation) -> bool {
    let mut sum = Amount::zero();
    for holder in &allocation.holders {
        match sum.checked_add(holder.profit_share) {
            Some(next) => sum = next,
            None => return false,
        }
    }
    sum == allocation.total_amount
}

/// Invariant: allocated total never exceeds the net amount, and the
/// floor-division dust stays below one unit per holder.
pub fn invariant_dust_bound(breakdown: &DistributionBreakdown) -> bool {
    let allocated = breakdown.allocated_total();
    if allocated > breakdown.net_distributable {
        return false;
    }
    let dust = breakdown.net_distributable - allocated;
    let holders = breakdown.holder_count() as u64;
    holders == 0 || dust < Amount::from(holders)
}

/// Invariant: every holder is grouped under its own origin chain.
pub fn invariant_grouping(breakdown: &DistributionBreakdown) -> bool {
    breakdown.chains.iter().all(|chain| {
        chain
            .holders
            .iter()
            .all(|h| h.origin_chain_id == chain.chain_id)
    })
}

/// Invariant: batch arrays match the allocation one-to-one.
pub fn invariant_batch_lengths(
    recipients: &[Address],
    amounts: &[Amount],
    allocation: &ChainAllocation,
) -> Result<(), DistributionError> {
    let holders = allocation.holders.len();
    if recipients.len() != holders || amounts.len() != holders {
        return Err(DistributionError::BatchLengthMismatch {
            recipients: recipients.len(),
            amounts: amounts.len(),
            holders,
        });
    }
    Ok(())
}
