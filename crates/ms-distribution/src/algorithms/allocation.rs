//! # Proportional Allocator
//!
//! Splits a net distribution amount across holders pro rata to their
//! balances, then groups the shares by origin chain.
//!
//! All arithmetic is integer floor division. Products are widened to `U512`
//! so any `U256` balance and amount can be allocated. The remainder of each
//! floor ("dust") stays unallocated.

use crate::domain::{
    Amount, ChainAllocation, ChainId, ChainRegistry, DistributionBreakdown, DistributionError,
    HolderRecord, HolderShare, BPS_DENOMINATOR,
};
use primitive_types::U512;
use std::collections::HashMap;

/// `floor(a * b / denominator)` with a widened product. The caller
/// guarantees the quotient fits back into `U256`.
fn mul_div(a: Amount, b: Amount, denominator: Amount) -> Result<Amount, DistributionError> {
    let quotient = a.full_mul(b) / U512::from(denominator);
    Amount::try_from(quotient).map_err(|_| DistributionError::AmountOverflow)
}

/// Split a gross amount into `(fee, net)`.
pub fn compute_fee(total_amount: Amount, fee_bps: u64) -> Result<(Amount, Amount), DistributionError> {
    if fee_bps > BPS_DENOMINATOR {
        return Err(DistributionError::InvalidFee(fee_bps));
    }
    let fee = mul_div(
        total_amount,
        Amount::from(fee_bps),
        Amount::from(BPS_DENOMINATOR),
    )?;
    Ok((fee, total_amount - fee))
}

/// `floor(balance * net / total_balance)`. Never exceeds `net_distributable`
/// while `balance <= total_balance`.
pub fn proportional_share(
    balance: Amount,
    net_distributable: Amount,
    total_balance: Amount,
) -> Result<Amount, DistributionError> {
    if total_balance.is_zero() {
        return Err(DistributionError::EmptyPool);
    }
    mul_div(balance, net_distributable, total_balance)
}

/// Allocate `total_amount` (minus fee) across `holders`, grouped by chain.
///
/// Chains appear in order of first appearance in `holders`; holders keep
/// their snapshot order within each chain.
pub fn allocate(
    holders: &[HolderRecord],
    total_amount: Amount,
    fee_bps: u64,
    registry: &ChainRegistry,
) -> Result<DistributionBreakdown, DistributionError> {
    if total_amount.is_zero() {
        return Err(DistributionError::InvalidAmount);
    }

    let mut total_balance = Amount::zero();
    for holder in holders {
        total_balance = total_balance
            .checked_add(holder.balance)
            .ok_or(DistributionError::AmountOverflow)?;
    }
    if total_balance.is_zero() {
        return Err(DistributionError::EmptyPool);
    }

    let (fee_amount, net_distributable) = compute_fee(total_amount, fee_bps)?;

    let mut order: Vec<ChainId> = Vec::new();
    let mut grouped: HashMap<ChainId, Vec<HolderShare>> = HashMap::new();
    for holder in holders {
        let profit_share = proportional_share(holder.balance, net_distributable, total_balance)?;
        grouped
            .entry(holder.origin_chain_id)
            .or_insert_with(|| {
                order.push(holder.origin_chain_id);
                Vec::new()
            })
            .push(HolderShare {
                account_address: holder.account_address,
                origin_chain_id: holder.origin_chain_id,
                profit_share,
            });
    }

    let chains = order
        .into_iter()
        .map(|chain_id| {
            let info = registry.resolve(chain_id);
            let shares = grouped.remove(&chain_id).unwrap_or_default();
            ChainAllocation::new(chain_id, info.display_name.clone(), info.is_supported(), shares)
        })
        .collect();

    Ok(DistributionBreakdown {
        total_amount,
        fee_bps,
        fee_amount,
        net_distributable,
        chains,
    })
}
