//! Payout Executor
//!
//! Pays out one chain allocation with a single batch transaction:
//!
//! 1. Switch the wallet to the chain, registering it first if unknown
//! 2. Check the payer's settlement-asset balance
//! 3. Approve the payout contract if the allowance is short
//! 4. Submit `batchPayout(asset, recipients, amounts)`

use crate::algorithms::{describe_revert, GENERIC_REVERT_MESSAGE};
use crate::domain::{
    invariant_batch_lengths, Address, Amount, ChainAllocation, ChainId, ChainInfo,
    DistributionError, KnownChain, TxHash,
};
use crate::ports::outbound::{
    AddChainRequest, BatchPayoutCall, LedgerError, PayoutLedger, Wallet, WalletError,
};
use ms_telemetry::{metric_inc, HistogramTimer, CHAIN_PAYOUTS, HOLDERS_PAID, PAYOUT_DURATION};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Confirmed batch payout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutReceipt {
    /// Chain paid out.
    pub chain_id: ChainId,
    /// Batch transaction.
    pub tx_hash: TxHash,
    /// Approval submitted before the batch, if one was needed.
    pub approval_tx: Option<TxHash>,
    /// Recipients in the batch.
    pub recipients: usize,
    /// Sum transferred.
    pub total: Amount,
}

/// Wallet registration request for a known chain.
pub fn add_chain_request(chain: &KnownChain) -> AddChainRequest {
    AddChainRequest {
        chain_id: chain.chain_id.to_hex(),
        chain_name: chain.display_name.clone(),
        rpc_urls: vec![chain.rpc_endpoint.clone()],
        native_currency: chain.native_currency.clone(),
        block_explorer_urls: chain.explorer_url.iter().cloned().collect(),
    }
}

/// Executes per-chain batch payouts against the signer's wallet.
pub struct PayoutExecutor {
    wallet: Arc<dyn Wallet>,
    ledger: Arc<dyn PayoutLedger>,
}

impl PayoutExecutor {
    /// Create an executor.
    pub fn new(wallet: Arc<dyn Wallet>, ledger: Arc<dyn PayoutLedger>) -> Self {
        Self { wallet, ledger }
    }

    /// Pay every holder of `allocation`. Calling it again after success pays
    /// again; callers guard against double submission.
    pub async fn execute(
        &self,
        allocation: &ChainAllocation,
        chain: &ChainInfo,
    ) -> Result<PayoutReceipt, DistributionError> {
        let _timer = HistogramTimer::new(&PAYOUT_DURATION);
        info!(
            chain_id = %allocation.chain_id,
            holders = allocation.holders.len(),
            amount = %allocation.total_amount,
            "Starting chain payout"
        );

        let result = self.execute_steps(allocation, chain).await;
        match &result {
            Ok(receipt) => {
                metric_inc!(CHAIN_PAYOUTS, &["succeeded"]);
                HOLDERS_PAID.inc_by(receipt.recipients as f64);
                info!(
                    chain_id = %receipt.chain_id,
                    holders = receipt.recipients,
                    amount = %receipt.total,
                    tx_hash = ?receipt.tx_hash,
                    "Chain payout confirmed"
                );
            }
            Err(err) => {
                metric_inc!(CHAIN_PAYOUTS, &["failed"]);
                warn!(chain_id = %allocation.chain_id, error = %err, "Chain payout failed");
            }
        }
        result
    }

    async fn execute_steps(
        &self,
        allocation: &ChainAllocation,
        chain: &ChainInfo,
    ) -> Result<PayoutReceipt, DistributionError> {
        let chain_id = allocation.chain_id;
        let deployment = chain
            .deployment
            .ok_or_else(|| DistributionError::UnsupportedChain(vec![chain_id]))?;
        let asset = deployment.settlement_asset;
        let payout_contract = deployment.payout_contract;
        let need = allocation.total_amount;

        self.ensure_chain(chain).await?;
        let owner = self.wallet.account();

        let have = self
            .ledger
            .balance_of(chain_id, asset, owner)
            .await
            .map_err(|e| ledger_query(chain_id, e))?;
        debug!(chain_id = %chain_id, balance = %have, amount = %need, "Balance preflight");
        if have < need {
            return Err(DistributionError::InsufficientBalance {
                chain_id,
                have,
                need,
            });
        }

        let approval_tx = self
            .ensure_allowance(chain_id, asset, owner, payout_contract, need)
            .await?;

        let recipients = allocation.recipients();
        let amounts = allocation.amounts();
        invariant_batch_lengths(&recipients, &amounts, allocation)?;
        let count = recipients.len();

        let call = BatchPayoutCall {
            asset,
            recipients,
            amounts,
        };
        match self.ledger.batch_payout(chain_id, payout_contract, call).await {
            Ok(Some(receipt)) if receipt.success => Ok(PayoutReceipt {
                chain_id,
                tx_hash: receipt.tx_hash,
                approval_tx,
                recipients: count,
                total: need,
            }),
            Ok(Some(_)) => Err(DistributionError::PayoutReverted {
                chain_id,
                reason: GENERIC_REVERT_MESSAGE.to_string(),
            }),
            Ok(None) => Err(DistributionError::PayoutFailed {
                chain_id,
                reason: "no transaction receipt".to_string(),
            }),
            Err(LedgerError::Reverted { data }) => Err(DistributionError::PayoutReverted {
                chain_id,
                reason: describe_revert(&data),
            }),
            Err(LedgerError::Rpc(reason)) => {
                Err(DistributionError::PayoutFailed { chain_id, reason })
            }
        }
    }

    /// Switch the wallet to `chain`, registering the chain on 4902-style
    /// "unrecognized chain" errors.
    async fn ensure_chain(&self, chain: &ChainInfo) -> Result<(), DistributionError> {
        let chain_id = chain.chain_id;
        let switch_err = |e: WalletError| DistributionError::ChainSwitch {
            chain_id,
            reason: e.to_string(),
        };

        let active = self.wallet.active_chain().await.map_err(switch_err)?;
        if active == chain_id {
            return Ok(());
        }

        let hex_id = chain_id.to_hex();
        match self.wallet.switch_chain(&hex_id).await {
            Ok(()) => {}
            Err(WalletError::UnrecognizedChain(_)) => {
                let known = chain
                    .known
                    .as_ref()
                    .ok_or_else(|| DistributionError::ChainSwitch {
                        chain_id,
                        reason: "wallet does not know the chain and no RPC metadata is configured"
                            .to_string(),
                    })?;
                info!(chain_id = %chain_id, name = %known.display_name, "Registering chain with wallet");
                self.wallet
                    .add_chain(add_chain_request(known))
                    .await
                    .map_err(switch_err)?;
                self.wallet.switch_chain(&hex_id).await.map_err(switch_err)?;
            }
            Err(other) => return Err(switch_err(other)),
        }

        debug!(chain_id = %chain_id, from = %active, "Wallet switched chain");
        Ok(())
    }

    /// Approve `U256::MAX` when the allowance cannot cover `need`.
    async fn ensure_allowance(
        &self,
        chain_id: ChainId,
        asset: Address,
        owner: Address,
        spender: Address,
        need: Amount,
    ) -> Result<Option<TxHash>, DistributionError> {
        let allowance = self
            .ledger
            .allowance(chain_id, asset, owner, spender)
            .await
            .map_err(|e| ledger_query(chain_id, e))?;
        if allowance >= need {
            debug!(chain_id = %chain_id, allowance = %allowance, "Allowance sufficient, skipping approval");
            return Ok(None);
        }

        info!(chain_id = %chain_id, allowance = %allowance, amount = %need, "Approving payout contract");
        let receipt = self
            .ledger
            .approve(chain_id, asset, spender, Amount::MAX)
            .await
            .map_err(|e| DistributionError::ApprovalFailed {
                chain_id,
                reason: match e {
                    LedgerError::Reverted { data } => describe_revert(&data),
                    LedgerError::Rpc(reason) => reason,
                },
            })?;

        match receipt {
            Some(receipt) if receipt.success => Ok(Some(receipt.tx_hash)),
            Some(_) => Err(DistributionError::ApprovalFailed {
                chain_id,
                reason: GENERIC_REVERT_MESSAGE.to_string(),
            }),
            None => Err(DistributionError::ApprovalFailed {
                chain_id,
                reason: "no transaction receipt".to_string(),
            }),
        }
    }
}

fn ledger_query(chain_id: ChainId, err: LedgerError) -> DistributionError {
    DistributionError::LedgerQuery {
        chain_id,
        reason: err.to_string(),
    }
}
