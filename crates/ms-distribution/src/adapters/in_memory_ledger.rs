//! In-Memory Ledger Adapter
//!
//! A single simulated account across several chains. Implements `Wallet`,
//! `PayoutLedger` and `BridgeClient` so a whole run can be driven without
//! RPC access. Failures can be injected per chain.

use crate::algorithms::encode_revert_reason;
use crate::domain::{Address, Amount, ChainId, TxHash};
use crate::ports::outbound::{
    AddChainRequest, BatchPayoutCall, BridgeClient, BridgeError, BridgeReceipt, BridgeRequest,
    LedgerError, PayoutLedger, TxReceipt, Wallet, WalletError,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

type BalanceKey = (ChainId, Address, Address);
type AllowanceKey = (ChainId, Address, Address, Address);

/// Approval recorded by the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApprovalRecord {
    /// Chain of the approval.
    pub chain_id: ChainId,
    /// Asset approved.
    pub asset: Address,
    /// Approved spender.
    pub spender: Address,
    /// Approved amount.
    pub amount: Amount,
}

/// Batch payout recorded by the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayoutRecord {
    /// Chain of the payout.
    pub chain_id: ChainId,
    /// Payout contract called.
    pub payout_contract: Address,
    /// Call arguments.
    pub call: BatchPayoutCall,
}

#[derive(Default)]
struct LedgerState {
    account: Address,
    active_chain: ChainId,
    wallet_chains: BTreeSet<ChainId>,
    balances: HashMap<BalanceKey, Amount>,
    allowances: HashMap<AllowanceKey, Amount>,
    assets: HashMap<ChainId, Address>,

    // Failure injection
    rejected_switches: BTreeSet<ChainId>,
    failing_bridges: HashMap<ChainId, String>,
    approvals_without_receipt: BTreeSet<ChainId>,
    payouts_without_receipt: BTreeSet<ChainId>,
    payout_reverts: HashMap<ChainId, Vec<u8>>,

    // Call log
    switch_requests: Vec<String>,
    added_chains: Vec<AddChainRequest>,
    bridge_requests: Vec<BridgeRequest>,
    approvals: Vec<ApprovalRecord>,
    payouts: Vec<PayoutRecord>,

    nonce: u64,
}

impl LedgerState {
    fn next_receipt(&mut self) -> TxReceipt {
        self.nonce += 1;
        TxReceipt {
            tx_hash: TxHash::from_low_u64_be(self.nonce),
            block_number: 1_000 + self.nonce,
            success: true,
        }
    }

    fn balance(&self, chain: ChainId, asset: Address, owner: Address) -> Amount {
        self.balances
            .get(&(chain, asset, owner))
            .copied()
            .unwrap_or_default()
    }

    fn credit(&mut self, chain: ChainId, asset: Address, owner: Address, amount: Amount) {
        let entry = self.balances.entry((chain, asset, owner)).or_default();
        *entry = entry.saturating_add(amount);
    }

    fn require_active(&self, chain: ChainId) -> Result<(), LedgerError> {
        if self.active_chain != chain {
            return Err(LedgerError::Rpc(format!(
                "signer connected to chain {}, transaction targets chain {}",
                self.active_chain, chain
            )));
        }
        Ok(())
    }
}

/// Simulated account, wallet and bridge.
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    /// Create a ledger whose wallet knows and is connected to `active_chain`.
    pub fn new(account: Address, active_chain: ChainId) -> Self {
        let mut wallet_chains = BTreeSet::new();
        wallet_chains.insert(active_chain);
        Self {
            state: RwLock::new(LedgerState {
                account,
                active_chain,
                wallet_chains,
                ..Default::default()
            }),
        }
    }

    /// Make the wallet aware of a chain so switching succeeds directly.
    pub fn add_wallet_chain(&self, chain: ChainId) {
        self.state.write().wallet_chains.insert(chain);
    }

    /// Settlement asset on a chain; bridge transfers credit it.
    pub fn register_asset(&self, chain: ChainId, asset: Address) {
        self.state.write().assets.insert(chain, asset);
    }

    /// Set a balance.
    pub fn set_balance(&self, chain: ChainId, asset: Address, owner: Address, amount: Amount) {
        self.state.write().balances.insert((chain, asset, owner), amount);
    }

    /// Read a balance.
    pub fn balance(&self, chain: ChainId, asset: Address, owner: Address) -> Amount {
        self.state.read().balance(chain, asset, owner)
    }

    /// Set an allowance granted by `owner`.
    pub fn set_allowance(
        &self,
        chain: ChainId,
        asset: Address,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) {
        self.state
            .write()
            .allowances
            .insert((chain, asset, owner, spender), amount);
    }

    /// The wallet refuses to switch to (or register) `chain`.
    pub fn reject_switch(&self, chain: ChainId) {
        self.state.write().rejected_switches.insert(chain);
    }

    /// Bridge transfers to `destination` fail with `reason`.
    pub fn fail_bridge(&self, destination: ChainId, reason: &str) {
        self.state
            .write()
            .failing_bridges
            .insert(destination, reason.to_string());
    }

    /// Bridge transfers to `destination` succeed again.
    pub fn heal_bridge(&self, destination: ChainId) {
        self.state.write().failing_bridges.remove(&destination);
    }

    /// Approvals on `chain` return no receipt.
    pub fn drop_approval_receipts(&self, chain: ChainId) {
        self.state.write().approvals_without_receipt.insert(chain);
    }

    /// Batch payouts on `chain` return no receipt.
    pub fn drop_payout_receipts(&self, chain: ChainId) {
        self.state.write().payouts_without_receipt.insert(chain);
    }

    /// Batch payouts on `chain` revert with `data`.
    pub fn revert_payouts(&self, chain: ChainId, data: Vec<u8>) {
        self.state.write().payout_reverts.insert(chain, data);
    }

    /// Chain the wallet is connected to.
    pub fn connected_chain(&self) -> ChainId {
        self.state.read().active_chain
    }

    /// Hex ids passed to `switch_chain`, in order.
    pub fn switch_requests(&self) -> Vec<String> {
        self.state.read().switch_requests.clone()
    }

    /// Chains registered through `add_chain`.
    pub fn added_chains(&self) -> Vec<AddChainRequest> {
        self.state.read().added_chains.clone()
    }

    /// Bridge requests received.
    pub fn bridge_requests(&self) -> Vec<BridgeRequest> {
        self.state.read().bridge_requests.clone()
    }

    /// Approvals submitted.
    pub fn approvals(&self) -> Vec<ApprovalRecord> {
        self.state.read().approvals.clone()
    }

    /// Batch payouts submitted.
    pub fn payouts(&self) -> Vec<PayoutRecord> {
        self.state.read().payouts.clone()
    }
}

fn parse_hex_chain(hex_chain_id: &str) -> Result<ChainId, WalletError> {
    ChainId::from_hex(hex_chain_id)
        .ok_or_else(|| WalletError::Rejected(format!("invalid chain id {hex_chain_id}")))
}

#[async_trait]
impl Wallet for InMemoryLedger {
    fn account(&self) -> Address {
        self.state.read().account
    }

    async fn active_chain(&self) -> Result<ChainId, WalletError> {
        Ok(self.state.read().active_chain)
    }

    async fn switch_chain(&self, hex_chain_id: &str) -> Result<(), WalletError> {
        let chain = parse_hex_chain(hex_chain_id)?;
        let mut state = self.state.write();
        state.switch_requests.push(hex_chain_id.to_string());

        if state.rejected_switches.contains(&chain) {
            return Err(WalletError::Rejected("User rejected the request".to_string()));
        }
        if !state.wallet_chains.contains(&chain) {
            return Err(WalletError::UnrecognizedChain(hex_chain_id.to_string()));
        }
        state.active_chain = chain;
        debug!(chain_id = %chain, "Wallet switched chain");
        Ok(())
    }

    async fn add_chain(&self, request: AddChainRequest) -> Result<(), WalletError> {
        let chain = parse_hex_chain(&request.chain_id)?;
        let mut state = self.state.write();
        state.added_chains.push(request);

        if state.rejected_switches.contains(&chain) {
            return Err(WalletError::Rejected("User rejected the request".to_string()));
        }
        state.wallet_chains.insert(chain);
        debug!(chain_id = %chain, "Wallet registered chain");
        Ok(())
    }
}

#[async_trait]
impl PayoutLedger for InMemoryLedger {
    async fn balance_of(
        &self,
        chain: ChainId,
        asset: Address,
        owner: Address,
    ) -> Result<Amount, LedgerError> {
        Ok(self.state.read().balance(chain, asset, owner))
    }

    async fn allowance(
        &self,
        chain: ChainId,
        asset: Address,
        owner: Address,
        spender: Address,
    ) -> Result<Amount, LedgerError> {
        Ok(self
            .state
            .read()
            .allowances
            .get(&(chain, asset, owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn approve(
        &self,
        chain: ChainId,
        asset: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<Option<TxReceipt>, LedgerError> {
        let mut state = self.state.write();
        state.require_active(chain)?;
        state.approvals.push(ApprovalRecord {
            chain_id: chain,
            asset,
            spender,
            amount,
        });

        if state.approvals_without_receipt.contains(&chain) {
            return Ok(None);
        }
        let owner = state.account;
        state
            .allowances
            .insert((chain, asset, owner, spender), amount);
        Ok(Some(state.next_receipt()))
    }

    async fn batch_payout(
        &self,
        chain: ChainId,
        payout_contract: Address,
        call: BatchPayoutCall,
    ) -> Result<Option<TxReceipt>, LedgerError> {
        let mut state = self.state.write();
        state.require_active(chain)?;
        state.payouts.push(PayoutRecord {
            chain_id: chain,
            payout_contract,
            call: call.clone(),
        });

        if state.payouts_without_receipt.contains(&chain) {
            return Ok(None);
        }
        if let Some(data) = state.payout_reverts.get(&chain) {
            return Err(LedgerError::Reverted { data: data.clone() });
        }
        if call.recipients.len() != call.amounts.len() {
            return Err(LedgerError::Reverted {
                data: encode_revert_reason("Length mismatch"),
            });
        }

        let mut total = Amount::zero();
        for amount in &call.amounts {
            total = total.checked_add(*amount).ok_or_else(|| LedgerError::Reverted {
                data: encode_revert_reason("Amount overflow"),
            })?;
        }

        let owner = state.account;
        let allowance_key = (chain, call.asset, owner, payout_contract);
        let allowance = state
            .allowances
            .get(&allowance_key)
            .copied()
            .unwrap_or_default();
        if allowance < total {
            return Err(LedgerError::Reverted {
                data: encode_revert_reason("ERC20: insufficient allowance"),
            });
        }
        let balance = state.balance(chain, call.asset, owner);
        if balance < total {
            return Err(LedgerError::Reverted {
                data: encode_revert_reason("ERC20: transfer amount exceeds balance"),
            });
        }

        if allowance != Amount::MAX {
            state.allowances.insert(allowance_key, allowance - total);
        }
        state
            .balances
            .insert((chain, call.asset, owner), balance - total);
        for (recipient, amount) in call.recipients.iter().zip(&call.amounts) {
            state.credit(chain, call.asset, *recipient, *amount);
        }

        debug!(chain_id = %chain, recipients = call.recipients.len(), total = %total, "Batch payout applied");
        Ok(Some(state.next_receipt()))
    }
}

#[async_trait]
impl BridgeClient for InMemoryLedger {
    async fn bridge(&self, request: BridgeRequest) -> Result<BridgeReceipt, BridgeError> {
        let mut state = self.state.write();
        state.bridge_requests.push(request.clone());

        if let Some(reason) = state.failing_bridges.get(&request.destination_chain) {
            return Err(BridgeError::Rejected(reason.clone()));
        }
        let amount = Amount::from_dec_str(&request.amount)
            .map_err(|_| BridgeError::Rejected(format!("invalid amount {:?}", request.amount)))?;
        let destination_asset = state
            .assets
            .get(&request.destination_chain)
            .copied()
            .ok_or_else(|| {
                BridgeError::Rejected(format!(
                    "no route to chain {}",
                    request.destination_chain
                ))
            })?;

        let owner = state.account;
        let available = state.balance(request.source_chain, request.asset, owner);
        if available < amount {
            return Err(BridgeError::Rejected(format!(
                "insufficient liquidity: have {available}, need {amount}"
            )));
        }
        state.balances.insert(
            (request.source_chain, request.asset, owner),
            available - amount,
        );
        state.credit(request.destination_chain, destination_asset, owner, amount);

        let receipt = state.next_receipt();
        Ok(BridgeReceipt {
            transfer_id: format!("transfer-{}", state.nonce),
            source_tx: Some(receipt.tx_hash),
        })
    }
}
