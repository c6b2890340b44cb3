//! Shared deployment: Base (settlement), Arbitrum and Optimism.
//!
//! The treasury starts on Base with 1,000 USDC. The wallet knows Base and
//! Arbitrum; Optimism must be registered before the first switch.

use async_trait::async_trait;
use ms_distribution::{
    usdc, AddChainRequest, Address, Amount, BatchPayoutCall, BridgeClient, BridgeError,
    BridgeReceipt, BridgeRequest, ChainConfig, ChainId, DistributionConfig,
    DistributionOrchestrator, DistributionPorts, HolderRecord, InMemoryLedger, LedgerError,
    PayoutLedger, StaticSnapshotSource, TxReceipt, Wallet, WalletError,
};
use primitive_types::H160;
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

pub const PROJECT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

pub const BASE_USDC: Address = H160([0xb0; 20]);
pub const ARB_USDC: Address = H160([0xa0; 20]);
pub const OP_USDC: Address = H160([0x0a; 20]);
pub const BASE_PAYOUT: Address = H160([0xc0; 20]);
pub const ARB_PAYOUT: Address = H160([0xc1; 20]);
pub const OP_PAYOUT: Address = H160([0xc2; 20]);

pub const TREASURY: Address = H160([0x01; 20]);
pub const ALICE: Address = H160([0x10; 20]);
pub const BOB: Address = H160([0x11; 20]);
pub const CAROL: Address = H160([0x12; 20]);

fn deployment(chain_id: ChainId, payout: Address, asset: Address) -> ChainConfig {
    ChainConfig {
        chain_id,
        payout_contract_address: Some(payout),
        settlement_asset_address: Some(asset),
        ..Default::default()
    }
}

pub fn config() -> DistributionConfig {
    DistributionConfig {
        chains: vec![
            deployment(ChainId::BASE, BASE_PAYOUT, BASE_USDC),
            deployment(ChainId::ARBITRUM, ARB_PAYOUT, ARB_USDC),
            deployment(ChainId::OPTIMISM, OP_PAYOUT, OP_USDC),
        ],
        ..Default::default()
    }
}

/// 60 / 30 / 10 split across the three chains.
pub fn holders() -> Vec<HolderRecord> {
    vec![
        HolderRecord::new(ALICE, ChainId::BASE, usdc(600)),
        HolderRecord::new(BOB, ChainId::ARBITRUM, usdc(300)),
        HolderRecord::new(CAROL, ChainId::OPTIMISM, usdc(100)),
    ]
}

pub fn funded_ledger() -> Arc<InMemoryLedger> {
    let ledger = Arc::new(InMemoryLedger::new(TREASURY, ChainId::BASE));
    ledger.add_wallet_chain(ChainId::ARBITRUM);
    ledger.register_asset(ChainId::BASE, BASE_USDC);
    ledger.register_asset(ChainId::ARBITRUM, ARB_USDC);
    ledger.register_asset(ChainId::OPTIMISM, OP_USDC);
    ledger.set_balance(ChainId::BASE, BASE_USDC, TREASURY, usdc(1_000));
    ledger
}

pub struct Fixture {
    pub orchestrator: Arc<DistributionOrchestrator>,
    pub ledger: Arc<InMemoryLedger>,
    pub snapshot: Arc<StaticSnapshotSource>,
}

impl Fixture {
    pub fn new() -> Self {
        let ledger = funded_ledger();
        Self::with_signer(ledger.clone(), ledger)
    }

    /// Fixture whose payouts and/or bridge calls wait at `gate`.
    pub fn gated(gate_payouts: bool, gate_bridges: bool) -> (Self, Arc<Gate>) {
        let ledger = funded_ledger();
        let gate = Arc::new(Gate::default());
        let signer = Arc::new(GatedSigner {
            inner: ledger.clone(),
            gate: gate.clone(),
            gate_payouts,
            gate_bridges,
        });
        (Self::with_signer(ledger, signer), gate)
    }

    fn with_signer<S>(ledger: Arc<InMemoryLedger>, signer: Arc<S>) -> Self
    where
        S: Wallet + PayoutLedger + BridgeClient + 'static,
    {
        ms_telemetry::init_test_logging();
        let snapshot = Arc::new(StaticSnapshotSource::new());
        snapshot.set_holders(PROJECT, holders());
        let ports = DistributionPorts::with_signer(snapshot.clone(), signer);
        let orchestrator = DistributionOrchestrator::new(config(), ports)
            .expect("fixture config is valid");
        Self {
            orchestrator: Arc::new(orchestrator),
            ledger,
            snapshot,
        }
    }

    pub fn balance(&self, chain: ChainId, asset: Address, owner: Address) -> Amount {
        self.ledger.balance(chain, asset, owner)
    }
}

/// Holds gated calls until the test releases them.
pub struct Gate {
    entered: Notify,
    permits: Semaphore,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            entered: Notify::new(),
            permits: Semaphore::new(0),
        }
    }
}

impl Gate {
    async fn pass(&self) {
        self.entered.notify_one();
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }

    /// Wait until a gated call is parked.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let `n` parked or future calls through.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }
}

/// `InMemoryLedger` whose payout and bridge calls wait at a gate.
struct GatedSigner {
    inner: Arc<InMemoryLedger>,
    gate: Arc<Gate>,
    gate_payouts: bool,
    gate_bridges: bool,
}

#[async_trait]
impl Wallet for GatedSigner {
    fn account(&self) -> Address {
        self.inner.account()
    }

    async fn active_chain(&self) -> Result<ChainId, WalletError> {
        self.inner.active_chain().await
    }

    async fn switch_chain(&self, hex_chain_id: &str) -> Result<(), WalletError> {
        self.inner.switch_chain(hex_chain_id).await
    }

    async fn add_chain(&self, request: AddChainRequest) -> Result<(), WalletError> {
        self.inner.add_chain(request).await
    }
}

#[async_trait]
impl PayoutLedger for GatedSigner {
    async fn balance_of(
        &self,
        chain: ChainId,
        asset: Address,
        owner: Address,
    ) -> Result<Amount, LedgerError> {
        self.inner.balance_of(chain, asset, owner).await
    }

    async fn allowance(
        &self,
        chain: ChainId,
        asset: Address,
        owner: Address,
        spender: Address,
    ) -> Result<Amount, LedgerError> {
        self.inner.allowance(chain, asset, owner, spender).await
    }

    async fn approve(
        &self,
        chain: ChainId,
        asset: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<Option<TxReceipt>, LedgerError> {
        self.inner.approve(chain, asset, spender, amount).await
    }

    async fn batch_payout(
        &self,
        chain: ChainId,
        payout_contract: Address,
        call: BatchPayoutCall,
    ) -> Result<Option<TxReceipt>, LedgerError> {
        if self.gate_payouts {
            self.gate.pass().await;
        }
        self.inner.batch_payout(chain, payout_contract, call).await
    }
}

#[async_trait]
impl BridgeClient for GatedSigner {
    async fn bridge(&self, request: BridgeRequest) -> Result<BridgeReceipt, BridgeError> {
        if self.gate_bridges {
            self.gate.pass().await;
        }
        self.inner.bridge(request).await
    }
}
