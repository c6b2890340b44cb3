//! Distribution Orchestrator Service
//!
//! Main service implementing `DistributionApi`. Drives one run through
//! snapshot, allocation, bridging and per-chain payouts.

use crate::algorithms::allocate;
use crate::application::bridge::{BridgeObserver, BridgeOrchestrator};
use crate::application::payout::PayoutExecutor;
use crate::application::progress::{DistributionEvent, ProgressPublisher};
use crate::config::DistributionConfig;
use crate::domain::{
    Address, Amount, BridgeStatus, BridgeSummary, CancelOutcome, ChainAllocation, ChainId,
    ChainPayoutOutcome, ChainRegistry, DistributionBreakdown, DistributionError, DistributionRun,
    Phase,
};
use crate::ports::inbound::DistributionApi;
use crate::ports::outbound::{BridgeClient, PayoutLedger, SnapshotSource, Wallet};
use async_trait::async_trait;
use ms_telemetry::{metric_inc, RUNS_PREPARED};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

/// Outbound dependencies of the orchestrator.
#[derive(Clone)]
pub struct DistributionPorts {
    /// Holder snapshot indexer.
    pub snapshot: Arc<dyn SnapshotSource>,
    /// Treasury bridge.
    pub bridge: Arc<dyn BridgeClient>,
    /// Signing wallet.
    pub wallet: Arc<dyn Wallet>,
    /// Settlement asset and payout contract access.
    pub ledger: Arc<dyn PayoutLedger>,
}

impl DistributionPorts {
    /// Use one object for the wallet, ledger and bridge.
    pub fn with_signer<S>(snapshot: Arc<dyn SnapshotSource>, signer: Arc<S>) -> Self
    where
        S: Wallet + PayoutLedger + BridgeClient + 'static,
    {
        Self {
            snapshot,
            bridge: signer.clone(),
            wallet: signer.clone(),
            ledger: signer,
        }
    }
}

#[derive(Default)]
struct SessionState {
    run: Option<DistributionRun>,
    /// Snapshot fetch in progress.
    preparing: bool,
    /// A bridge or payout step holds the signer.
    busy: bool,
    auto_running: bool,
    cancel_requested: bool,
}

impl SessionState {
    fn is_idle(&self) -> bool {
        !self.preparing && !self.busy && !self.auto_running
    }

    fn run_mut(&mut self) -> Result<&mut DistributionRun, DistributionError> {
        self.run.as_mut().ok_or(DistributionError::NoActiveRun)
    }

    fn require_idle(&self) -> Result<(), DistributionError> {
        if self.auto_running {
            return Err(DistributionError::AutoDistributeRunning);
        }
        if !self.is_idle() {
            return Err(DistributionError::OperationInProgress);
        }
        Ok(())
    }

    /// Drop the run if a cancel is pending; returns the discarded run id.
    fn apply_pending_cancel(&mut self) -> Option<Uuid> {
        if !self.cancel_requested || !self.is_idle() {
            return None;
        }
        self.cancel_requested = false;
        self.run.take().map(|run| run.run_id)
    }
}

fn require_phase(run: &DistributionRun, expected: Phase) -> Result<(), DistributionError> {
    if run.phase != expected {
        return Err(DistributionError::WrongPhase {
            expected,
            actual: run.phase,
        });
    }
    Ok(())
}

/// Writes bridge progress into the session and the event channel.
struct RunTracker<'a> {
    session: &'a RwLock<SessionState>,
    events: &'a ProgressPublisher,
    run_id: Uuid,
}

impl BridgeObserver for RunTracker<'_> {
    fn on_status(&self, chain_id: ChainId, status: BridgeStatus, detail: Option<&str>) {
        {
            let mut session = self.session.write();
            let Some(run) = session.run.as_mut().filter(|r| r.run_id == self.run_id) else {
                return;
            };
            if let Err(err) = run.set_bridge_status(chain_id, status) {
                warn!(run_id = %self.run_id, chain_id = %chain_id, error = %err, "Bridge status not recorded");
                return;
            }
            match (status, detail) {
                (BridgeStatus::Error, Some(message)) => {
                    run.bridge_errors.insert(chain_id, message.to_string());
                }
                (BridgeStatus::Complete, _) => {
                    run.bridge_errors.remove(&chain_id);
                }
                _ => {}
            }
        }
        self.events.publish(DistributionEvent::BridgeStatusChanged {
            run_id: self.run_id,
            chain_id,
            status,
            detail: detail.map(str::to_string),
        });
    }

    fn should_stop(&self) -> bool {
        self.session.read().cancel_requested
    }
}

/// Distribution Orchestrator
///
/// Owns the session's single `DistributionRun`:
/// 1. `prepare`: snapshot + allocate (`AmountEntry -> Breakdown`)
/// 2. `bridge_all` / `skip_bridging` (`Breakdown -> Bridging -> Payout`)
/// 3. `payout_chain` / `auto_distribute`
///
/// All chain operations run one at a time against the one signer. The
/// session lock is never held across an `.await`.
pub struct DistributionOrchestrator {
    config: DistributionConfig,
    registry: ChainRegistry,
    snapshot: Arc<dyn SnapshotSource>,
    bridge: BridgeOrchestrator,
    payout: PayoutExecutor,
    session: RwLock<SessionState>,
    events: ProgressPublisher,
}

impl DistributionOrchestrator {
    /// Create an orchestrator from validated configuration.
    pub fn new(
        config: DistributionConfig,
        ports: DistributionPorts,
    ) -> Result<Self, DistributionError> {
        let registry = config.registry()?;
        Ok(Self {
            bridge: BridgeOrchestrator::new(ports.bridge, config.settlement_chain_id),
            payout: PayoutExecutor::new(ports.wallet, ports.ledger),
            snapshot: ports.snapshot,
            registry,
            config,
            session: RwLock::new(SessionState::default()),
            events: ProgressPublisher::default(),
        })
    }

    /// Configuration in effect.
    pub fn config(&self) -> &DistributionConfig {
        &self.config
    }

    /// Chain support resolver.
    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<DistributionEvent> {
        self.events.subscribe()
    }

    /// Progress events as a stream.
    pub fn progress_stream(&self) -> BroadcastStream<DistributionEvent> {
        BroadcastStream::new(self.subscribe())
    }

    fn tracker(&self, run_id: Uuid) -> RunTracker<'_> {
        RunTracker {
            session: &self.session,
            events: &self.events,
            run_id,
        }
    }

    fn publish_phase(&self, run_id: Uuid, phase: Phase) {
        info!(run_id = %run_id, phase = ?phase, "Phase changed");
        self.events
            .publish(DistributionEvent::PhaseChanged { run_id, phase });
    }

    fn publish_cancelled(&self, run_id: Option<Uuid>) {
        if let Some(run_id) = run_id {
            info!(run_id = %run_id, "Distribution run cancelled");
            self.events.publish(DistributionEvent::RunCancelled { run_id });
        }
    }

    async fn fetch_and_allocate(
        &self,
        project_id: &str,
        total_amount: Amount,
    ) -> Result<DistributionBreakdown, DistributionError> {
        let holders = self.snapshot.fetch_holders(project_id).await?;
        if holders.is_empty() {
            return Err(DistributionError::NoHolders(project_id.to_string()));
        }
        allocate(&holders, total_amount, self.config.fee_bps, &self.registry)
    }

    /// Check the bridge preconditions and enter `Bridging`.
    fn begin_bridging(&self) -> Result<(Uuid, Vec<ChainAllocation>, Address), DistributionError> {
        let mut session = self.session.write();
        session.require_idle()?;
        let run = session.run_mut()?;
        require_phase(run, Phase::Breakdown)?;
        let asset = self.bridge.preflight(run.allocations(), &self.registry)?;
        run.advance(Phase::Bridging)?;
        let started = (run.run_id, run.allocations().to_vec(), asset);
        session.busy = true;
        Ok(started)
    }

    /// Mark `chain` in flight; the single guard against double submission.
    fn begin_payout(
        &self,
        chain: ChainId,
        from_auto: bool,
    ) -> Result<(Uuid, ChainAllocation), DistributionError> {
        let mut session = self.session.write();
        if session.auto_running && !from_auto {
            return Err(DistributionError::AutoDistributeRunning);
        }
        let busy = session.busy || session.preparing;
        let run = session.run_mut()?;
        require_phase(run, Phase::Payout)?;
        let allocation = run
            .breakdown
            .chain(chain)
            .cloned()
            .ok_or(DistributionError::ChainNotInRun(chain))?;
        if run.is_payout_in_flight(chain) {
            return Err(DistributionError::PayoutInFlight(chain));
        }
        if busy {
            return Err(DistributionError::OperationInProgress);
        }
        run.payout_status.insert(chain, true);
        let run_id = run.run_id;
        session.busy = true;
        Ok((run_id, allocation))
    }

    async fn payout_one(
        &self,
        chain: ChainId,
        from_auto: bool,
    ) -> Result<ChainPayoutOutcome, DistributionError> {
        let (run_id, allocation) = self.begin_payout(chain, from_auto)?;
        self.events
            .publish(DistributionEvent::PayoutStarted { run_id, chain_id: chain });

        let info = self.registry.resolve(chain);
        let outcome = match self.payout.execute(&allocation, &info).await {
            Ok(receipt) => ChainPayoutOutcome::Succeeded {
                tx_hash: receipt.tx_hash,
                recipients: receipt.recipients,
                total: receipt.total,
            },
            Err(err) => ChainPayoutOutcome::Failed {
                message: err.to_string(),
            },
        };

        let cancelled = {
            let mut session = self.session.write();
            session.busy = false;
            if let Some(run) = session.run.as_mut().filter(|r| r.run_id == run_id) {
                run.payout_status.insert(chain, false);
                run.payout_results.insert(chain, outcome.clone());
            }
            session.apply_pending_cancel()
        };

        self.events.publish(DistributionEvent::PayoutFinished {
            run_id,
            chain_id: chain,
            outcome: outcome.clone(),
        });
        self.publish_cancelled(cancelled);
        Ok(outcome)
    }

    async fn auto_loop(
        &self,
        chains: &[ChainId],
    ) -> Result<Vec<(ChainId, ChainPayoutOutcome)>, DistributionError> {
        let mut results = Vec::with_capacity(chains.len());
        for chain in chains {
            let stop = self.session.read().cancel_requested;
            if stop {
                info!(next_chain = %chain, "Auto-distribute stopped before next chain");
                break;
            }
            let outcome = self.payout_one(*chain, true).await?;
            results.push((*chain, outcome));
        }
        Ok(results)
    }
}

#[async_trait]
impl DistributionApi for DistributionOrchestrator {
    async fn prepare(
        &self,
        project_id: &str,
        total_amount: Amount,
    ) -> Result<DistributionRun, DistributionError> {
        if total_amount.is_zero() {
            return Err(DistributionError::InvalidAmount);
        }
        {
            let mut session = self.session.write();
            if let Some(run) = &session.run {
                return Err(DistributionError::RunInProgress(run.run_id));
            }
            if !session.is_idle() {
                return Err(DistributionError::OperationInProgress);
            }
            session.preparing = true;
        }

        info!(project = %project_id, amount = %total_amount, fee_bps = self.config.fee_bps, "Preparing distribution");
        let result = self.fetch_and_allocate(project_id, total_amount).await;

        let (run, cancelled) = {
            let mut session = self.session.write();
            session.preparing = false;
            if session.cancel_requested {
                session.cancel_requested = false;
                (Err(DistributionError::Cancelled), true)
            } else {
                match result {
                    Ok(breakdown) => {
                        let run = DistributionRun::new(project_id, breakdown);
                        session.run = Some(run.clone());
                        (Ok(run), false)
                    }
                    Err(err) => (Err(err), false),
                }
            }
        };

        match &run {
            Ok(run) => {
                metric_inc!(RUNS_PREPARED);
                info!(
                    run_id = %run.run_id,
                    chains = run.allocations().len(),
                    holders = run.breakdown.holder_count(),
                    fee = %run.breakdown.fee_amount,
                    net = %run.breakdown.net_distributable,
                    dust = %run.breakdown.dust(),
                    "Distribution breakdown ready"
                );
                self.publish_phase(run.run_id, Phase::Breakdown);
            }
            Err(err) if cancelled => info!(project = %project_id, error = %err, "Preparation cancelled"),
            Err(err) => warn!(project = %project_id, error = %err, "Preparation failed"),
        }
        run
    }

    fn blocking_chains(&self) -> Vec<ChainId> {
        self.session
            .read()
            .run
            .as_ref()
            .map(|run| self.bridge.blocking_chains(run.allocations(), &self.registry))
            .unwrap_or_default()
    }

    fn can_bridge(&self) -> bool {
        let session = self.session.read();
        match &session.run {
            Some(run) => {
                session.is_idle()
                    && run.phase == Phase::Breakdown
                    && self
                        .bridge
                        .blocking_chains(run.allocations(), &self.registry)
                        .is_empty()
            }
            None => false,
        }
    }

    async fn bridge_all(&self) -> Result<BridgeSummary, DistributionError> {
        let (run_id, allocations, asset) = self.begin_bridging()?;
        self.publish_phase(run_id, Phase::Bridging);

        let summary = self
            .bridge
            .bridge_all(&allocations, asset, &self.tracker(run_id))
            .await;

        let (entered_payout, cancelled) = {
            let mut session = self.session.write();
            session.busy = false;
            let cancelled = session.apply_pending_cancel();
            let mut entered_payout = false;
            if cancelled.is_none() {
                if let Some(run) = session.run.as_mut().filter(|r| r.run_id == run_id) {
                    run.advance(Phase::Payout)?;
                    entered_payout = true;
                }
            }
            (entered_payout, cancelled)
        };

        if entered_payout {
            self.publish_phase(run_id, Phase::Payout);
        }
        self.publish_cancelled(cancelled);
        Ok(summary)
    }

    async fn retry_bridge(&self, chain: ChainId) -> Result<BridgeStatus, DistributionError> {
        let (run_id, allocation, asset) = {
            let mut session = self.session.write();
            session.require_idle()?;
            let run = session.run_mut()?;
            require_phase(run, Phase::Payout)?;
            let current = run
                .bridge_status_of(chain)
                .ok_or(DistributionError::ChainNotInRun(chain))?;
            if current != BridgeStatus::Error {
                return Err(DistributionError::InvalidTransition {
                    from: format!("{:?}", current),
                    to: format!("{:?}", BridgeStatus::Bridging),
                });
            }
            let asset = self.bridge.preflight(run.allocations(), &self.registry)?;
            let allocation = run
                .breakdown
                .chain(chain)
                .cloned()
                .ok_or(DistributionError::ChainNotInRun(chain))?;
            let run_id = run.run_id;
            session.busy = true;
            (run_id, allocation, asset)
        };

        info!(run_id = %run_id, chain_id = %chain, "Retrying bridge transfer");
        let status = self
            .bridge
            .bridge_chain(&allocation, asset, &self.tracker(run_id))
            .await;

        let cancelled = {
            let mut session = self.session.write();
            session.busy = false;
            session.apply_pending_cancel()
        };
        self.publish_cancelled(cancelled);
        Ok(status)
    }

    fn skip_bridging(&self) -> Result<(), DistributionError> {
        let run_id = {
            let mut session = self.session.write();
            session.require_idle()?;
            let run = session.run_mut()?;
            require_phase(run, Phase::Breakdown)?;
            run.advance(Phase::Payout)?;
            run.run_id
        };
        info!(run_id = %run_id, "Bridging skipped, chains treated as pre-funded");
        self.publish_phase(run_id, Phase::Payout);
        Ok(())
    }

    async fn payout_chain(&self, chain: ChainId) -> Result<ChainPayoutOutcome, DistributionError> {
        self.payout_one(chain, false).await
    }

    async fn auto_distribute(
        &self,
    ) -> Result<Vec<(ChainId, ChainPayoutOutcome)>, DistributionError> {
        let (run_id, chains) = {
            let mut session = self.session.write();
            if session.auto_running {
                return Err(DistributionError::AutoDistributeRunning);
            }
            let busy = !session.is_idle();
            let run = session.run_mut()?;
            require_phase(run, Phase::Payout)?;
            if let Some(chain) = run.in_flight_chain() {
                return Err(DistributionError::PayoutInFlight(chain));
            }
            if busy {
                return Err(DistributionError::OperationInProgress);
            }
            let started = (
                run.run_id,
                run.allocations().iter().map(|a| a.chain_id).collect::<Vec<_>>(),
            );
            session.auto_running = true;
            started
        };

        info!(run_id = %run_id, chains = chains.len(), "Auto-distribute started");
        let results = self.auto_loop(&chains).await;

        let cancelled = {
            let mut session = self.session.write();
            session.auto_running = false;
            session.apply_pending_cancel()
        };
        self.publish_cancelled(cancelled);

        if let Ok(results) = &results {
            let succeeded = results.iter().filter(|(_, o)| o.is_success()).count();
            info!(
                run_id = %run_id,
                succeeded,
                failed = results.len() - succeeded,
                "Auto-distribute finished"
            );
        }
        results
    }

    fn cancel(&self) -> CancelOutcome {
        let discarded = {
            let mut session = self.session.write();
            if !session.is_idle() {
                session.cancel_requested = true;
                None
            } else {
                session.cancel_requested = false;
                Some(session.run.take().map(|run| run.run_id))
            }
        };

        match discarded {
            None => {
                info!("Cancel deferred until the running step returns");
                CancelOutcome::Deferred
            }
            Some(run_id) => {
                self.publish_cancelled(run_id);
                CancelOutcome::Reset
            }
        }
    }

    fn run(&self) -> Option<DistributionRun> {
        self.session.read().run.clone()
    }

    fn phase(&self) -> Phase {
        self.session
            .read()
            .run
            .as_ref()
            .map(|run| run.phase)
            .unwrap_or_default()
    }
}
