//! # Guard Choreography Tests
//!
//! A gated signer parks payout or bridge calls mid-flight so the tests can
//! inspect the orchestrator while a chain step is running.
//!
//! 1. **In-flight**: a chain cannot be submitted twice
//! 2. **Reentrancy**: one auto-distribute loop at a time
//! 3. **Cancel**: honoured between chains only

use super::fixtures::*;
use anyhow::Result;
use ms_distribution::{
    usdc, CancelOutcome, ChainId, DistributionApi, DistributionError, Phase,
};

#[tokio::test]
async fn test_payout_in_flight_rejects_double_submission() -> Result<()> {
    let (fx, gate) = Fixture::gated(true, false);
    fx.orchestrator.prepare(PROJECT, usdc(100)).await?;
    fx.orchestrator.skip_bridging()?;

    let orchestrator = fx.orchestrator.clone();
    let first = tokio::spawn(async move { orchestrator.payout_chain(ChainId::BASE).await });
    gate.wait_entered().await;

    let run = fx.orchestrator.run().expect("run is active");
    assert!(run.is_payout_in_flight(ChainId::BASE));
    assert_eq!(
        fx.orchestrator.payout_chain(ChainId::BASE).await,
        Err(DistributionError::PayoutInFlight(ChainId::BASE))
    );
    assert_eq!(
        fx.orchestrator.payout_chain(ChainId::ARBITRUM).await,
        Err(DistributionError::OperationInProgress)
    );
    assert_eq!(
        fx.orchestrator.auto_distribute().await,
        Err(DistributionError::PayoutInFlight(ChainId::BASE))
    );

    gate.release(1);
    assert!(first.await??.is_success());
    assert!(!fx
        .orchestrator
        .run()
        .expect("run is active")
        .is_payout_in_flight(ChainId::BASE));
    assert_eq!(fx.ledger.payouts().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_auto_distribute_is_reentrancy_guarded() -> Result<()> {
    let (fx, gate) = Fixture::gated(true, false);
    fx.orchestrator.prepare(PROJECT, usdc(100)).await?;
    fx.orchestrator.bridge_all().await?;

    let orchestrator = fx.orchestrator.clone();
    let auto = tokio::spawn(async move { orchestrator.auto_distribute().await });
    gate.wait_entered().await;

    assert_eq!(
        fx.orchestrator.auto_distribute().await,
        Err(DistributionError::AutoDistributeRunning)
    );
    assert_eq!(
        fx.orchestrator.payout_chain(ChainId::OPTIMISM).await,
        Err(DistributionError::AutoDistributeRunning)
    );

    // Three chains plus the manual payout below.
    gate.release(4);
    let results = auto.await??;
    let chains: Vec<_> = results.iter().map(|(chain, _)| *chain).collect();
    assert_eq!(
        chains,
        vec![ChainId::BASE, ChainId::ARBITRUM, ChainId::OPTIMISM]
    );
    assert!(results.iter().all(|(_, outcome)| outcome.is_success()));

    // Guard released once the loop returns.
    assert!(fx.orchestrator.payout_chain(ChainId::BASE).await?.is_success());
    Ok(())
}

#[tokio::test]
async fn test_cancel_during_auto_distribute_stops_before_next_chain() -> Result<()> {
    let (fx, gate) = Fixture::gated(true, false);
    fx.orchestrator.prepare(PROJECT, usdc(100)).await?;
    fx.orchestrator.bridge_all().await?;
    let mut events = fx.orchestrator.subscribe();

    let orchestrator = fx.orchestrator.clone();
    let auto = tokio::spawn(async move { orchestrator.auto_distribute().await });
    gate.wait_entered().await;

    assert_eq!(fx.orchestrator.cancel(), CancelOutcome::Deferred);
    // Still the same run until the chain in flight returns.
    assert_eq!(fx.orchestrator.phase(), Phase::Payout);

    gate.release(1);
    let results = auto.await??;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, ChainId::BASE);
    assert_eq!(fx.ledger.payouts().len(), 1);

    assert_eq!(fx.orchestrator.phase(), Phase::AmountEntry);
    assert!(fx.orchestrator.run().is_none());

    let mut cancelled = false;
    while let Ok(event) = events.try_recv() {
        cancelled |= matches!(event, ms_distribution::DistributionEvent::RunCancelled { .. });
    }
    assert!(cancelled);
    Ok(())
}

#[tokio::test]
async fn test_cancel_during_bridging_skips_remaining_chains() -> Result<()> {
    let (fx, gate) = Fixture::gated(false, true);
    fx.orchestrator.prepare(PROJECT, usdc(100)).await?;

    let orchestrator = fx.orchestrator.clone();
    let bridging = tokio::spawn(async move { orchestrator.bridge_all().await });
    gate.wait_entered().await;

    assert_eq!(fx.orchestrator.phase(), Phase::Bridging);
    assert!(!fx.orchestrator.can_bridge());
    assert_eq!(fx.orchestrator.cancel(), CancelOutcome::Deferred);

    gate.release(1);
    let summary = bridging.await??;
    assert!(summary.stopped_early);
    assert_eq!(summary.completed(), vec![ChainId::BASE, ChainId::ARBITRUM]);

    // Optimism was never attempted.
    let requests = fx.ledger.bridge_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].destination_chain, ChainId::ARBITRUM);
    assert_eq!(fx.orchestrator.phase(), Phase::AmountEntry);
    Ok(())
}

#[tokio::test]
async fn test_prepare_refused_while_run_active() -> Result<()> {
    let fx = Fixture::new();
    let run = fx.orchestrator.prepare(PROJECT, usdc(10)).await?;
    assert_eq!(
        fx.orchestrator.prepare(PROJECT, usdc(10)).await.unwrap_err(),
        DistributionError::RunInProgress(run.run_id)
    );

    assert_eq!(fx.orchestrator.cancel(), CancelOutcome::Reset);
    let next = fx.orchestrator.prepare(PROJECT, usdc(10)).await?;
    assert_ne!(next.run_id, run.run_id);
    Ok(())
}

#[tokio::test]
async fn test_skip_bridging_only_from_breakdown() -> Result<()> {
    let fx = Fixture::new();
    assert_eq!(
        fx.orchestrator.skip_bridging(),
        Err(DistributionError::NoActiveRun)
    );
    fx.orchestrator.prepare(PROJECT, usdc(10)).await?;
    fx.orchestrator.skip_bridging()?;
    assert_eq!(
        fx.orchestrator.skip_bridging(),
        Err(DistributionError::WrongPhase {
            expected: Phase::Breakdown,
            actual: Phase::Payout,
        })
    );
    assert!(matches!(
        fx.orchestrator.bridge_all().await,
        Err(DistributionError::WrongPhase { .. })
    ));
    Ok(())
}
