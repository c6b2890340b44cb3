//! # Distribution Flow Tests
//!
//! ```text
//! prepare ──→ Breakdown ──bridge_all──→ Bridging ──(all attempted)──→ Payout
//!                 │                                                    ↑
//!                 └────────────────── skip_bridging ───────────────────┘
//! ```

use super::fixtures::*;
use anyhow::Result;
use ms_distribution::algorithms::encode_revert_reason;
use ms_distribution::{
    usdc, Address, Amount, BridgeStatus, ChainConfig, ChainId, ChainPayoutOutcome,
    DistributionApi, DistributionError, DistributionEvent, DistributionOrchestrator,
    DistributionPorts, HolderRecord, Phase,
};
use primitive_types::H160;

/// 28.5 USDC in smallest units.
fn bob_share() -> Amount {
    Amount::from(28_500_000u64)
}

/// 9.5 USDC in smallest units.
fn carol_share() -> Amount {
    Amount::from(9_500_000u64)
}

#[tokio::test]
async fn test_full_run_pays_every_holder_on_origin_chain() -> Result<()> {
    let fx = Fixture::new();
    let run = fx.orchestrator.prepare(PROJECT, usdc(100)).await?;

    assert_eq!(run.breakdown.fee_amount, usdc(5));
    assert_eq!(run.breakdown.net_distributable, usdc(95));
    let chains: Vec<_> = run.allocations().iter().map(|a| a.chain_id).collect();
    assert_eq!(chains, vec![ChainId::BASE, ChainId::ARBITRUM, ChainId::OPTIMISM]);
    assert_eq!(run.breakdown.dust(), Amount::zero());

    let summary = fx.orchestrator.bridge_all().await?;
    assert_eq!(summary.completed().len(), 3);
    assert_eq!(fx.orchestrator.phase(), Phase::Payout);

    let results = fx.orchestrator.auto_distribute().await?;
    assert!(results.iter().all(|(_, outcome)| outcome.is_success()));

    assert_eq!(fx.balance(ChainId::BASE, BASE_USDC, ALICE), usdc(57));
    assert_eq!(fx.balance(ChainId::ARBITRUM, ARB_USDC, BOB), bob_share());
    assert_eq!(fx.balance(ChainId::OPTIMISM, OP_USDC, CAROL), carol_share());

    // Fee stays with the treasury on the settlement chain.
    assert_eq!(fx.balance(ChainId::BASE, BASE_USDC, TREASURY), usdc(905));
    assert_eq!(fx.balance(ChainId::ARBITRUM, ARB_USDC, TREASURY), Amount::zero());
    Ok(())
}

#[tokio::test]
async fn test_bridge_requests_leave_settlement_chain() -> Result<()> {
    let fx = Fixture::new();
    fx.orchestrator.prepare(PROJECT, usdc(100)).await?;
    fx.orchestrator.bridge_all().await?;

    let requests = fx.ledger.bridge_requests();
    assert_eq!(requests.len(), 2);
    assert!(requests
        .iter()
        .all(|r| r.source_chain == ChainId::BASE && r.asset == BASE_USDC));
    assert_eq!(requests[0].destination_chain, ChainId::ARBITRUM);
    assert_eq!(requests[0].amount, "28500000");
    assert_eq!(requests[1].amount, "9500000");
    Ok(())
}

#[tokio::test]
async fn test_partial_bridge_failure_still_enters_payout() -> Result<()> {
    let fx = Fixture::new();
    fx.ledger.fail_bridge(ChainId::ARBITRUM, "insufficient route liquidity");
    fx.orchestrator.prepare(PROJECT, usdc(100)).await?;

    let summary = fx.orchestrator.bridge_all().await?;
    assert_eq!(summary.failed(), vec![ChainId::ARBITRUM]);
    assert_eq!(summary.completed(), vec![ChainId::BASE, ChainId::OPTIMISM]);
    assert_eq!(fx.orchestrator.phase(), Phase::Payout);

    // The unfunded chain fails its payout; the others are unaffected.
    let results = fx.orchestrator.auto_distribute().await?;
    assert!(results[0].1.is_success());
    assert!(matches!(
        &results[1].1,
        ChainPayoutOutcome::Failed { message } if message.contains("Insufficient balance")
    ));
    assert!(results[2].1.is_success());

    // Operator retries the bridge, then the one chain.
    fx.ledger.heal_bridge(ChainId::ARBITRUM);
    assert_eq!(
        fx.orchestrator.retry_bridge(ChainId::ARBITRUM).await?,
        BridgeStatus::Complete
    );
    let outcome = fx.orchestrator.payout_chain(ChainId::ARBITRUM).await?;
    assert!(outcome.is_success());
    assert_eq!(fx.balance(ChainId::ARBITRUM, ARB_USDC, BOB), bob_share());
    Ok(())
}

#[tokio::test]
async fn test_unsupported_chain_blocks_bridging_but_not_breakdown() -> Result<()> {
    let fx = Fixture::new();
    let mut records = holders();
    records.push(HolderRecord::new(Address::repeat_byte(0x13), ChainId::POLYGON, usdc(100)));
    records.push(HolderRecord::new(Address::repeat_byte(0x14), ChainId(31337), usdc(100)));
    fx.snapshot.set_holders(PROJECT, records);

    let run = fx.orchestrator.prepare(PROJECT, usdc(100)).await?;
    let unknown = run.breakdown.chain(ChainId(31337)).map(|a| a.chain_display_name.clone());
    assert_eq!(unknown.as_deref(), Some("Chain 31337"));
    assert_eq!(
        fx.orchestrator.blocking_chains(),
        vec![ChainId::POLYGON, ChainId(31337)]
    );
    assert!(!fx.orchestrator.can_bridge());

    let err = fx.orchestrator.bridge_all().await.unwrap_err();
    assert_eq!(
        err,
        DistributionError::UnsupportedChain(vec![ChainId::POLYGON, ChainId(31337)])
    );
    assert!(fx.ledger.bridge_requests().is_empty());
    assert_eq!(fx.orchestrator.phase(), Phase::Breakdown);

    // Pre-funded path: supported chains can still be paid.
    fx.orchestrator.skip_bridging()?;
    let outcome = fx.orchestrator.payout_chain(ChainId::POLYGON).await?;
    assert!(matches!(
        outcome,
        ChainPayoutOutcome::Failed { message } if message.contains("Unsupported")
    ));
    assert!(fx.orchestrator.payout_chain(ChainId::BASE).await?.is_success());
    Ok(())
}

#[tokio::test]
async fn test_bridging_permitted_once_every_chain_is_deployed() -> Result<()> {
    const POLYGON_USDC: Address = H160([0x89; 20]);
    const POLYGON_PAYOUT: Address = H160([0xc3; 20]);

    let fx = Fixture::new();
    let mut records = holders();
    records.push(HolderRecord::new(H160([0x13; 20]), ChainId::POLYGON, usdc(100)));
    fx.snapshot.set_holders(PROJECT, records);

    fx.orchestrator.prepare(PROJECT, usdc(100)).await?;
    assert_eq!(fx.orchestrator.blocking_chains(), vec![ChainId::POLYGON]);
    assert!(!fx.orchestrator.can_bridge());

    // Operator deploys on Polygon and restarts with the new registry.
    let mut deployed = config();
    deployed.chains.push(ChainConfig {
        chain_id: ChainId::POLYGON,
        payout_contract_address: Some(POLYGON_PAYOUT),
        settlement_asset_address: Some(POLYGON_USDC),
        ..Default::default()
    });
    fx.ledger.register_asset(ChainId::POLYGON, POLYGON_USDC);
    let ports = DistributionPorts::with_signer(fx.snapshot.clone(), fx.ledger.clone());
    let restarted = DistributionOrchestrator::new(deployed, ports)?;

    let run = restarted.prepare(PROJECT, usdc(100)).await?;
    assert!(run.breakdown.unsupported_chains().is_empty());
    assert!(restarted.blocking_chains().is_empty());
    assert!(restarted.can_bridge());

    let summary = restarted.bridge_all().await?;
    assert_eq!(summary.completed().len(), 4);
    assert_eq!(restarted.phase(), Phase::Payout);
    Ok(())
}

#[tokio::test]
async fn test_unknown_wallet_chain_registered_before_switch() -> Result<()> {
    let fx = Fixture::new();
    fx.orchestrator.prepare(PROJECT, usdc(100)).await?;
    fx.orchestrator.bridge_all().await?;
    fx.orchestrator.payout_chain(ChainId::OPTIMISM).await?;

    let added = fx.ledger.added_chains();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].chain_id, "0xa");
    assert_eq!(added[0].chain_name, "Optimism");
    assert_eq!(added[0].native_currency.symbol, "ETH");
    assert_eq!(fx.ledger.connected_chain(), ChainId::OPTIMISM);

    // Arbitrum is already known: no registration.
    fx.orchestrator.payout_chain(ChainId::ARBITRUM).await?;
    assert_eq!(fx.ledger.added_chains().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_repeat_payout_pays_again_and_approves_once() -> Result<()> {
    let fx = Fixture::new();
    fx.orchestrator.prepare(PROJECT, usdc(100)).await?;
    fx.orchestrator.skip_bridging()?;

    assert!(fx.orchestrator.payout_chain(ChainId::BASE).await?.is_success());
    assert!(fx.orchestrator.payout_chain(ChainId::BASE).await?.is_success());

    assert_eq!(fx.balance(ChainId::BASE, BASE_USDC, ALICE), usdc(114));
    let approvals = fx.ledger.approvals();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].amount, Amount::MAX);
    assert_eq!(approvals[0].spender, BASE_PAYOUT);
    Ok(())
}

#[tokio::test]
async fn test_revert_reason_reaches_operator() -> Result<()> {
    let fx = Fixture::new();
    fx.ledger
        .revert_payouts(ChainId::BASE, encode_revert_reason("Distributor: paused"));
    fx.orchestrator.prepare(PROJECT, usdc(100)).await?;
    fx.orchestrator.skip_bridging()?;

    let outcome = fx.orchestrator.payout_chain(ChainId::BASE).await?;
    let run = fx.orchestrator.run().expect("run is active");
    assert_eq!(run.payout_results.get(&ChainId::BASE), Some(&outcome));
    match outcome {
        ChainPayoutOutcome::Failed { message } => assert!(message.contains("Distributor: paused")),
        other => panic!("expected revert, got {other:?}"),
    }
    assert!(!run.is_payout_in_flight(ChainId::BASE));
    Ok(())
}

#[tokio::test]
async fn test_events_follow_bridge_transitions() -> Result<()> {
    let fx = Fixture::new();
    let mut events = fx.orchestrator.subscribe();
    fx.orchestrator.prepare(PROJECT, usdc(100)).await?;
    fx.orchestrator.bridge_all().await?;

    let mut arbitrum = Vec::new();
    let mut phases = Vec::new();
    while let Ok(event) = events.try_recv() {
        match event {
            DistributionEvent::BridgeStatusChanged {
                chain_id, status, ..
            } if chain_id == ChainId::ARBITRUM => arbitrum.push(status),
            DistributionEvent::PhaseChanged { phase, .. } => phases.push(phase),
            _ => {}
        }
    }
    assert_eq!(arbitrum, vec![BridgeStatus::Bridging, BridgeStatus::Complete]);
    assert_eq!(phases, vec![Phase::Breakdown, Phase::Bridging, Phase::Payout]);
    Ok(())
}

#[tokio::test]
async fn test_dust_stays_below_holder_count() -> Result<()> {
    let fx = Fixture::new();
    fx.snapshot.set_holders(
        PROJECT,
        vec![
            HolderRecord::new(ALICE, ChainId::BASE, Amount::one()),
            HolderRecord::new(BOB, ChainId::ARBITRUM, Amount::one()),
            HolderRecord::new(CAROL, ChainId::OPTIMISM, Amount::one()),
        ],
    );
    let run = fx.orchestrator.prepare(PROJECT, Amount::from(1_000_000u64)).await?;

    // 3 * floor(950000 / 3) leaves 2 units undistributed.
    assert_eq!(run.breakdown.net_distributable, Amount::from(950_000u64));
    assert_eq!(run.breakdown.dust(), Amount::from(2u64));
    assert!(run.breakdown.dust() < Amount::from(run.breakdown.holder_count() as u64));
    assert!(run
        .allocations()
        .iter()
        .all(|a| a.total_amount == Amount::from(316_666u64)));
    Ok(())
}
