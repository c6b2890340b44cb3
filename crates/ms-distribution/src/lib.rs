//! # Minestarters Cross-Chain Profit Distribution
//!
//! Distributes project profit to vault holders on the chain each holder
//! deposited from.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Pro-rata profit shares from an indexed balance snapshot, after a
//!   platform fee, in integer USDC units
//! - Holders grouped by origin chain
//! - Sequential treasury bridging from the settlement chain
//! - One batch payout transaction per chain, behind balance and allowance
//!   preflight checks
//!
//! ## Run Lifecycle
//!
//! | Phase | Entered by | Leaves via |
//! |-------|------------|------------|
//! | `AmountEntry` | new session, `cancel` | `prepare` |
//! | `Breakdown` | `prepare` | `bridge_all`, `skip_bridging` |
//! | `Bridging` | `bridge_all` | automatically, once every chain was attempted |
//! | `Payout` | bridging done or skipped | `cancel` |
//!
//! ## Module Structure
//!
//! ```text
//! ms-distribution/
//! ├── domain/          # Run, allocations, chain registry, errors
//! ├── algorithms/      # Fee split, pro-rata allocation, revert decoding
//! ├── ports/           # DistributionApi, SnapshotSource, BridgeClient, Wallet, PayoutLedger
//! ├── adapters/        # Subgraph snapshot source, in-memory ledger
//! ├── application/     # Bridge orchestrator, payout executor, orchestrator service
//! └── config.rs        # DistributionConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{
    parse_address, GraphQlTransport, InMemoryLedger, StaticSnapshotSource, SubgraphSnapshotSource,
};
pub use algorithms::{allocate, compute_fee, decode_revert_reason, describe_revert};
pub use application::{
    BridgeObserver, BridgeOrchestrator, DistributionEvent, DistributionOrchestrator,
    DistributionPorts, PayoutExecutor, PayoutReceipt,
};
pub use config::{ChainConfig, DistributionConfig};
pub use domain::{
    usdc, Address, Amount, BridgeStatus, BridgeSummary, CancelOutcome, ChainAllocation, ChainId,
    ChainInfo, ChainPayoutOutcome, ChainRegistry, DistributionBreakdown, DistributionError,
    DistributionRun, HolderRecord, HolderShare, KnownChain, NativeCurrency, PayoutDeployment,
    Phase, TxHash, BPS_DENOMINATOR,
};
pub use ports::{
    AddChainRequest, BatchPayoutCall, BridgeClient, BridgeError, BridgeReceipt, BridgeRequest,
    DistributionApi, LedgerError, PayoutLedger, SnapshotError, SnapshotSource, TxReceipt, Wallet,
    WalletError,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
