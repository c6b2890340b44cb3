//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits: holder snapshots and a simulated
//! wallet, ledger and bridge.

mod in_memory_ledger;
mod snapshot;

pub use in_memory_ledger::{ApprovalRecord, InMemoryLedger, PayoutRecord};
pub use snapshot::{
    parse_address, GraphQlTransport, StaticSnapshotSource, SubgraphSnapshotSource, HOLDERS_QUERY,
};
