//! Application layer: the services composing domain logic and ports.

pub mod bridge;
pub mod payout;
pub mod progress;
pub mod service;

pub use bridge::{BridgeObserver, BridgeOrchestrator};
pub use payout::{add_chain_request, PayoutExecutor, PayoutReceipt};
pub use progress::{DistributionEvent, ProgressPublisher, EVENT_CHANNEL_CAPACITY};
pub use service::{DistributionOrchestrator, DistributionPorts};
