//! Progress events published while a run advances.

use crate::domain::{BridgeStatus, ChainId, ChainPayoutOutcome, Phase};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// Events buffered per subscriber before it starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One observable step of a distribution run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DistributionEvent {
    /// Session entered a new phase.
    PhaseChanged {
        /// Run
        run_id: Uuid,
        /// New phase
        phase: Phase,
    },
    /// A chain's bridge status changed.
    BridgeStatusChanged {
        /// Run
        run_id: Uuid,
        /// Destination chain
        chain_id: ChainId,
        /// New status
        status: BridgeStatus,
        /// Failure message for `Error`
        detail: Option<String>,
    },
    /// A chain payout was submitted.
    PayoutStarted {
        /// Run
        run_id: Uuid,
        /// Chain paid out
        chain_id: ChainId,
    },
    /// A chain payout returned.
    PayoutFinished {
        /// Run
        run_id: Uuid,
        /// Chain paid out
        chain_id: ChainId,
        /// Outcome
        outcome: ChainPayoutOutcome,
    },
    /// The run was discarded.
    RunCancelled {
        /// Run
        run_id: Uuid,
    },
}

impl DistributionEvent {
    /// Run the event belongs to.
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::PhaseChanged { run_id, .. }
            | Self::BridgeStatusChanged { run_id, .. }
            | Self::PayoutStarted { run_id, .. }
            | Self::PayoutFinished { run_id, .. }
            | Self::RunCancelled { run_id } => *run_id,
        }
    }
}

/// Broadcast fan-out of `DistributionEvent`s.
pub struct ProgressPublisher {
    sender: broadcast::Sender<DistributionEvent>,
}

impl ProgressPublisher {
    /// Create a publisher buffering `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: DistributionEvent) {
        if self.sender.send(event).is_err() {
            trace!("No progress subscribers");
        }
    }

    /// New subscriber; sees events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DistributionEvent> {
        self.sender.subscribe()
    }
}

impl Default for ProgressPublisher {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}
