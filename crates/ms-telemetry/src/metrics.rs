//! Prometheus metrics for the distribution orchestrator.
//!
//! All metrics follow the naming convention: `ms_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Distribution runs that reached the breakdown phase
    pub static ref RUNS_PREPARED: Counter = Counter::new(
        "ms_distribution_runs_prepared_total",
        "Total distribution runs that produced a chain breakdown"
    ).expect("metric creation failed");

    /// Bridge transfers by outcome
    pub static ref BRIDGE_TRANSFERS: CounterVec = CounterVec::new(
        Opts::new("ms_bridge_transfers_total", "Treasury bridge transfers"),
        &["outcome"]  // outcome: complete/error/skipped
    ).expect("metric creation failed");

    /// Chain payouts by outcome
    pub static ref CHAIN_PAYOUTS: CounterVec = CounterVec::new(
        Opts::new("ms_payout_chain_payouts_total", "Per-chain batch payouts"),
        &["outcome"]  // outcome: succeeded/failed
    ).expect("metric creation failed");

    /// Holders paid across all successful batches
    pub static ref HOLDERS_PAID: Counter = Counter::new(
        "ms_payout_holders_paid_total",
        "Total holder transfers included in successful batches"
    ).expect("metric creation failed");

    /// Duration of one chain payout, switch to receipt
    pub static ref PAYOUT_DURATION: Histogram = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "ms_payout_chain_duration_seconds",
            "Time from chain switch to batch receipt"
        ).buckets(exponential_buckets(0.05, 2.0, 12).expect("valid buckets"))
    ).expect("metric creation failed");
}

/// Handle for the registered metrics
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(RUNS_PREPARED.clone()),
        Box::new(BRIDGE_TRANSFERS.clone()),
        Box::new(CHAIN_PAYOUTS.clone()),
        Box::new(HOLDERS_PAID.clone()),
        Box::new(PAYOUT_DURATION.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}
