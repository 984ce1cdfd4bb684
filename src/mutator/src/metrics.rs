//! Prometheus metrics for admission decisions
//!
//! Metrics live in a per-process [`Registry`] owned by [`AdmissionMetrics`] and
//! are exposed in text format by the webhook's `/metrics` endpoint.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, Encoder, Histogram, HistogramOpts, IntCounter,
    IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Histogram buckets for namespace lookups (seconds)
const LOOKUP_DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];

/// How an admission request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Allowed with a node selector patch
    Patched,
    /// Allowed unchanged
    Allowed,
    /// Aborted with a 4xx
    ClientError,
    /// Aborted with a 5xx
    ServerError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Patched => "patched",
            Outcome::Allowed => "allowed",
            Outcome::ClientError => "client_error",
            Outcome::ServerError => "server_error",
        }
    }
}

/// Admission metrics collector
pub struct AdmissionMetrics {
    registry: Registry,

    /// Admission requests by outcome (Counter)
    pub requests_total: IntCounterVec,

    /// Malformed annotation fragments dropped while parsing (Counter)
    pub dropped_fragments_total: IntCounter,

    /// Namespace lookup latency (Histogram)
    pub lookup_duration_seconds: Histogram,
}

impl AdmissionMetrics {
    /// Create a collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Create a collector registering into `registry`
    pub fn with_registry(registry: Registry) -> prometheus::Result<Self> {
        let requests_total = register_int_counter_vec_with_registry!(
            Opts::new(
                "nodeselector_admission_requests_total",
                "Admission requests handled, by outcome"
            ),
            &["outcome"],
            registry
        )?;

        let dropped_fragments_total = register_int_counter_with_registry!(
            Opts::new(
                "nodeselector_dropped_fragments_total",
                "Malformed node selector annotation fragments that were ignored"
            ),
            registry
        )?;

        let lookup_duration_seconds = register_histogram_with_registry!(
            HistogramOpts::new(
                "nodeselector_lookup_duration_seconds",
                "Namespace lookup latency"
            )
            .buckets(LOOKUP_DURATION_BUCKETS.to_vec()),
            registry
        )?;

        Ok(Self {
            registry,
            requests_total,
            dropped_fragments_total,
            lookup_duration_seconds,
        })
    }

    pub fn record_outcome(&self, outcome: Outcome) {
        self.requests_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    pub fn record_dropped_fragments(&self, count: usize) {
        self.dropped_fragments_total.inc_by(count as u64);
    }

    pub fn record_lookup(&self, elapsed: Duration) {
        self.lookup_duration_seconds.observe(elapsed.as_secs_f64());
    }

    /// Requests recorded for an outcome
    pub fn outcome_count(&self, outcome: Outcome) -> u64 {
        self.requests_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
