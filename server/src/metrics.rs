//! # Prometheus Metrics
//!
//! Operational metrics for the wallet server, scraped at `/metrics`.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] with the
//! `nova_wallet` prefix so they do not collide with the default registry.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

use nova_wallet::ErrorKind;

/// Label value for successful submissions.
pub const OUTCOME_PUBLISHED: &str = "published";

/// Holds all Prometheus metric handles for the server.
#[derive(Clone)]
pub struct WalletMetrics {
    registry: Registry,
    /// Submissions by outcome: `published` or an error kind.
    pub submissions_total: IntCounterVec,
    /// Publish attempts that failed, from submissions and republish passes.
    pub publish_failures_total: IntCounter,
    /// Transactions published by the background republish task.
    pub republished_total: IntCounter,
    /// Wall time of a submission, request in to response out.
    pub submission_latency_seconds: Histogram,
}

impl WalletMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("nova_wallet".into()), None)?;

        let submissions_total = IntCounterVec::new(
            Opts::new("submissions_total", "Transfer submissions by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(submissions_total.clone()))?;

        let publish_failures_total = IntCounter::new(
            "publish_failures_total",
            "Publish attempts the ledger node did not acknowledge",
        )?;
        registry.register(Box::new(publish_failures_total.clone()))?;

        let republished_total = IntCounter::new(
            "republished_total",
            "Pending transactions published by a republish pass",
        )?;
        registry.register(Box::new(republished_total.clone()))?;

        let submission_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "submission_latency_seconds",
                "End-to-end transfer submission latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
        )?;
        registry.register(Box::new(submission_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            submissions_total,
            publish_failures_total,
            republished_total,
            submission_latency_seconds,
        })
    }

    /// Records the outcome of one submission.
    pub fn observe_submission(&self, outcome: Result<(), ErrorKind>, elapsed: Duration) {
        let label = match outcome {
            Ok(()) => OUTCOME_PUBLISHED,
            Err(kind) => kind.as_str(),
        };
        self.submissions_total.with_label_values(&[label]).inc();
        if outcome == Err(ErrorKind::Publish) {
            self.publish_failures_total.inc();
        }
        self.submission_latency_seconds
            .observe(elapsed.as_secs_f64());
    }

    /// Encodes all registered metrics into the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics handle passed to handlers and background tasks.
pub type SharedMetrics = Arc<WalletMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(State(metrics): State<SharedMetrics>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
