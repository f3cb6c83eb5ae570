//! # Prometheus Metrics
//!
//! Operational metrics for the alias service. Scraped by Prometheus at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] under
//! the `als` prefix so they do not collide with any default global registry
//! consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use als_protocol::RemoteStats;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Resolution requests, labelled by outcome (`ok` or an error kind).
    pub resolutions_total: IntCounterVec,
    /// Registration requests, labelled by outcome.
    pub registrations_total: IntCounterVec,
    /// Attestation requests, labelled by outcome.
    pub attestations_total: IntCounterVec,
    /// Registrations that succeeded in memory but did not reach the store.
    pub registration_flush_failures_total: IntCounter,
    /// Local misses sent to the ledger, as last reported by the resolver.
    pub remote_lookups: IntGauge,
    /// Ledger lookups that found a record.
    pub remote_hits: IntGauge,
    /// Ledger records that could not be cached durably.
    pub remote_write_back_failures: IntGauge,
    /// Time spent answering a resolution request, in seconds.
    pub resolution_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("als".into()), None)?;

        let resolutions_total = IntCounterVec::new(
            Opts::new("resolutions_total", "Alias resolution requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(resolutions_total.clone()))?;

        let registrations_total = IntCounterVec::new(
            Opts::new("registrations_total", "Alias registration requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(registrations_total.clone()))?;

        let attestations_total = IntCounterVec::new(
            Opts::new("attestations_total", "Attestation requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(attestations_total.clone()))?;

        let registration_flush_failures_total = IntCounter::new(
            "registration_flush_failures_total",
            "Registrations kept in memory after the store refused the flush",
        )?;
        registry.register(Box::new(registration_flush_failures_total.clone()))?;

        let remote_lookups = IntGauge::new(
            "remote_lookups",
            "Local cache misses forwarded to the ledger since startup",
        )?;
        registry.register(Box::new(remote_lookups.clone()))?;

        let remote_hits = IntGauge::new(
            "remote_hits",
            "Ledger lookups that returned a record since startup",
        )?;
        registry.register(Box::new(remote_hits.clone()))?;

        let remote_write_back_failures = IntGauge::new(
            "remote_write_back_failures",
            "Ledger records that could not be cached durably since startup",
        )?;
        registry.register(Box::new(remote_write_back_failures.clone()))?;

        let resolution_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "resolution_latency_seconds",
                "Time to answer a resolution request in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(resolution_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            resolutions_total,
            registrations_total,
            attestations_total,
            registration_flush_failures_total,
            remote_lookups,
            remote_hits,
            remote_write_back_failures,
            resolution_latency_seconds,
        })
    }

    /// Copy the resolver's ledger counters into the gauges.
    pub fn observe_remote(&self, stats: &RemoteStats) {
        self.remote_lookups.set(stats.remote_lookups as i64);
        self.remote_hits.set(stats.remote_hits as i64);
        self.remote_write_back_failures
            .set(stats.write_back_failures as i64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_prefix_and_labels() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.resolutions_total.with_label_values(&["ok"]).inc();
        metrics
            .resolutions_total
            .with_label_values(&["not_found"])
            .inc_by(2);

        let text = metrics.encode().unwrap();
        assert!(text.contains("als_resolutions_total{outcome=\"ok\"} 1"));
        assert!(text.contains("als_resolutions_total{outcome=\"not_found\"} 2"));
    }

    #[test]
    fn remote_stats_land_in_gauges() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.observe_remote(&RemoteStats {
            remote_lookups: 5,
            remote_hits: 3,
            write_back_failures: 1,
        });
        let text = metrics.encode().unwrap();
        assert!(text.contains("als_remote_lookups 5"));
        assert!(text.contains("als_remote_hits 3"));
        assert!(text.contains("als_remote_write_back_failures 1"));
    }

    #[tokio::test]
    async fn handler_serves_text_format() {
        use axum::body::Body;
        use axum::http::Request;
        use axum::routing::get;
        use axum::Router;
        use tower::ServiceExt;

        let metrics = Arc::new(NodeMetrics::new().unwrap());
        metrics.registration_flush_failures_total.inc();
        let router = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(metrics);

        let resp = router
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
    }
}
