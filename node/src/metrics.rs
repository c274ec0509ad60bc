//! # Prometheus Metrics
//!
//! Operational metrics for the node, scraped at `/metrics` on the
//! configured metrics port.
//!
//! All metrics live in a dedicated [`prometheus::Registry`] so they do not
//! collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles wrap `Arc` internally) so it can be
/// shared across request handlers and the build sweep task.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Registry that owns all metrics below.
    registry: Registry,
    /// Transactions accepted by intake.
    pub transactions_submitted_total: IntCounter,
    /// Transactions rejected by intake, any reason.
    pub transactions_rejected_total: IntCounter,
    /// Dockets durably committed.
    pub dockets_committed_total: IntCounter,
    /// Build cycles that failed at signing or write.
    pub docket_failures_total: IntCounter,
    /// Registers activated through the creation protocol.
    pub registers_activated_total: IntCounter,
    /// Registers known to this node, any status.
    pub registers_known: IntGauge,
    /// Pending transactions across all mempools, sampled on change.
    pub transactions_pending: IntGauge,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("keystone".into()), None)
            .expect("failed to create prometheus registry");

        fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
            let c = IntCounter::new(name, help).expect("metric creation");
            registry
                .register(Box::new(c.clone()))
                .expect("metric registration");
            c
        }

        fn gauge(registry: &Registry, name: &str, help: &str) -> IntGauge {
            let g = IntGauge::new(name, help).expect("metric creation");
            registry
                .register(Box::new(g.clone()))
                .expect("metric registration");
            g
        }

        let transactions_submitted_total = counter(
            &registry,
            "transactions_submitted_total",
            "Transactions accepted by intake",
        );
        let transactions_rejected_total = counter(
            &registry,
            "transactions_rejected_total",
            "Transactions rejected by intake",
        );
        let dockets_committed_total = counter(
            &registry,
            "dockets_committed_total",
            "Dockets durably committed",
        );
        let docket_failures_total = counter(
            &registry,
            "docket_failures_total",
            "Build cycles that failed at signing or durable write",
        );
        let registers_activated_total = counter(
            &registry,
            "registers_activated_total",
            "Registers activated through the creation protocol",
        );
        let registers_known = gauge(
            &registry,
            "registers_known",
            "Registers known to this node, any status",
        );
        let transactions_pending = gauge(
            &registry,
            "transactions_pending",
            "Pending transactions across all mempools",
        );

        Self {
            registry,
            transactions_submitted_total,
            transactions_rejected_total,
            dockets_committed_total,
            docket_failures_total,
            registers_activated_total,
            registers_known,
            transactions_pending,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition
    /// format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
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
    fn counters_appear_in_exposition() {
        let metrics = NodeMetrics::new();
        metrics.transactions_submitted_total.inc();
        metrics.dockets_committed_total.inc();
        metrics.registers_known.set(3);

        let body = metrics.encode().unwrap();
        assert!(body.contains("keystone_transactions_submitted_total 1"));
        assert!(body.contains("keystone_dockets_committed_total 1"));
        assert!(body.contains("keystone_registers_known 3"));
    }
}
