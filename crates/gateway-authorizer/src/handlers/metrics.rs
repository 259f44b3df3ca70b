//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! Unauthenticated. Labels carry no subjects, paths, or ARNs.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns Prometheus text format:
/// ```text
/// # TYPE authorizer_decisions_total counter
/// authorizer_decisions_total{effect="Allow",reason="granted"} 42
/// ```
#[tracing::instrument(skip_all, name = "authorizer.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
