//! Metrics definitions for the gateway authorizer.
//!
//! All metrics follow Prometheus naming conventions:
//! - `authorizer_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `effect`: Allow, Deny
//! - `reason`: granted, default_allow, empty_token, invalid_token, access_denied
//! - `method`: request methods seen by the gateway
//! - `endpoint`: the service's own routes, everything else is `/other`
//! - `status`: success, error, timeout
//!
//! Request paths and resource ARNs are never used as labels.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle for `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("authorizer_http_request".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Warm decisions are sub-millisecond; cold ones include the key fetch
        .set_buckets_for_metric(
            Matcher::Prefix("authorizer_decision".to_string()),
            &[
                0.0001, 0.0005, 0.001, 0.002, 0.005, 0.010, 0.050, 0.100, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set decision buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("authorizer_key_fetch".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set key fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Decision Metrics
// ============================================================================

/// Record an authorization decision.
///
/// Metric: `authorizer_decisions_total`, `authorizer_decision_duration_seconds`
/// Labels: `effect`, `reason`
pub fn record_decision(effect: &str, reason: &str, duration: Duration) {
    histogram!("authorizer_decision_duration_seconds",
        "effect" => effect.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("authorizer_decisions_total",
        "effect" => effect.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record a request allowed because no rule covered it.
///
/// Metric: `authorizer_default_allow_total`
/// Labels: `method`
pub fn record_default_allow(method: &str) {
    counter!("authorizer_default_allow_total",
        "method" => normalize_method(method)
    )
    .increment(1);
}

// ============================================================================
// Key Fetch Metrics
// ============================================================================

/// Record a verification key fetch attempt.
///
/// Metric: `authorizer_key_fetch_total`, `authorizer_key_fetch_duration_seconds`
/// Labels: `status`
pub fn record_key_fetch(status: &str, duration: Duration) {
    histogram!("authorizer_key_fetch_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("authorizer_key_fetch_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `authorizer_http_requests_total`, `authorizer_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("authorizer_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("authorizer_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/v1/authorize" => "/v1/authorize",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}

/// Gateway methods are caller-supplied; anything unexpected is folded.
fn normalize_method(method: &str) -> String {
    match method {
        "GET" | "POST" | "PUT" | "PATCH" | "DELETE" | "HEAD" | "OPTIONS" => method.to_string(),
        _ => "OTHER".to_string(),
    }
}
