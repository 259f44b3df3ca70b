//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - reports rule configuration and key cache state

use crate::models::ReadyResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does NOT check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 once the rule configuration parses, 503 otherwise. The
/// verification key is reported but never fetched here: a cold cache is
/// filled by the first authorization request.
#[tracing::instrument(skip_all, name = "authorizer.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let verification_key = if state.authorizer.key_cache().is_cached() {
        "cached"
    } else {
        "pending"
    };

    if let Err(e) = state.authorizer.rules().get_rule_config() {
        tracing::warn!(target: "authorizer.handler", error = %e, "Readiness check failed: rule configuration invalid");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                status: "not_ready".to_string(),
                issuer: state.config.issuer(),
                verification_key: verification_key.to_string(),
                rules: "invalid".to_string(),
                error: Some("Service configuration invalid".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadyResponse {
            status: "ready".to_string(),
            issuer: state.config.issuer(),
            verification_key: verification_key.to_string(),
            rules: "loaded".to_string(),
            error: None,
        }),
    )
}
