//! HTTP routes for the gateway authorizer.
//!
//! Defines the Axum router and application state.

use crate::config::{Config, REQUEST_TIMEOUT_SECONDS};
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::Authorizer;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;

/// Request timeout applied to every route.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(REQUEST_TIMEOUT_SECONDS);

/// Application state shared across all handlers.
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Decision service holding the process-lifetime caches.
    pub authorizer: Authorizer,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let authorizer = Authorizer::from_config(&config);
        Self { config, authorizer }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/authorize` - Authorization decision for one gateway event
/// - `/health` - Liveness probe (simple "OK")
/// - `/ready` - Readiness probe
/// - `/metrics` - Prometheus metrics endpoint
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let app_routes = Router::new()
        .route("/v1/authorize", post(handlers::authorize))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    app_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
