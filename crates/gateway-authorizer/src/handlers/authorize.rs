//! Authorization decision handler.

use crate::errors::AuthorizerError;
use crate::models::AuthorizerEvent;
use crate::policy::Decision;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /v1/authorize
///
/// Takes the gateway's request-authorizer event and returns the policy
/// document. ALLOW and every DENY are `200 OK`; only infrastructure faults
/// produce an error status.
#[instrument(skip_all, name = "authorizer.authorize")]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    Json(event): Json<AuthorizerEvent>,
) -> Result<Json<Decision>, AuthorizerError> {
    let decision = state.authorizer.authorize(&event).await?;
    Ok(Json(decision))
}
