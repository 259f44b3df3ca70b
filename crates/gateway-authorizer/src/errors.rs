//! Gateway authorizer error types.
//!
//! Authorization outcomes (`MissingToken`, `InvalidToken`, `AccessDenied`)
//! never leave the service as errors: the request handler turns them into a
//! DENY policy document via [`AuthorizerError::deny_reason`]. Infrastructure
//! faults (`KeyFetch`, `ConfigParse`) propagate and fail the invocation; their
//! HTTP rendering is a generic 500 with the real cause logged server-side.

use crate::policy::DenyReason;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Gateway authorizer error type.
#[derive(Debug, Error)]
pub enum AuthorizerError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Access denied")]
    AccessDenied,

    #[error("Key fetch failed: {0}")]
    KeyFetch(String),

    #[error("Rule configuration error: {0}")]
    ConfigParse(String),
}

impl AuthorizerError {
    /// The DENY reason for authorization outcomes, `None` for infrastructure faults.
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            AuthorizerError::MissingToken => Some(DenyReason::EmptyToken),
            AuthorizerError::InvalidToken(_) => Some(DenyReason::InvalidToken),
            AuthorizerError::AccessDenied => Some(DenyReason::AccessDenied),
            AuthorizerError::KeyFetch(_) | AuthorizerError::ConfigParse(_) => None,
        }
    }

    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        match self {
            AuthorizerError::MissingToken | AuthorizerError::InvalidToken(_) => 401,
            AuthorizerError::AccessDenied => 403,
            AuthorizerError::KeyFetch(_) | AuthorizerError::ConfigParse(_) => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AuthorizerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // Not produced by the decision flow, which renders these as DENY
            AuthorizerError::MissingToken | AuthorizerError::InvalidToken(_) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Authentication required")
            }
            AuthorizerError::AccessDenied => (StatusCode::FORBIDDEN, "ACCESS_DENIED", "Access denied"),
            AuthorizerError::KeyFetch(err) => {
                // Log actual error server-side, return generic message to caller
                tracing::error!(target: "authorizer.errors", error = %err, "Verification key fetch failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred",
                )
            }
            AuthorizerError::ConfigParse(err) => {
                tracing::error!(target: "authorizer.errors", error = %err, "Rule configuration is invalid");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred",
                )
            }
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.to_string(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Convert JSON errors in the rule configuration to AuthorizerError
impl From<serde_json::Error> for AuthorizerError {
    fn from(err: serde_json::Error) -> Self {
        AuthorizerError::ConfigParse(err.to_string())
    }
}
