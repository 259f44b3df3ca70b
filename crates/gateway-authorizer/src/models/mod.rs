//! Gateway authorizer models.
//!
//! Contains the inbound request-authorizer event and the operational
//! response bodies.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Header carrying the bearer token.
pub const AUTHORIZATION_HEADER: &str = "authorization";

const BEARER_PREFIX: &str = "Bearer ";

/// Request-authorizer event sent by the gateway for every inbound call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerEvent {
    /// Request headers, `null` when the request carried none.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,

    /// Literal request path, e.g. `/v1/jobs/42`.
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub http_method: String,

    /// Route template as registered with the gateway, e.g. `/v1/jobs/{id}`.
    #[serde(default)]
    pub resource: String,

    /// ARN of the call being authorized.
    #[serde(default)]
    pub method_arn: String,
}

impl AuthorizerEvent {
    /// Authorization header value with any `Bearer ` prefix removed.
    ///
    /// The lowercase header name wins; otherwise any case-insensitive match
    /// is used. `None` only when no such header exists.
    pub fn bearer_token(&self) -> Option<&str> {
        let headers = self.headers.as_ref()?;

        let value = headers.get(AUTHORIZATION_HEADER).or_else(|| {
            headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION_HEADER))
                .map(|(_, value)| value)
        })?;

        let value = value.trim();
        Some(value.strip_prefix(BEARER_PREFIX).unwrap_or(value))
    }
}

/// Readiness response.
///
/// Returned by `/ready`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyResponse {
    /// "ready" or "not_ready".
    pub status: String,

    /// Configured token issuer.
    pub issuer: String,

    /// "cached" after the first successful key fetch, "pending" before.
    pub verification_key: String,

    /// "loaded" or "invalid".
    pub rules: String,

    /// Generic failure description, never internal detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
