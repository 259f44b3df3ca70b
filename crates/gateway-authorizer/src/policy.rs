//! Gateway policy documents.
//!
//! Every authorization outcome, ALLOW or DENY, is rendered as:
//!
//! ```json
//! {
//!   "principalId": "user-123",
//!   "policyDocument": {
//!     "Version": "2012-10-17",
//!     "Statement": [
//!       { "Effect": "Deny", "Action": "execute-api:Invoke", "Resource": "arn:..." }
//!     ]
//!   },
//!   "context": { "error": "Access denied" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Policy language version understood by the gateway.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Action granted or denied by every statement.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Principal used when no verified subject exists yet.
pub const ANONYMOUS_PRINCIPAL: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    EmptyToken,
    InvalidToken,
    AccessDenied,
}

impl DenyReason {
    /// Machine-readable reason code.
    pub fn code(self) -> &'static str {
        match self {
            DenyReason::EmptyToken => "Empty token",
            DenyReason::InvalidToken => "Invalid token",
            DenyReason::AccessDenied => "Access denied",
        }
    }

    /// Bounded metric label.
    pub fn label(self) -> &'static str {
        match self {
            DenyReason::EmptyToken => "empty_token",
            DenyReason::InvalidToken => "invalid_token",
            DenyReason::AccessDenied => "access_denied",
        }
    }

    fn description(self) -> Option<&'static str> {
        match self {
            DenyReason::EmptyToken => Some("Token is missing in the request header!"),
            DenyReason::InvalidToken => Some("The provided token is invalid or expired!"),
            DenyReason::AccessDenied => None,
        }
    }

    /// Context attached to the DENY document.
    pub fn context(self) -> BTreeMap<String, String> {
        let mut context = BTreeMap::from([("error".to_string(), self.code().to_string())]);
        if let Some(description) = self.description() {
            context.insert("errorDescription".to_string(), description.to_string());
        }
        context
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "Effect")]
    pub effect: Effect,

    #[serde(rename = "Action")]
    pub action: String,

    #[serde(rename = "Resource")]
    pub resource: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version")]
    pub version: String,

    #[serde(rename = "Statement")]
    pub statement: Vec<Statement>,
}

/// The document returned to the gateway for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl Decision {
    /// Effect of the single statement.
    pub fn effect(&self) -> Option<Effect> {
        self.policy_document.statement.first().map(|s| s.effect)
    }
}

/// Build a single-statement policy document. Pure and infallible.
pub fn build_policy(
    principal: &str,
    effect: Effect,
    resource_arn: &str,
    context: BTreeMap<String, String>,
) -> Decision {
    Decision {
        principal_id: principal.to_string(),
        policy_document: PolicyDocument {
            version: POLICY_VERSION.to_string(),
            statement: vec![Statement {
                effect,
                action: INVOKE_ACTION.to_string(),
                resource: resource_arn.to_string(),
            }],
        },
        context,
    }
}

/// DENY document carrying the reason's context.
pub fn build_deny(principal: &str, reason: DenyReason, resource_arn: &str) -> Decision {
    build_policy(principal, Effect::Deny, resource_arn, reason.context())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const ARN: &str = "arn:aws:execute-api:eu-west-1:123456789012:abc123/prod/GET/v1/jobs";

    #[test]
    fn test_allow_round_trip() {
        let decision = build_policy("user-1", Effect::Allow, ARN, BTreeMap::new());

        assert_eq!(decision.effect(), Some(Effect::Allow));
        assert_eq!(decision.policy_document.statement.len(), 1);
        assert_eq!(decision.policy_document.statement[0].resource, ARN);
        assert!(decision.context.is_empty());
    }

    #[test]
    fn test_wire_shape() {
        let decision = build_policy("user-1", Effect::Allow, ARN, BTreeMap::new());
        let json = serde_json::to_value(&decision).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "principalId": "user-1",
                "policyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Action": "execute-api:Invoke",
                        "Resource": ARN
                    }]
                },
                "context": {}
            })
        );
    }

    #[test]
    fn test_deny_contexts() {
        let empty = build_deny(ANONYMOUS_PRINCIPAL, DenyReason::EmptyToken, ARN);
        assert_eq!(empty.principal_id, "user");
        assert_eq!(empty.effect(), Some(Effect::Deny));
        assert_eq!(empty.context["error"], "Empty token");
        assert_eq!(
            empty.context["errorDescription"],
            "Token is missing in the request header!"
        );

        let invalid = build_deny(ANONYMOUS_PRINCIPAL, DenyReason::InvalidToken, ARN);
        assert_eq!(invalid.context["error"], "Invalid token");
        assert_eq!(
            invalid.context["errorDescription"],
            "The provided token is invalid or expired!"
        );

        let denied = build_deny("user-1", DenyReason::AccessDenied, ARN);
        assert_eq!(denied.principal_id, "user-1");
        assert_eq!(denied.context.len(), 1);
        assert_eq!(denied.context["error"], "Access denied");
    }

    #[test]
    fn test_decision_deserializes_from_wire() {
        let json = serde_json::to_string(&build_deny("u", DenyReason::AccessDenied, ARN)).unwrap();
        let parsed: Decision = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.effect(), Some(Effect::Deny));
    }

    #[test]
    fn test_effect_names() {
        assert_eq!(Effect::Allow.as_str(), "Allow");
        assert_eq!(Effect::Deny.as_str(), "Deny");
    }
}
