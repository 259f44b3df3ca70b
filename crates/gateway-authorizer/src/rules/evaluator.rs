//! Access evaluation over matched rules.
//!
//! # Default-allow
//!
//! When no rule anywhere covers the request's method and path, the request is
//! ALLOWED. This fail-open fallback is intended business policy: routes are
//! open until a rule names them. Each occurrence is logged at warn level and
//! counted in `authorizer_default_allow_total`.

use crate::auth::claims::TokenClaims;
use crate::observability::metrics;
use crate::rules::AccessRule;

/// Outcome of evaluating a verified caller against candidate rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A candidate rule names one of the caller's groups.
    Granted,
    /// Candidates exist but none names a caller group.
    Denied,
    /// No candidate rules for this method and path.
    DefaultAllow,
}

/// Decide access for `claims` given the candidates from `match_rules`.
///
/// Configured group `admins` matches the claim value `/admins`. A single
/// group in common with ANY candidate is enough.
pub fn evaluate(
    claims: &TokenClaims,
    candidates: &[&AccessRule],
    resource: &str,
    method: &str,
) -> Verdict {
    if candidates.is_empty() {
        tracing::warn!(
            target: "authorizer.rules",
            resource = %resource,
            method = %method,
            "No access rule matched, allowing by default"
        );
        metrics::record_default_allow(method);
        return Verdict::DefaultAllow;
    }

    let granted = candidates.iter().any(|rule| {
        rule.groups
            .iter()
            .any(|group| claims.is_member_of(&format!("/{}", group)))
    });

    if granted {
        Verdict::Granted
    } else {
        tracing::debug!(
            target: "authorizer.rules",
            resource = %resource,
            method = %method,
            candidates = candidates.len(),
            "Caller is in none of the required groups"
        );
        Verdict::Denied
    }
}
