//! Path pattern compilation and rule matching.
//!
//! A pattern is tried in this order:
//!
//! 1. Exact: equals the literal request path or the gateway's resource
//!    template (e.g. `/v1/jobs/{id}` verbatim)
//! 2. Wildcard: contains `*`; each `*` matches any character sequence,
//!    including `/`
//! 3. Path variable: contains `{name}`; each placeholder matches one
//!    non-empty segment without `/`
//!
//! Regex forms are anchored at both ends and compiled once at load time.
//! Patterns without a leading `/` are rooted, so `group-mgmt` is `/group-mgmt`.

use crate::errors::AuthorizerError;
use crate::rules::{AccessRule, RuleConfig};
use regex::Regex;
use std::sync::LazyLock;

/// Placeholder syntax: `{` alphanumeric name `}`.
#[allow(clippy::expect_used)] // literal regex, covered by tests
static PATH_VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[a-zA-Z0-9]+\}").expect("path variable regex is valid"));

const WILDCARD_REGEX: &str = ".*";
const SEGMENT_REGEX: &str = "([^/]+)";

/// How a compiled pattern matches beyond exact equality.
#[derive(Debug, Clone)]
enum Strategy {
    Literal,
    Wildcard(Regex),
    Variable(Regex),
}

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// Rooted pattern text.
    pattern: String,
    strategy: Strategy,
}

impl PathPattern {
    /// Compile a pattern from the rule mapping.
    ///
    /// # Errors
    ///
    /// Returns `AuthorizerError::ConfigParse` if the generated regex is
    /// rejected.
    pub fn compile(raw: &str) -> Result<Self, AuthorizerError> {
        let pattern = if raw.starts_with('/') {
            raw.to_string()
        } else {
            format!("/{}", raw)
        };

        let strategy = if pattern.contains('*') {
            Strategy::Wildcard(anchored(&wildcard_regex(&pattern))?)
        } else if pattern.contains('{') {
            Strategy::Variable(anchored(&variable_regex(&pattern))?)
        } else {
            Strategy::Literal
        };

        Ok(Self { pattern, strategy })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Whether this pattern covers the request.
    pub fn matches(&self, path: &str, resource: &str) -> bool {
        if self.pattern == path || self.pattern == resource {
            return true;
        }

        match &self.strategy {
            Strategy::Literal => false,
            Strategy::Wildcard(re) | Strategy::Variable(re) => re.is_match(path),
        }
    }
}

fn wildcard_regex(pattern: &str) -> String {
    pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(WILDCARD_REGEX)
}

fn variable_regex(pattern: &str) -> String {
    PATH_VARIABLE
        .split(pattern)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(SEGMENT_REGEX)
}

fn anchored(body: &str) -> Result<Regex, AuthorizerError> {
    Regex::new(&format!("^{}$", body)).map_err(|e| {
        tracing::error!(target: "authorizer.rules", error = %e, "Failed to compile path pattern");
        AuthorizerError::ConfigParse(format!("invalid path pattern: {}", e))
    })
}

/// Collect every rule that covers `method` on the request.
///
/// Candidates keep mapping order. No specificity ranking is applied.
pub fn match_rules<'a>(
    method: &str,
    path: &str,
    resource: &str,
    config: &'a RuleConfig,
) -> Vec<&'a AccessRule> {
    config
        .entries()
        .iter()
        .filter(|entry| entry.pattern.matches(path, resource))
        .flat_map(|entry| entry.rules.iter())
        .filter(|rule| rule.allows_method(method))
        .collect()
}
