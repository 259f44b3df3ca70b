//! Path-based access rules.
//!
//! The rule mapping is a JSON object from path pattern to a list of rules:
//!
//! ```json
//! {
//!   "/v1/jobs/{id}": [ { "method": ["GET"], "group": ["ops", "admins"] } ],
//!   "/v1/jobs/*":    [ { "method": ["DELETE"], "group": ["admins"] } ]
//! }
//! ```
//!
//! Entry order follows the JSON document. Duplicate patterns are kept as
//! separate entries and simply contribute more candidates.

pub mod config_store;
pub mod evaluator;
pub mod matcher;

pub use config_store::RuleConfigStore;
pub use evaluator::{evaluate, Verdict};
pub use matcher::{match_rules, PathPattern};

use crate::errors::AuthorizerError;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;

/// Methods allowed and groups required for one path pattern.
///
/// Group names are configured without the leading `/` that group claims carry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AccessRule {
    #[serde(rename = "method")]
    pub methods: Vec<String>,

    /// Any one of these grants access.
    #[serde(rename = "group")]
    pub groups: Vec<String>,
}

impl AccessRule {
    /// Case-sensitive method check.
    pub fn allows_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }
}

/// A compiled path pattern and the rules attached to it.
#[derive(Debug, Clone)]
pub struct RuleEntry {
    pub pattern: PathPattern,
    pub rules: Vec<AccessRule>,
}

/// Ordered path pattern to rule mapping, immutable after load.
#[derive(Debug, Clone, Default)]
pub struct RuleConfig {
    entries: Vec<RuleEntry>,
}

impl RuleConfig {
    /// A mapping with no rules. Every request falls through to default-allow.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse and compile a JSON rule mapping.
    ///
    /// # Errors
    ///
    /// Returns `AuthorizerError::ConfigParse` if the document is not a JSON
    /// object of rule arrays, a rule lacks `method` or `group`, or a pattern
    /// cannot be compiled.
    pub fn from_json(source: &str) -> Result<Self, AuthorizerError> {
        let raw: RawRuleConfig = serde_json::from_str(source)?;

        let entries = raw
            .0
            .into_iter()
            .map(|(pattern, rules)| {
                Ok(RuleEntry {
                    pattern: PathPattern::compile(&pattern)?,
                    rules,
                })
            })
            .collect::<Result<Vec<_>, AuthorizerError>>()?;

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[RuleEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of path patterns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// JSON object kept as a list so document order and duplicate keys survive.
struct RawRuleConfig(Vec<(String, Vec<AccessRule>)>);

impl<'de> Deserialize<'de> for RawRuleConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RawVisitor;

        impl<'de> Visitor<'de> for RawVisitor {
            type Value = RawRuleConfig;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping path patterns to rule arrays")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((pattern, rules)) = map.next_entry::<String, Vec<AccessRule>>()? {
                    entries.push((pattern, rules));
                }
                Ok(RawRuleConfig(entries))
            }
        }

        deserializer.deserialize_map(RawVisitor)
    }
}
