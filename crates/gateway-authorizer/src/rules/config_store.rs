//! Process-lifetime store for the rule mapping.
//!
//! The source string is parsed on first use and the result kept until the
//! process exits. A parse failure is returned to the caller and nothing is
//! stored, so every later call reports the same error.

use crate::errors::AuthorizerError;
use crate::rules::RuleConfig;
use once_cell::sync::OnceCell;

pub struct RuleConfigStore {
    source: Option<String>,
    config: OnceCell<RuleConfig>,
}

impl RuleConfigStore {
    /// Store for a raw JSON source. `None` or a blank string means no rules.
    pub fn new(source: Option<String>) -> Self {
        Self {
            source,
            config: OnceCell::new(),
        }
    }

    /// Store that already holds a parsed mapping.
    pub fn preloaded(config: RuleConfig) -> Self {
        Self {
            source: None,
            config: OnceCell::with_value(config),
        }
    }

    /// Get the rule mapping, parsing the source on the first call.
    ///
    /// # Errors
    ///
    /// Returns `AuthorizerError::ConfigParse` if the source is malformed.
    pub fn get_rule_config(&self) -> Result<&RuleConfig, AuthorizerError> {
        self.config.get_or_try_init(|| {
            let config = match self.source.as_deref().map(str::trim) {
                None | Some("") => RuleConfig::empty(),
                Some(source) => RuleConfig::from_json(source).map_err(|e| {
                    tracing::error!(target: "authorizer.rules", error = %e, "Failed to parse rule configuration");
                    e
                })?,
            };

            if config.is_empty() {
                tracing::warn!(
                    target: "authorizer.rules",
                    "Rule configuration is empty, every request will be allowed by default"
                );
            } else {
                tracing::info!(target: "authorizer.rules", patterns = config.len(), "Rule configuration loaded");
            }

            Ok(config)
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.config.get().is_some()
    }
}
