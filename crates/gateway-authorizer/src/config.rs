//! Gateway authorizer configuration.
//!
//! Configuration is loaded from environment variables. The raw rule mapping
//! is kept as the source string here and parsed lazily by
//! [`RuleConfigStore`](crate::rules::config_store::RuleConfigStore).

use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default identity provider realm.
pub const DEFAULT_REALM: &str = "master";

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Timeout applied to every HTTP request in seconds.
pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default timeout for the verification key fetch in seconds.
pub const DEFAULT_KEY_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the key fetch timeout in seconds.
///
/// Must stay below `REQUEST_TIMEOUT_SECONDS` so a slow cold fetch fails as
/// `KeyFetch` instead of being cut off by the request timeout.
pub const MAX_KEY_FETCH_TIMEOUT_SECONDS: u64 = REQUEST_TIMEOUT_SECONDS - 5;

const _: () = assert!(DEFAULT_KEY_FETCH_TIMEOUT_SECONDS <= MAX_KEY_FETCH_TIMEOUT_SECONDS);

/// Lower bound for the raw token size limit in bytes.
pub const MIN_JWT_SIZE_LIMIT_BYTES: usize = 1024;

/// Upper bound for the raw token size limit in bytes.
pub const MAX_JWT_SIZE_LIMIT_BYTES: usize = 256 * 1024;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Gateway authorizer configuration.
///
/// The rule mapping source is omitted from Debug output; it can be large and
/// is logged separately as an entry count once parsed.
#[derive(Clone)]
pub struct Config {
    /// Identity provider base URL, without trailing slash.
    pub keycloak_url: String,

    /// Realm name under the identity provider.
    pub realm: String,

    /// Accepted authorized-party (`azp`) client identifiers. Never empty.
    pub client_ids: Vec<String>,

    /// JSON-encoded path-pattern to rule mapping.
    pub group_role_config: Option<String>,

    /// Pinned signing algorithms. `None` trusts the token header's
    /// declared asymmetric algorithm.
    pub allowed_algorithms: Option<Vec<Algorithm>>,

    /// Raw bearer tokens longer than this are rejected before parsing.
    pub max_token_size_bytes: usize,

    /// Timeout of the verification key fetch in seconds.
    pub key_fetch_timeout_seconds: u64,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Log output format (default: text).
    pub log_format: LogFormat,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("keycloak_url", &self.keycloak_url)
            .field("realm", &self.realm)
            .field("client_ids", &self.client_ids)
            .field(
                "group_role_config",
                &self.group_role_config.as_ref().map(|_| "[OMITTED]"),
            )
            .field("allowed_algorithms", &self.allowed_algorithms)
            .field("max_token_size_bytes", &self.max_token_size_bytes)
            .field("key_fetch_timeout_seconds", &self.key_fetch_timeout_seconds)
            .field("bind_address", &self.bind_address)
            .field("log_format", &self.log_format)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("At least one of KEYCLOAK_CLIENT_ID or M2M_KEYCLOAK_CLIENT_ID must be set")]
    MissingClientId,

    #[error("Invalid JWT algorithm configuration: {0}")]
    InvalidAlgorithms(String),

    #[error("Invalid token size limit configuration: {0}")]
    InvalidTokenSizeLimit(String),

    #[error("Invalid key fetch timeout configuration: {0}")]
    InvalidKeyFetchTimeout(String),

    #[error("Invalid log format configuration: {0}")]
    InvalidLogFormat(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let keycloak_url = vars
            .get("KEYCLOAK_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("KEYCLOAK_URL".to_string()))?;

        let realm = vars
            .get("KEYCLOAK_REALM")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_REALM.to_string());

        // Unset client ids must never match a token without azp
        let client_ids: Vec<String> = ["KEYCLOAK_CLIENT_ID", "M2M_KEYCLOAK_CLIENT_ID"]
            .iter()
            .filter_map(|name| vars.get(*name))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();

        if client_ids.is_empty() {
            return Err(ConfigError::MissingClientId);
        }

        let group_role_config = vars
            .get("GROUP_ROLE_CONFIG")
            .filter(|v| !v.trim().is_empty())
            .cloned();

        let allowed_algorithms = match vars.get("JWT_ALLOWED_ALGORITHMS") {
            Some(value) if !value.trim().is_empty() => Some(parse_algorithms(value)?),
            _ => None,
        };

        let max_token_size_bytes = if let Some(value_str) = vars.get("JWT_MAX_SIZE_BYTES") {
            let value: usize = value_str.parse().map_err(|e| {
                ConfigError::InvalidTokenSizeLimit(format!(
                    "JWT_MAX_SIZE_BYTES must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if !(MIN_JWT_SIZE_LIMIT_BYTES..=MAX_JWT_SIZE_LIMIT_BYTES).contains(&value) {
                return Err(ConfigError::InvalidTokenSizeLimit(format!(
                    "JWT_MAX_SIZE_BYTES must be between {} and {}, got {}",
                    MIN_JWT_SIZE_LIMIT_BYTES, MAX_JWT_SIZE_LIMIT_BYTES, value
                )));
            }

            value
        } else {
            common::jwt::DEFAULT_MAX_JWT_SIZE_BYTES
        };

        let key_fetch_timeout_seconds =
            if let Some(value_str) = vars.get("KEY_FETCH_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidKeyFetchTimeout(format!(
                        "KEY_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 {
                    return Err(ConfigError::InvalidKeyFetchTimeout(
                        "KEY_FETCH_TIMEOUT_SECONDS must be greater than 0".to_string(),
                    ));
                }

                if value > MAX_KEY_FETCH_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidKeyFetchTimeout(format!(
                        "KEY_FETCH_TIMEOUT_SECONDS must not exceed {} seconds, got {}",
                        MAX_KEY_FETCH_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_KEY_FETCH_TIMEOUT_SECONDS
            };

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let log_format = match vars.get("LOG_FORMAT").map(|v| v.trim().to_ascii_lowercase()) {
            None => LogFormat::Text,
            Some(v) if v.is_empty() || v == "text" => LogFormat::Text,
            Some(v) if v == "json" => LogFormat::Json,
            Some(v) => {
                return Err(ConfigError::InvalidLogFormat(format!(
                    "LOG_FORMAT must be 'text' or 'json', got '{}'",
                    v
                )))
            }
        };

        Ok(Config {
            keycloak_url,
            realm,
            client_ids,
            group_role_config,
            allowed_algorithms,
            max_token_size_bytes,
            key_fetch_timeout_seconds,
            bind_address,
            log_format,
        })
    }

    /// Expected `iss` claim: `{KEYCLOAK_URL}/realms/{KEYCLOAK_REALM}`.
    pub fn issuer(&self) -> String {
        format!("{}/realms/{}", self.keycloak_url, self.realm)
    }

    /// Realm document carrying the issuer's `public_key`.
    pub fn key_discovery_url(&self) -> String {
        self.issuer()
    }
}

/// Parse a comma-separated algorithm pin list. HMAC algorithms are refused.
fn parse_algorithms(value: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let mut algorithms = Vec::new();

    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let alg = Algorithm::from_str(name).map_err(|_| {
            ConfigError::InvalidAlgorithms(format!(
                "JWT_ALLOWED_ALGORITHMS contains unknown algorithm '{}'",
                name
            ))
        })?;

        if !common::jwt::is_asymmetric(alg) {
            return Err(ConfigError::InvalidAlgorithms(format!(
                "JWT_ALLOWED_ALGORITHMS must not contain symmetric algorithm '{}'",
                name
            )));
        }

        if !algorithms.contains(&alg) {
            algorithms.push(alg);
        }
    }

    if algorithms.is_empty() {
        return Err(ConfigError::InvalidAlgorithms(
            "JWT_ALLOWED_ALGORITHMS must list at least one algorithm".to_string(),
        ));
    }

    Ok(algorithms)
}
