//! Verification key cache for the identity provider's signing key.
//!
//! The realm document at `{KEYCLOAK_URL}/realms/{realm}` publishes the
//! realm's public key as a bare base64 `public_key` field. The first caller
//! fetches it, frames it as a PEM block, and every later caller reuses it for
//! the rest of the process lifetime.
//!
//! # Lifecycle
//!
//! - Populate-once: concurrent cold-start callers wait on a single fetch
//! - Never refreshed: an issuer-side key rotation causes verification
//!   failures until the process is recycled
//! - A failed fetch is not cached; the failing call returns `KeyFetch` and
//!   the next call tries again

use crate::errors::AuthorizerError;
use crate::observability::metrics;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::instrument;

/// Realm document returned by the key discovery endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RealmInfo {
    /// Base64 `SubjectPublicKeyInfo`, without PEM framing.
    #[serde(default)]
    pub public_key: Option<String>,
}

/// Verification key material plus the URL it was fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationKey {
    pem: String,
    source_url: String,
}

impl VerificationKey {
    pub fn new(pem: String, source_url: String) -> Self {
        Self { pem, source_url }
    }

    /// PEM-framed public key.
    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

/// Process-lifetime cache of the issuer's verification key.
pub struct KeyMaterialCache {
    /// Realm document URL.
    discovery_url: String,

    /// HTTP client for the discovery fetch.
    http_client: reqwest::Client,

    /// Populated at most once.
    key: OnceCell<Arc<VerificationKey>>,
}

impl KeyMaterialCache {
    /// Create a cache for `discovery_url`; `timeout` bounds the fetch.
    pub fn new(discovery_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "authorizer.auth.keys", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            discovery_url,
            http_client,
            key: OnceCell::new(),
        }
    }

    /// Create a cache that already holds `key`. No network I/O ever happens.
    pub fn preloaded(key: VerificationKey) -> Self {
        Self {
            discovery_url: key.source_url().to_string(),
            http_client: reqwest::Client::new(),
            key: OnceCell::new_with(Some(Arc::new(key))),
        }
    }

    /// Get the verification key, fetching it on the first call.
    ///
    /// # Errors
    ///
    /// Returns `AuthorizerError::KeyFetch` if the discovery request fails,
    /// returns a non-success status, or lacks a usable `public_key`.
    #[instrument(skip_all)]
    pub async fn get_verification_key(&self) -> Result<Arc<VerificationKey>, AuthorizerError> {
        if let Some(key) = self.key.get() {
            tracing::trace!(target: "authorizer.auth.keys", "Verification key cache hit");
            return Ok(Arc::clone(key));
        }

        self.key
            .get_or_try_init(|| self.fetch())
            .await
            .map(Arc::clone)
    }

    /// Whether the key has been fetched. Never triggers a fetch.
    pub fn is_cached(&self) -> bool {
        self.key.initialized()
    }

    pub fn discovery_url(&self) -> &str {
        &self.discovery_url
    }

    async fn fetch(&self) -> Result<Arc<VerificationKey>, AuthorizerError> {
        let start = Instant::now();
        let result = self.fetch_uncached().await;

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_key_fetch(status, start.elapsed());

        result.map(Arc::new)
    }

    async fn fetch_uncached(&self) -> Result<VerificationKey, AuthorizerError> {
        tracing::debug!(target: "authorizer.auth.keys", url = %self.discovery_url, "Fetching verification key");

        let response = self
            .http_client
            .get(&self.discovery_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "authorizer.auth.keys", error = %e, "Failed to fetch verification key");
                AuthorizerError::KeyFetch(format!("request failed: {}", e))
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "authorizer.auth.keys",
                status = %response.status(),
                "Key discovery endpoint returned error"
            );
            return Err(AuthorizerError::KeyFetch(format!(
                "discovery endpoint returned {}",
                response.status()
            )));
        }

        let realm: RealmInfo = response.json().await.map_err(|e| {
            tracing::error!(target: "authorizer.auth.keys", error = %e, "Failed to parse realm document");
            AuthorizerError::KeyFetch(format!("invalid realm document: {}", e))
        })?;

        let body = realm
            .public_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                tracing::error!(target: "authorizer.auth.keys", "Realm document has no public_key");
                AuthorizerError::KeyFetch("realm document is missing public_key".to_string())
            })?;

        let pem = common::jwt::format_public_key_pem(&body).map_err(|e| {
            tracing::error!(target: "authorizer.auth.keys", error = %e, "public_key is not valid base64");
            AuthorizerError::KeyFetch(format!("public_key is not valid base64: {}", e))
        })?;

        tracing::info!(
            target: "authorizer.auth.keys",
            url = %self.discovery_url,
            "Verification key cached for process lifetime"
        );

        Ok(VerificationKey::new(pem, self.discovery_url.clone()))
    }
}
