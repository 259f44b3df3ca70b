//! Per-invocation authorization flow.
//!
//! ```text
//! extract bearer ── missing ──────────────► DENY "Empty token"   (principal "user")
//!       │
//!    verify ─────── failure ──────────────► DENY "Invalid token" (principal "user")
//!       │
//!  match rules ─► evaluate ── no group ──► DENY "Access denied" (principal = sub)
//!                     │
//!                     └──────────────────► ALLOW                 (principal = sub)
//! ```
//!
//! Key fetch and rule configuration failures are not decisions. They are
//! returned as errors and fail the invocation.

use crate::auth::claims::TokenClaims;
use crate::auth::key_cache::KeyMaterialCache;
use crate::auth::verifier::TokenVerifier;
use crate::config::Config;
use crate::errors::AuthorizerError;
use crate::models::AuthorizerEvent;
use crate::observability::metrics;
use crate::policy::{build_deny, build_policy, Decision, Effect, ANONYMOUS_PRINCIPAL};
use crate::rules::{evaluate, match_rules, RuleConfigStore, Verdict};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Authorization decision service.
///
/// Holds the two process-lifetime caches; everything else is per call.
pub struct Authorizer {
    key_cache: Arc<KeyMaterialCache>,
    verifier: TokenVerifier,
    rules: RuleConfigStore,
}

impl Authorizer {
    pub fn new(key_cache: Arc<KeyMaterialCache>, verifier: TokenVerifier, rules: RuleConfigStore) -> Self {
        Self {
            key_cache,
            verifier,
            rules,
        }
    }

    /// Wire caches and verifier from configuration. No I/O happens here.
    pub fn from_config(config: &Config) -> Self {
        let key_cache = Arc::new(KeyMaterialCache::new(
            config.key_discovery_url(),
            Duration::from_secs(config.key_fetch_timeout_seconds),
        ));

        let verifier = TokenVerifier::new(
            Arc::clone(&key_cache),
            config.issuer(),
            config.client_ids.clone(),
            config.allowed_algorithms.clone(),
        )
        .with_max_token_size(config.max_token_size_bytes);

        let rules = RuleConfigStore::new(config.group_role_config.clone());

        Self::new(key_cache, verifier, rules)
    }

    pub fn key_cache(&self) -> &KeyMaterialCache {
        &self.key_cache
    }

    pub fn rules(&self) -> &RuleConfigStore {
        &self.rules
    }

    /// Decide one gateway invocation.
    ///
    /// # Errors
    ///
    /// Returns `AuthorizerError::KeyFetch` or `AuthorizerError::ConfigParse`
    /// on infrastructure faults. Every authorization outcome is `Ok`.
    #[instrument(skip_all, fields(method = %event.http_method, resource = %event.resource))]
    pub async fn authorize(&self, event: &AuthorizerEvent) -> Result<Decision, AuthorizerError> {
        let start = Instant::now();

        let (decision, reason) = match self.authenticate(event).await {
            Ok(claims) => match self.check_access(&claims, event) {
                Ok(reason) => (allow(&claims, event), reason),
                Err(e) => deny(&claims.sub, e, event)?,
            },
            Err(e) => deny(ANONYMOUS_PRINCIPAL, e, event)?,
        };

        let effect = decision.effect().unwrap_or(Effect::Deny);
        metrics::record_decision(effect.as_str(), reason, start.elapsed());

        tracing::info!(
            target: "authorizer.handler",
            effect = effect.as_str(),
            reason = reason,
            path = %event.path,
            "Authorization decision"
        );

        Ok(decision)
    }

    async fn authenticate(&self, event: &AuthorizerEvent) -> Result<TokenClaims, AuthorizerError> {
        let raw_token = event.bearer_token().ok_or_else(|| {
            tracing::debug!(target: "authorizer.handler", "No authorization header");
            AuthorizerError::MissingToken
        })?;

        self.verifier.verify(raw_token).await
    }

    /// `Ok` carries the decision reason label of an allow; a refusal is
    /// `AccessDenied`.
    fn check_access(
        &self,
        claims: &TokenClaims,
        event: &AuthorizerEvent,
    ) -> Result<&'static str, AuthorizerError> {
        let config = self.rules.get_rule_config()?;
        let candidates = match_rules(&event.http_method, &event.path, &event.resource, config);

        match evaluate(claims, &candidates, &event.resource, &event.http_method) {
            Verdict::Granted => Ok("granted"),
            Verdict::DefaultAllow => Ok("default_allow"),
            Verdict::Denied => Err(AuthorizerError::AccessDenied),
        }
    }
}

/// Render an authorization outcome as a DENY for `principal`; infrastructure
/// faults are returned as-is.
fn deny(
    principal: &str,
    error: AuthorizerError,
    event: &AuthorizerEvent,
) -> Result<(Decision, &'static str), AuthorizerError> {
    match error.deny_reason() {
        Some(reason) => Ok((build_deny(principal, reason, &event.method_arn), reason.label())),
        None => {
            tracing::error!(target: "authorizer.handler", error = %error, "Authorization failed");
            Err(error)
        }
    }
}

fn allow(claims: &TokenClaims, event: &AuthorizerEvent) -> Decision {
    build_policy(&claims.sub, Effect::Allow, &event.method_arn, BTreeMap::new())
}
