//! Bearer token verification.
//!
//! Verifies signature, issuer, expiry, and authorized party of incoming
//! tokens using the cached verification key.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The signing algorithm is read from the token header and is
//!   caller-controlled. HMAC algorithms are always refused; when
//!   `JWT_ALLOWED_ALGORITHMS` is configured only pinned algorithms pass
//! - The `aud` claim is NOT validated. The authorized-party (`azp`) check
//!   against the configured client ids stands in for it
//! - Expiry has zero leeway
//! - Every failure maps to the same opaque `InvalidToken`; the sub-reason is
//!   only logged

use crate::auth::claims::TokenClaims;
use crate::auth::key_cache::{KeyMaterialCache, VerificationKey};
use crate::errors::AuthorizerError;
use common::jwt::{decode_unverified_algorithm, decoding_key_for, DEFAULT_MAX_JWT_SIZE_BYTES};
use jsonwebtoken::{decode, Algorithm, Validation};
use std::sync::Arc;
use tracing::instrument;

/// Message carried by every `InvalidToken` produced here.
pub const INVALID_TOKEN_MESSAGE: &str = "The provided token is invalid or expired";

fn invalid_token() -> AuthorizerError {
    AuthorizerError::InvalidToken(INVALID_TOKEN_MESSAGE.to_string())
}

/// Token verifier bound to one issuer and a set of accepted clients.
pub struct TokenVerifier {
    /// Cache for the issuer's verification key.
    key_cache: Arc<KeyMaterialCache>,

    /// Expected `iss` claim.
    issuer: String,

    /// Accepted `azp` values.
    accepted_clients: Vec<String>,

    /// Pinned algorithms, `None` trusts the header's asymmetric algorithm.
    allowed_algorithms: Option<Vec<Algorithm>>,

    /// Tokens longer than this many bytes are rejected unparsed.
    max_token_size: usize,
}

impl TokenVerifier {
    pub fn new(
        key_cache: Arc<KeyMaterialCache>,
        issuer: String,
        accepted_clients: Vec<String>,
        allowed_algorithms: Option<Vec<Algorithm>>,
    ) -> Self {
        Self {
            key_cache,
            issuer,
            accepted_clients,
            allowed_algorithms,
            max_token_size: DEFAULT_MAX_JWT_SIZE_BYTES,
        }
    }

    /// Override the raw token size limit.
    pub fn with_max_token_size(mut self, max_token_size: usize) -> Self {
        self.max_token_size = max_token_size;
        self
    }

    /// Verify a raw bearer token and return its claims.
    ///
    /// # Checks
    ///
    /// 1. Size check and unverified header parse for the declared algorithm
    /// 2. Algorithm policy (no HMAC, pinned list if configured)
    /// 3. Signature against the cached verification key
    /// 4. `iss` equals the configured issuer exactly
    /// 5. `exp` has not passed
    /// 6. `azp` is one of the accepted client ids
    ///
    /// # Errors
    ///
    /// Returns `AuthorizerError::InvalidToken` for every verification failure.
    /// Returns `AuthorizerError::KeyFetch` if the key cannot be fetched.
    #[instrument(skip_all)]
    pub async fn verify(&self, raw_token: &str) -> Result<TokenClaims, AuthorizerError> {
        let alg = decode_unverified_algorithm(raw_token, self.max_token_size).map_err(|e| {
            tracing::debug!(target: "authorizer.auth.verify", error = ?e, "Token header rejected");
            invalid_token()
        })?;

        self.check_algorithm(alg)?;

        // Key fetch failures are infrastructure faults and propagate as-is
        let key = self.key_cache.get_verification_key().await?;

        let claims = self.verify_with_key(raw_token, alg, &key)?;

        tracing::debug!(target: "authorizer.auth.verify", "Token verified successfully");
        Ok(claims)
    }

    fn check_algorithm(&self, alg: Algorithm) -> Result<(), AuthorizerError> {
        if !common::jwt::is_asymmetric(alg) {
            tracing::warn!(target: "authorizer.auth.verify", alg = ?alg, "Symmetric token algorithm rejected");
            return Err(invalid_token());
        }

        if let Some(allowed) = &self.allowed_algorithms {
            if !allowed.contains(&alg) {
                tracing::debug!(target: "authorizer.auth.verify", alg = ?alg, "Token algorithm not in pinned list");
                return Err(invalid_token());
            }
        }

        Ok(())
    }

    /// Signature and claim checks against an already resolved key.
    fn verify_with_key(
        &self,
        raw_token: &str,
        alg: Algorithm,
        key: &VerificationKey,
    ) -> Result<TokenClaims, AuthorizerError> {
        let decoding_key = decoding_key_for(alg, key.pem()).map_err(|e| {
            tracing::debug!(target: "authorizer.auth.verify", alg = ?alg, error = ?e, "No decoding key for algorithm");
            invalid_token()
        })?;

        let mut validation = Validation::new(alg);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.validate_exp = true;
        validation.leeway = 0;
        // Audience is covered by the azp check below
        validation.validate_aud = false;

        let token_data = decode::<TokenClaims>(raw_token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(target: "authorizer.auth.verify", error = %e, "Token verification failed");
            invalid_token()
        })?;

        let claims = token_data.claims;

        match claims.azp.as_deref() {
            Some(azp) if self.accepted_clients.iter().any(|c| c == azp) => Ok(claims),
            Some(azp) => {
                tracing::warn!(target: "authorizer.auth.verify", azp = %azp, "Token issued to unrecognized client");
                Err(invalid_token())
            }
            None => {
                tracing::warn!(target: "authorizer.auth.verify", "Token has no authorized party");
                Err(invalid_token())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use authorizer_test_utils::{with_forged_header, TestKeypair, TestRsaKeypair, TestTokenBuilder};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const ISSUER: &str = "https://idp.example.com/realms/test";

    fn verifier_for(keypair: &TestKeypair, allowed: Option<Vec<Algorithm>>) -> TokenVerifier {
        let cache = KeyMaterialCache::preloaded(VerificationKey::new(
            keypair.public_key_pem(),
            ISSUER.to_string(),
        ));
        TokenVerifier::new(
            Arc::new(cache),
            ISSUER.to_string(),
            vec!["web-app".to_string(), "batch-runner".to_string()],
            allowed,
        )
    }

    fn valid_claims() -> TestTokenBuilder {
        TestTokenBuilder::new()
            .issued_by(ISSUER)
            .for_client("web-app")
            .with_groups(&["/admins"])
    }

    fn assert_invalid(result: Result<TokenClaims, AuthorizerError>) {
        assert!(
            matches!(&result, Err(AuthorizerError::InvalidToken(msg)) if msg == INVALID_TOKEN_MESSAGE),
            "Expected opaque InvalidToken, got {:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_valid_token_returns_claims() {
        let keypair = TestKeypair::new(1);
        let token = keypair.sign(&valid_claims().for_user("alice").build());

        let claims = verifier_for(&keypair, None).verify(&token).await.unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.iss, ISSUER);
        assert!(claims.is_member_of("/admins"));
    }

    #[tokio::test]
    async fn test_m2m_client_accepted() {
        let keypair = TestKeypair::new(1);
        let token = keypair.sign(&valid_claims().for_client("batch-runner").build());

        assert!(verifier_for(&keypair, None).verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_signing_key_rejected() {
        let signer = TestKeypair::new(2);
        let verifier_key = TestKeypair::new(1);
        let token = signer.sign(&valid_claims().build());

        assert_invalid(verifier_for(&verifier_key, None).verify(&token).await);
    }

    #[tokio::test]
    async fn test_tampered_payload_rejected() {
        let keypair = TestKeypair::new(1);
        let token = keypair.sign(&valid_claims().build());
        let other = keypair.sign(&valid_claims().for_user("mallory").build());

        // Splice the second payload under the first signature
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert_invalid(verifier_for(&keypair, None).verify(&spliced).await);
    }

    #[tokio::test]
    async fn test_wrong_issuer_rejected() {
        let keypair = TestKeypair::new(1);
        let token = keypair.sign(
            &valid_claims()
                .issued_by("https://idp.example.com/realms/other")
                .build(),
        );

        assert_invalid(verifier_for(&keypair, None).verify(&token).await);
    }

    #[tokio::test]
    async fn test_issuer_prefix_is_not_enough() {
        let keypair = TestKeypair::new(1);
        let token = keypair.sign(&valid_claims().issued_by(&format!("{}/", ISSUER)).build());

        assert_invalid(verifier_for(&keypair, None).verify(&token).await);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let keypair = TestKeypair::new(1);
        let token = keypair.sign(&valid_claims().expires_in(-5).build());

        assert_invalid(verifier_for(&keypair, None).verify(&token).await);
    }

    #[tokio::test]
    async fn test_unrecognized_client_rejected() {
        let keypair = TestKeypair::new(1);
        let token = keypair.sign(&valid_claims().for_client("someone-else").build());

        assert_invalid(verifier_for(&keypair, None).verify(&token).await);
    }

    #[tokio::test]
    async fn test_missing_azp_rejected() {
        let keypair = TestKeypair::new(1);
        let token = keypair.sign(&valid_claims().without_client().build());

        assert_invalid(verifier_for(&keypair, None).verify(&token).await);
    }

    #[tokio::test]
    async fn test_audience_not_validated() {
        let keypair = TestKeypair::new(1);
        let mut claims = valid_claims().build();
        claims["aud"] = serde_json::json!("some-unrelated-audience");
        let token = keypair.sign(&claims);

        assert!(verifier_for(&keypair, None).verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_hmac_token_signed_with_public_key_rejected() {
        // Classic algorithm confusion: HS256 keyed with the public PEM
        let keypair = TestKeypair::new(1);
        let pem = keypair.public_key_pem();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &valid_claims().build(),
            &EncodingKey::from_secret(pem.as_bytes()),
        )
        .unwrap();

        assert_invalid(verifier_for(&keypair, None).verify(&token).await);
    }

    #[tokio::test]
    async fn test_pinned_algorithms_reject_others() {
        let keypair = TestKeypair::new(1);
        let token = keypair.sign(&valid_claims().build());

        let pinned = verifier_for(&keypair, Some(vec![Algorithm::RS256]));
        assert_invalid(pinned.verify(&token).await);

        let pinned_eddsa = verifier_for(&keypair, Some(vec![Algorithm::EdDSA]));
        assert!(pinned_eddsa.verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_algorithm_family_mismatch_rejected() {
        // RS256 header against an Ed25519 key
        let keypair = TestKeypair::new(1);
        let token = keypair.sign(&valid_claims().build());
        let forged = with_forged_header(&token, r#"{"alg":"RS256","typ":"JWT"}"#);

        assert_invalid(verifier_for(&keypair, None).verify(&forged).await);
    }

    #[tokio::test]
    async fn test_garbage_token_rejected_without_key_fetch() {
        // Unreachable discovery URL: a fetch attempt would surface as KeyFetch
        let cache = KeyMaterialCache::new(
            "http://127.0.0.1:9/realms/test".to_string(),
            std::time::Duration::from_secs(1),
        );
        let verifier = TokenVerifier::new(
            Arc::new(cache),
            ISSUER.to_string(),
            vec!["web-app".to_string()],
            None,
        );

        assert_invalid(verifier.verify("not-a-token").await);
    }

    #[tokio::test]
    async fn test_key_fetch_failure_propagates() {
        let keypair = TestKeypair::new(1);
        let token = keypair.sign(&valid_claims().build());
        let cache = KeyMaterialCache::new(
            "http://127.0.0.1:9/realms/test".to_string(),
            std::time::Duration::from_secs(1),
        );
        let verifier = TokenVerifier::new(
            Arc::new(cache),
            ISSUER.to_string(),
            vec!["web-app".to_string()],
            None,
        );

        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthorizerError::KeyFetch(_))
        ));
    }

    #[tokio::test]
    async fn test_token_size_limit_is_configurable() {
        let keypair = TestKeypair::new(1);
        let many_groups: Vec<String> = (0..400).map(|i| format!("/tenant-{i}/members")).collect();
        let group_refs: Vec<&str> = many_groups.iter().map(String::as_str).collect();
        let token = keypair.sign(&valid_claims().with_groups(&group_refs).build());
        assert!(token.len() > 8192);

        assert!(verifier_for(&keypair, None).verify(&token).await.is_ok());

        let strict = verifier_for(&keypair, None).with_max_token_size(8192);
        assert_invalid(strict.verify(&token).await);
    }

    #[tokio::test]
    async fn test_rs256_token_against_rsa_realm_key() {
        let keypair = TestRsaKeypair::new();
        let pem = common::jwt::format_public_key_pem(&keypair.public_key_b64()).unwrap();
        let cache = KeyMaterialCache::preloaded(VerificationKey::new(pem, ISSUER.to_string()));
        let verifier = TokenVerifier::new(
            Arc::new(cache),
            ISSUER.to_string(),
            vec!["web-app".to_string()],
            None,
        );

        let token = keypair.sign(&valid_claims().for_user("alice").build());
        let claims = verifier.verify(&token).await.unwrap();
        assert_eq!(claims.sub, "alice");

        // Signature from an unrelated Ed25519 key never passes
        let foreign = TestKeypair::new(1).sign(&valid_claims().build());
        assert_invalid(verifier.verify(&foreign).await);
    }
}
