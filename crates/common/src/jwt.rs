//! JWT utilities shared across gateway authorizer components.
//!
//! This module provides the pre-verification helpers used before a token's
//! signature is checked:
//! - Size limits for DoS prevention
//! - Reading the declared signing algorithm from the unverified header
//! - Framing a bare public key body into a PEM block
//! - Selecting the decoding key family for a declared algorithm
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Symmetric (HMAC) algorithms are never accepted: the verification key is
//!   public material and must not double as a shared secret
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{decode_unverified_algorithm, decoding_key_for, format_public_key_pem};
//!
//! let pem = format_public_key_pem(&realm_info.public_key)?;
//! let alg = decode_unverified_algorithm(token, DEFAULT_MAX_JWT_SIZE_BYTES)?;
//! let key = decoding_key_for(alg, &pem)?;
//! ```

use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::{Algorithm, DecodingKey};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Default maximum JWT size in bytes (16KB).
///
/// JWTs larger than the configured limit are rejected BEFORE any parsing or
/// cryptographic operations.
///
/// - Typical identity-provider access tokens are 800-2000 bytes
/// - Tokens carrying many group paths grow well past that, so the default
///   leaves headroom; deployments with larger claims raise it
pub const DEFAULT_MAX_JWT_SIZE_BYTES: usize = 16 * 1024; // 16KB

/// PEM line width for base64 bodies (RFC 7468).
pub const PEM_LINE_WIDTH: usize = 64;

/// PEM header for a `SubjectPublicKeyInfo` public key.
pub const PUBLIC_KEY_PEM_HEADER: &str = "-----BEGIN PUBLIC KEY-----";

/// PEM footer for a `SubjectPublicKeyInfo` public key.
pub const PUBLIC_KEY_PEM_FOOTER: &str = "-----END PUBLIC KEY-----";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur before a token's signature is verified.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure or header).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Declared algorithm cannot be verified with public key material.
    #[error("The access token is invalid or expired")]
    UnsupportedAlgorithm,

    /// Public key material does not match the declared algorithm family.
    #[error("The access token is invalid or expired")]
    KeyMismatch,
}

// =============================================================================
// Functions
// =============================================================================

/// Read the declared signing algorithm from a JWT header without verifying
/// the signature.
///
/// # Security
///
/// - Token size is checked against `max_size` BEFORE any parsing
///   (denial-of-service prevention)
/// - The returned algorithm is caller-controlled input; callers decide
///   whether to trust it or compare it against a pinned list
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `max_size` bytes
/// - `MalformedToken` - Token is not a three-part JWT or the header is not
///   valid base64url JSON with a known `alg`
pub fn decode_unverified_algorithm(
    token: &str,
    max_size: usize,
) -> Result<Algorithm, JwtValidationError> {
    if token.len() > max_size {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = max_size,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // decode_header only looks at the first segment, so check the shape here
    let parts = token.split('.').count();
    if parts != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts,
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header = jsonwebtoken::decode_header(token).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header");
        JwtValidationError::MalformedToken
    })?;

    Ok(header.alg)
}

/// Returns true for algorithms verified with public key material.
#[must_use]
pub fn is_asymmetric(alg: Algorithm) -> bool {
    !matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// Frame a bare base64 public key body into a PEM block.
///
/// Identity providers commonly publish the `SubjectPublicKeyInfo` DER as a
/// single unwrapped base64 string. This wraps it at 64 characters between the
/// standard `PUBLIC KEY` header and footer. Whitespace in the input is ignored.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the body is not valid standard base64.
pub fn format_public_key_pem(body: &str) -> Result<String, base64::DecodeError> {
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();

    // Reject garbage before it is dressed up as a PEM block
    STANDARD.decode(&compact)?;

    let chars: Vec<char> = compact.chars().collect();
    let lines: Vec<String> = chars
        .chunks(PEM_LINE_WIDTH)
        .map(|chunk| chunk.iter().collect())
        .collect();

    Ok(format!(
        "{PUBLIC_KEY_PEM_HEADER}\n{}\n{PUBLIC_KEY_PEM_FOOTER}",
        lines.join("\n")
    ))
}

/// Build the decoding key for `alg` from a PEM-encoded public key.
///
/// The key family is chosen from the algorithm: RSA for `RS*`/`PS*`, EC for
/// `ES*`, Ed25519 for `EdDSA`.
///
/// # Errors
///
/// - `UnsupportedAlgorithm` - `alg` is an HMAC algorithm
/// - `KeyMismatch` - the PEM does not hold a key of the required family
pub fn decoding_key_for(alg: Algorithm, pem: &str) -> Result<DecodingKey, JwtValidationError> {
    let pem = pem.as_bytes();
    let result = match alg {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            tracing::debug!(target: "common.jwt", alg = ?alg, "Symmetric algorithm rejected");
            return Err(JwtValidationError::UnsupportedAlgorithm);
        }
    };

    result.map_err(|e| {
        tracing::debug!(target: "common.jwt", alg = ?alg, error = %e, "Public key does not match algorithm");
        JwtValidationError::KeyMismatch
    })
}

// =============================================================================
// Tests
// =============================================================================
