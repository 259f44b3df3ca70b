//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 keypairs, a fixed RSA keypair, and helpers
//! to sign test tokens. Ed25519 fixtures are deterministic based on seed
//! values; the RSA fixture is a checked-in test-only key.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use thiserror::Error;

/// DER prefix of an Ed25519 `SubjectPublicKeyInfo` (RFC 8410).
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

/// Test-only RSA 2048 private key (PKCS#1 PEM). Never use outside tests.
const RSA_TEST_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/rsa_test_key.pem");

/// Base64 `SubjectPublicKeyInfo` DER of the key above, as a realm publishes it.
const RSA_TEST_PUBLIC_KEY_B64: &str = include_str!("../fixtures/rsa_test_key.spki.b64");

/// Key material a mock realm document can publish.
pub trait RealmKey {
    /// Bare base64 key body for the realm's `public_key` field.
    fn realm_public_key(&self) -> String;
}

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// Deterministic Ed25519 keypair that signs tokens the way the identity
/// provider would, and publishes its public key in the realm document shape.
///
/// # Example
/// ```rust,ignore
/// let keypair = TestKeypair::new(1);
/// let token = keypair.sign(&TestTokenBuilder::new().build());
/// ```
#[derive(Clone)]
pub struct TestKeypair {
    public_key_bytes: Vec<u8>,
    private_key_pkcs8: Vec<u8>,
}

impl TestKeypair {
    /// Create the keypair for `seed`. The same seed always yields the same key.
    pub fn new(seed: u8) -> Self {
        Self::try_new(seed).expect("test keypair generation should succeed")
    }

    /// Fallible variant of [`TestKeypair::new`].
    pub fn try_new(seed: u8) -> Result<Self, FixtureError> {
        let seed_bytes = seed_bytes(seed);

        // Deterministic and suitable for testing only
        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
            .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e)))?;

        Ok(Self {
            public_key_bytes: key_pair.public_key().as_ref().to_vec(),
            private_key_pkcs8: build_pkcs8_from_seed(&seed_bytes),
        })
    }

    /// Raw 32-byte public key.
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key_bytes
    }

    /// `SubjectPublicKeyInfo` DER of the public key.
    pub fn public_key_der(&self) -> Vec<u8> {
        let mut der = ED25519_SPKI_PREFIX.to_vec();
        der.extend_from_slice(&self.public_key_bytes);
        der
    }

    /// Bare base64 key body, as published in the realm's `public_key` field.
    pub fn public_key_b64(&self) -> String {
        STANDARD.encode(self.public_key_der())
    }

    /// PEM-framed public key.
    pub fn public_key_pem(&self) -> String {
        // 44 DER bytes encode to 60 base64 characters: one PEM line
        format!(
            "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----",
            self.public_key_b64()
        )
    }

    /// Sign `claims` as an EdDSA JWT.
    pub fn sign(&self, claims: &serde_json::Value) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());

        encode(
            &header,
            claims,
            &EncodingKey::from_ed_der(&self.private_key_pkcs8),
        )
        .expect("signing test token should succeed")
    }
}

impl RealmKey for TestKeypair {
    fn realm_public_key(&self) -> String {
        self.public_key_b64()
    }
}

/// Fixed RSA keypair matching what a Keycloak realm publishes by default.
///
/// # Example
/// ```rust,ignore
/// let keypair = TestRsaKeypair::new();
/// let keycloak = MockKeycloak::start(&keypair).await;
/// let token = keypair.sign(&TestTokenBuilder::new().build());
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct TestRsaKeypair;

impl TestRsaKeypair {
    pub fn new() -> Self {
        Self
    }

    /// Bare base64 `SubjectPublicKeyInfo` body.
    pub fn public_key_b64(&self) -> String {
        RSA_TEST_PUBLIC_KEY_B64.trim().to_string()
    }

    /// PEM-framed public key, wrapped at 64 characters.
    pub fn public_key_pem(&self) -> String {
        let body = self.public_key_b64();
        let lines: Vec<&str> = body
            .as_bytes()
            .chunks(64)
            .map(|chunk| std::str::from_utf8(chunk).expect("base64 is ASCII"))
            .collect();
        format!(
            "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----",
            lines.join("\n")
        )
    }

    /// Sign `claims` as an RS256 JWT.
    pub fn sign(&self, claims: &serde_json::Value) -> String {
        self.sign_with(Algorithm::RS256, claims)
    }

    /// Sign `claims` with any RSA family algorithm (`RS*` or `PS*`).
    pub fn sign_with(&self, alg: Algorithm, claims: &serde_json::Value) -> String {
        let mut header = Header::new(alg);
        header.typ = Some("JWT".to_string());

        let key = EncodingKey::from_rsa_pem(RSA_TEST_PRIVATE_KEY_PEM.as_bytes())
            .expect("test RSA key should parse");
        encode(&header, claims, &key).expect("signing test token should succeed")
    }
}

impl RealmKey for TestRsaKeypair {
    fn realm_public_key(&self) -> String {
        self.public_key_b64()
    }
}

/// Base64url-encode a raw JWT header, for hand-forged tokens.
pub fn encode_header(header_json: &str) -> String {
    URL_SAFE_NO_PAD.encode(header_json)
}

/// Replace the header of `token` with `header_json`, keeping payload and signature.
pub fn with_forged_header(token: &str, header_json: &str) -> String {
    let rest = token
        .split_once('.')
        .map(|(_, rest)| rest)
        .expect("token should have a header segment");
    format!("{}.{}", encode_header(header_json), rest)
}

fn seed_bytes(seed: u8) -> [u8; 32] {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    // Fill rest with deterministic pattern
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }
    seed_bytes
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// This is a test-only utility. Production code must use ring::rand::SystemRandom.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    // PKCS#8 v1 format for Ed25519 (RFC 5208):
    // SEQUENCE {
    //   version         INTEGER (0),
    //   algorithm       AlgorithmIdentifier,
    //   privateKey      OCTET STRING
    // }
    // Where privateKey for Ed25519 is:
    // OCTET STRING containing OCTET STRING with 32-byte seed

    let mut pkcs8 = Vec::new();

    // Outer SEQUENCE tag
    pkcs8.push(0x30);
    pkcs8.push(0x2e); // Length: 46 bytes

    // Version: INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);

    // Algorithm Identifier: SEQUENCE
    pkcs8.push(0x30);
    pkcs8.push(0x05); // Length: 5 bytes
                      // OID for Ed25519: 1.3.101.112
    pkcs8.extend_from_slice(&[0x06, 0x03, 0x2b, 0x65, 0x70]);

    // Private Key: OCTET STRING
    pkcs8.push(0x04);
    pkcs8.push(0x22); // Length: 34 bytes
                      // Inner OCTET STRING with seed
    pkcs8.push(0x04);
    pkcs8.push(0x20); // Length: 32 bytes
    pkcs8.extend_from_slice(seed);

    pkcs8
}
