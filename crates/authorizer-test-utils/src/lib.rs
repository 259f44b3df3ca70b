//! # Authorizer Test Utilities
//!
//! Shared test utilities for the gateway authorizer.
//!
//! This crate provides:
//! - Deterministic Ed25519 fixtures and a fixed RSA keypair (reproducible tests)
//! - Test claim builders (`TestTokenBuilder`)
//! - A mock identity provider realm endpoint (`MockKeycloak`)
//! - Server test harness (`TestAuthorizerServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authorizer_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let keypair = TestKeypair::new(1);
//!     let keycloak = MockKeycloak::start(&keypair).await;
//!
//!     let token = keypair.sign(
//!         &TestTokenBuilder::new()
//!             .for_user("alice")
//!             .issued_by(&keycloak.issuer())
//!             .with_groups(&["/admins"])
//!             .build(),
//!     );
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
