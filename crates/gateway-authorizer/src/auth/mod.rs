//! Bearer token authentication.
//!
//! - `key_cache`: process-lifetime cache of the issuer's verification key
//! - `verifier`: signature and claim checks
//! - `claims`: the verified claim set

pub mod claims;
pub mod key_cache;
pub mod verifier;

pub use claims::{GroupClaim, TokenClaims};
pub use key_cache::{KeyMaterialCache, VerificationKey};
pub use verifier::TokenVerifier;
