//! Service layer for the gateway authorizer.
//!
//! - `authorizer` - per-invocation decision flow over the token verifier and
//!   rule engine

pub mod authorizer;

pub use authorizer::Authorizer;
