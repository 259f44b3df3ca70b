//! Gateway Authorizer Library
//!
//! Request-authorization decisions for an API gateway. For every inbound
//! call the gateway hands over the request's bearer token, path, method, and
//! resource ARN; the authorizer answers with an ALLOW or DENY policy
//! document.
//!
//! - Bearer token verification against the identity provider's realm key
//! - Group-based access rules with exact, path-variable, and wildcard paths
//! - Default-allow for requests no rule covers
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/authorizer.rs -> auth/*, rules/*, policy.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Key cache, token verifier, claims
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Gateway event and response models
//! - `observability` - Metrics definitions
//! - `policy` - Policy document builder
//! - `routes` - Axum router setup
//! - `rules` - Rule mapping, matcher, evaluator
//! - `services` - Decision flow

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod policy;
pub mod routes;
pub mod rules;
pub mod services;
