//! Common utilities shared across gateway authorizer components.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, unverified headers, key material)
pub mod jwt;
