//! Observability for the gateway authorizer.
//!
//! Provides metrics definitions and the recorder setup.

pub mod metrics;
