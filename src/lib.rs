//! # authgate - request-time authentication and authorization
//!
//! Decides, for each incoming HTTP request, whether the target needs an
//! identity, which credential scheme applies, whether the supplied credential
//! is valid, and whether the resolved identity may access the path.
//!
//! ## Schemes
//!
//! - `jwt`: compact tokens, claims checked locally, signatures via a
//!   pluggable [`auth::SignatureVerifier`]
//! - `bearer` / `basic`: delegated to caller-supplied async verifiers
//! - `session`: identity read from the caller's session store
//!
//! ## Features
//!
//! - `jwks` (default): remote JWKS signature verification

pub mod auth;
pub mod axum_integration;
pub mod config;
pub mod error;
pub mod telemetry;

pub use error::{GateError, Result};

pub use crate::auth::{AuthEngine, AuthLayer, Decision, Identity, Scheme};
pub use crate::config::{load_config, AuthSettings, GateConfig};

#[cfg(feature = "jwks")]
pub use crate::auth::signature::JwksVerifier;
