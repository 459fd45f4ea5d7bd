//! Request authentication and authorization
//!
//! Per request the [`engine::AuthEngine`] runs:
//!
//! 1. [`paths`] decides whether the path needs a caller identity at all
//! 2. [`credential`] extracts the credential of the configured scheme
//! 3. [`resolver`] turns it into an [`identity::Identity`] (for JWTs via
//!    [`signature`], [`token`] and [`claims`])
//! 4. [`policy`] checks the identity's roles against the path's role map
//!
//! and produces a [`decision::Decision`].
//!
//! # Example
//!
//! ```ignore
//! use authgate::auth::{AuthEngine, AuthLayer, RequireRole};
//! use std::sync::Arc;
//!
//! let engine = Arc::new(AuthEngine::builder(config.auth).build()?);
//! let app = Router::new()
//!     .route("/api/admin/audit", get(audit_handler))
//!     .layer(RequireRole::new(vec!["auditor".to_string()]))
//!     .layer(AuthLayer::new(engine));
//! ```

pub mod claims;
pub mod credential;
pub mod decision;
pub mod engine;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod paths;
pub mod policy;
pub mod resolver;
pub mod signature;
pub mod token;

pub use claims::{Claims, ClaimsViolation, ValidationOptions};
pub use credential::{Credential, Scheme};
pub use decision::{Decision, ErrorMessage, Reason, Rejection};
pub use engine::{AuthEngine, AuthEngineBuilder, AuthRequest};
pub use error::GuardError;
pub use identity::{Identity, IdentityId};
pub use middleware::{AuthLayer, RequirePermission, RequireRole, SessionHandle};
pub use paths::{PathPattern, PathRules};
pub use resolver::{
    BasicFn, BasicVerifier, BearerFn, BearerVerifier, IdentityResolver, MemorySession,
    SessionStore,
};
pub use signature::{SignatureVerifier, StaticKeyVerifier};
