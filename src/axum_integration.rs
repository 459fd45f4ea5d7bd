//! Axum integration for authgate
//!
//! This module provides utilities for integrating the engine with Axum:
//! - `Authorization` header access
//! - [`identity`], reading the identity [`AuthLayer`] attached to a request
//! - `FromRequestParts` extractors for [`Identity`]
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{routing::get, Router};
//! use authgate::axum_integration::CurrentIdentity;
//!
//! async fn protected_handler(CurrentIdentity(identity): CurrentIdentity) -> String {
//!     format!("Hello, {}!", identity.id)
//! }
//!
//! let app = Router::new()
//!     .route("/api/me", get(protected_handler))
//!     .layer(AuthLayer::new(engine));
//! ```
//!
//! [`AuthLayer`]: crate::auth::middleware::AuthLayer

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Extensions, HeaderMap},
};
use std::convert::Infallible;
use std::ops::Deref;

use crate::auth::error::GuardError;
use crate::auth::identity::Identity;

/// Raw `Authorization` header value, if present and valid UTF-8
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// The identity resolved for this request, `None` when anonymous
pub fn identity(extensions: &Extensions) -> Option<&Identity> {
    extensions.get::<Identity>()
}

/// Extractor for an authenticated caller; rejects anonymous requests with 401
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl Deref for CurrentIdentity {
    type Target = Identity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl CurrentIdentity {
    /// Get the inner Identity
    pub fn into_inner(self) -> Identity {
        self.0
    }
}

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = GuardError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity(&parts.extensions)
            .cloned()
            .map(CurrentIdentity)
            .ok_or(GuardError::Unauthenticated)
    }
}

/// Extractor for routes that serve anonymous and authenticated callers alike
#[derive(Debug, Clone)]
pub struct MaybeIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for MaybeIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(identity(&parts.extensions).cloned()))
    }
}
