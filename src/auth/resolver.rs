//! Per-scheme identity resolution and the external collaborators it calls
//!
//! Each scheme gets one [`IdentityResolver`]. The engine holds exactly one,
//! chosen when it is built, so adding a scheme means adding a resolver.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use super::claims::{now_epoch_seconds, validate, ValidationOptions};
use super::credential::{Credential, Scheme};
use super::identity::Identity;
use super::signature::SignatureVerifier;
use super::token;
use crate::error::{GateError, Result};

/// Verifies an opaque bearer token
#[async_trait]
pub trait BearerVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Option<Identity>>;
}

/// Verifies a username/password pair
#[async_trait]
pub trait BasicVerifier: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> Result<Option<Identity>>;
}

/// Read access to the caller's session
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
}

/// Adapts an async closure into a [`BearerVerifier`]
pub struct BearerFn<F>(pub F);

#[async_trait]
impl<F, Fut> BearerVerifier for BearerFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Identity>>> + Send,
{
    async fn verify(&self, token: &str) -> Result<Option<Identity>> {
        (self.0)(token.to_string()).await
    }
}

/// Adapts an async closure into a [`BasicVerifier`]
pub struct BasicFn<F>(pub F);

#[async_trait]
impl<F, Fut> BasicVerifier for BasicFn<F>
where
    F: Fn(String, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Identity>>> + Send,
{
    async fn verify(&self, username: &str, password: &str) -> Result<Option<Identity>> {
        (self.0)(username.to_string(), password.to_string()).await
    }
}

/// Session contents held in memory, mainly for tests and local development
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    values: HashMap<String, Value>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }
}

#[async_trait]
impl SessionStore for MemorySession {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }
}

/// Turns an extracted credential into an identity
///
/// `Ok(None)` means the credential was not accepted. `Err` carries the
/// specific failure for logging; callers treat both as unauthenticated.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    fn scheme(&self) -> Scheme;

    async fn resolve(
        &self,
        credential: &Credential,
        session: Option<&dyn SessionStore>,
    ) -> Result<Option<Identity>>;
}

/// Compact-token resolver
pub struct JwtResolver {
    options: ValidationOptions,
    signature: Option<Arc<dyn SignatureVerifier>>,
}

impl JwtResolver {
    pub fn new(options: ValidationOptions) -> Self {
        Self {
            options,
            signature: None,
        }
    }

    pub fn with_signature_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.signature = Some(verifier);
        self
    }

    pub fn verifies_signatures(&self) -> bool {
        self.signature.is_some()
    }
}

#[async_trait]
impl IdentityResolver for JwtResolver {
    fn scheme(&self) -> Scheme {
        Scheme::Jwt
    }

    async fn resolve(
        &self,
        credential: &Credential,
        _session: Option<&dyn SessionStore>,
    ) -> Result<Option<Identity>> {
        let Credential::CompactToken { token } = credential else {
            return Ok(None);
        };

        if let Some(verifier) = &self.signature {
            verifier.verify(token).await?;
        }

        let Some(claims) = token::decode(token) else {
            tracing::debug!("Compact token could not be decoded");
            return Ok(None);
        };

        validate(&claims, &self.options, now_epoch_seconds())?;
        Ok(Identity::from_claims(claims))
    }
}

/// Opaque bearer token resolver
pub struct BearerResolver {
    verifier: Arc<dyn BearerVerifier>,
}

impl BearerResolver {
    pub fn new(verifier: Arc<dyn BearerVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl IdentityResolver for BearerResolver {
    fn scheme(&self) -> Scheme {
        Scheme::Bearer
    }

    async fn resolve(
        &self,
        credential: &Credential,
        _session: Option<&dyn SessionStore>,
    ) -> Result<Option<Identity>> {
        match credential {
            Credential::Bearer { token } => self.verifier.verify(token).await,
            _ => Ok(None),
        }
    }
}

/// Username/password resolver
pub struct BasicResolver {
    verifier: Arc<dyn BasicVerifier>,
}

impl BasicResolver {
    pub fn new(verifier: Arc<dyn BasicVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl IdentityResolver for BasicResolver {
    fn scheme(&self) -> Scheme {
        Scheme::Basic
    }

    async fn resolve(
        &self,
        credential: &Credential,
        _session: Option<&dyn SessionStore>,
    ) -> Result<Option<Identity>> {
        match credential {
            Credential::Basic { username, password } => {
                self.verifier.verify(username, password).await
            }
            _ => Ok(None),
        }
    }
}

/// Session lookup resolver
#[derive(Debug, Default)]
pub struct SessionResolver;

#[async_trait]
impl IdentityResolver for SessionResolver {
    fn scheme(&self) -> Scheme {
        Scheme::Session
    }

    async fn resolve(
        &self,
        credential: &Credential,
        session: Option<&dyn SessionStore>,
    ) -> Result<Option<Identity>> {
        let Credential::SessionRef { key } = credential else {
            return Ok(None);
        };
        let Some(session) = session else {
            tracing::debug!("No session available for request");
            return Ok(None);
        };
        let value = session
            .get(key)
            .await
            .map_err(|e| GateError::Session(e.to_string()))?;
        Ok(value.and_then(Identity::from_session_value))
    }
}
