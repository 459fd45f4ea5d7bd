//! The per-request decision pipeline
//!
//! path rules → credential extraction → identity resolution → role policy.
//! The engine holds only immutable configuration, so one instance can serve
//! any number of concurrent requests. External verifier and session calls are
//! awaited once, without timeout or retry; callers bound them.

use http::{Method, StatusCode};
use std::sync::Arc;

use super::credential::{Credential, Scheme};
use super::decision::{Decision, ErrorMessage, Reason, Rejection};
use super::paths::PathRules;
use super::policy::authorize;
use super::resolver::{
    BasicResolver, BasicVerifier, BearerResolver, BearerVerifier, IdentityResolver, JwtResolver,
    SessionResolver, SessionStore,
};
use super::signature::SignatureVerifier;
use crate::config::AuthSettings;
use crate::error::{GateError, Result};

/// What the engine needs to know about a request
#[derive(Clone, Copy)]
pub struct AuthRequest<'a> {
    pub method: &'a Method,
    pub path: &'a str,
    pub authorization: Option<&'a str>,
    pub session: Option<&'a dyn SessionStore>,
}

impl<'a> AuthRequest<'a> {
    pub fn new(method: &'a Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            authorization: None,
            session: None,
        }
    }

    pub fn with_authorization(mut self, authorization: Option<&'a str>) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn with_session(mut self, session: &'a dyn SessionStore) -> Self {
        self.session = Some(session);
        self
    }
}

struct Responses {
    unauthorized_status: StatusCode,
    unauthorized_message: ErrorMessage,
    forbidden_status: StatusCode,
    forbidden_message: ErrorMessage,
    challenge: Option<String>,
}

/// Authentication and authorization decision engine
pub struct AuthEngine {
    session_key: String,
    rules: PathRules,
    resolver: Arc<dyn IdentityResolver>,
    responses: Responses,
}

impl AuthEngine {
    pub fn builder(settings: AuthSettings) -> AuthEngineBuilder {
        AuthEngineBuilder::new(settings)
    }

    /// Scheme of the wired resolver
    pub fn scheme(&self) -> Scheme {
        self.resolver.scheme()
    }

    pub fn rules(&self) -> &PathRules {
        &self.rules
    }

    /// Evaluate one request
    ///
    /// Never fails: malformed input and collaborator errors all come back as
    /// `Unauthorized`, with the specific cause logged.
    pub async fn evaluate(&self, request: &AuthRequest<'_>) -> Decision {
        let path = request.path;

        if self.rules.is_public(path) {
            tracing::debug!(%path, method = %request.method, "public path, skipping authentication");
            return Decision::Allow {
                identity: None,
                reason: Reason::PublicPath,
            };
        }
        if !self.rules.is_protected(path) {
            tracing::debug!(%path, method = %request.method, "path not protected, skipping authentication");
            return Decision::Allow {
                identity: None,
                reason: Reason::Unprotected,
            };
        }

        let Some(credential) =
            Credential::extract(request.authorization, self.scheme(), &self.session_key)
        else {
            tracing::debug!(%path, scheme = %self.scheme(), "no usable credential supplied");
            return self.unauthorized(Reason::MissingCredential);
        };

        let identity = match self.resolver.resolve(&credential, request.session).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                tracing::info!(%path, scheme = %self.scheme(), "credential not accepted");
                return self.unauthorized(Reason::CredentialRejected);
            }
            Err(GateError::Claims(violation)) => {
                tracing::warn!(%path, %violation, "token claims rejected");
                return self.unauthorized(Reason::ClaimsRejected(violation));
            }
            Err(err) => {
                tracing::warn!(%path, scheme = %self.scheme(), error = %err, "identity resolution failed");
                return self.unauthorized(Reason::VerifierFailed);
            }
        };

        let required = self.rules.required_roles(path);
        if !authorize(Some(&identity), &required) {
            tracing::info!(
                %path,
                identity = %identity.id,
                required = ?required,
                "identity lacks a required role"
            );
            return self.forbidden();
        }

        tracing::debug!(%path, identity = %identity.id, "request authorized");
        Decision::Allow {
            identity: Some(identity),
            reason: Reason::Authenticated,
        }
    }

    fn unauthorized(&self, reason: Reason) -> Decision {
        Decision::Unauthorized(Rejection {
            reason,
            status: self.responses.unauthorized_status,
            message: self.responses.unauthorized_message.clone(),
            challenge: self.responses.challenge.clone(),
        })
    }

    fn forbidden(&self) -> Decision {
        Decision::Forbidden(Rejection {
            reason: Reason::RoleDenied,
            status: self.responses.forbidden_status,
            message: self.responses.forbidden_message.clone(),
            challenge: None,
        })
    }
}

/// Wires the collaborators the configured scheme needs
pub struct AuthEngineBuilder {
    settings: AuthSettings,
    bearer: Option<Arc<dyn BearerVerifier>>,
    basic: Option<Arc<dyn BasicVerifier>>,
    signature: Option<Arc<dyn SignatureVerifier>>,
}

impl AuthEngineBuilder {
    pub fn new(settings: AuthSettings) -> Self {
        Self {
            settings,
            bearer: None,
            basic: None,
            signature: None,
        }
    }

    pub fn bearer_verifier(mut self, verifier: Arc<dyn BearerVerifier>) -> Self {
        self.bearer = Some(verifier);
        self
    }

    pub fn basic_verifier(mut self, verifier: Arc<dyn BasicVerifier>) -> Self {
        self.basic = Some(verifier);
        self
    }

    pub fn signature_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.signature = Some(verifier);
        self
    }

    /// Validate the settings and pick the resolver for the scheme
    pub fn build(self) -> Result<AuthEngine> {
        let settings = self.settings;
        let rules = settings.compile_rules()?;

        let resolver: Arc<dyn IdentityResolver> = match settings.scheme {
            Scheme::Jwt => {
                let mut resolver = JwtResolver::new(settings.validation_options());
                match self.signature {
                    Some(verifier) => resolver = resolver.with_signature_verifier(verifier),
                    None if settings.require_signature => {
                        return Err(GateError::Config(
                            "require_signature is set but no signature verifier was provided"
                                .to_string(),
                        ));
                    }
                    None => tracing::warn!(
                        "JWT signatures are not verified; token payloads are trusted after claims checks only"
                    ),
                }
                Arc::new(resolver)
            }
            Scheme::Bearer => {
                let verifier = self.bearer.ok_or_else(|| {
                    GateError::Config("bearer scheme requires a bearer verifier".to_string())
                })?;
                Arc::new(BearerResolver::new(verifier))
            }
            Scheme::Basic => {
                let verifier = self.basic.ok_or_else(|| {
                    GateError::Config("basic scheme requires a basic verifier".to_string())
                })?;
                Arc::new(BasicResolver::new(verifier))
            }
            Scheme::Session => Arc::new(SessionResolver),
        };

        let challenge = match settings.scheme {
            Scheme::Basic => Some(settings.basic_challenge()?),
            _ => None,
        };

        let responses = Responses {
            unauthorized_status: settings.unauthorized_status()?,
            unauthorized_message: settings.unauthorized_message.clone(),
            forbidden_status: settings.forbidden_status()?,
            forbidden_message: settings.forbidden_message.clone(),
            challenge,
        };

        tracing::info!(scheme = %settings.scheme, "auth engine configured");

        Ok(AuthEngine {
            session_key: settings.session_key,
            rules,
            resolver,
            responses,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::Identity;
    use crate::auth::resolver::{BasicFn, BearerFn, MemorySession};
    use crate::config::PatternConfig;
    use serde_json::json;
    use std::collections::HashMap;

    fn api_settings(scheme: Scheme) -> AuthSettings {
        AuthSettings {
            scheme,
            public_paths: vec![PatternConfig::Prefix("/api/login".to_string())],
            protected_paths: vec![PatternConfig::Prefix("/api/".to_string())],
            roles: HashMap::from([("/api/admin".to_string(), vec!["admin".to_string()])]),
            ..Default::default()
        }
    }

    fn bearer_engine() -> AuthEngine {
        AuthEngine::builder(api_settings(Scheme::Bearer))
            .bearer_verifier(Arc::new(BearerFn(|token: String| async move {
                match token.as_str() {
                    "user-token" => Ok(Some(Identity::new("u1").with_roles(["user"]))),
                    "admin-token" => Ok(Some(Identity::new("a1").with_roles(["admin"]))),
                    "broken" => Err(GateError::from(anyhow::anyhow!("verifier offline"))),
                    _ => Ok(None),
                }
            })))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_public_path_ignores_header() {
        let engine = bearer_engine();
        let method = Method::GET;
        let request = AuthRequest::new(&method, "/api/login").with_authorization(Some("garbage"));
        let decision = engine.evaluate(&request).await;
        assert_eq!(
            decision,
            Decision::Allow {
                identity: None,
                reason: Reason::PublicPath
            }
        );
    }

    #[tokio::test]
    async fn test_unprotected_path_skips() {
        let engine = bearer_engine();
        let method = Method::GET;
        let decision = engine.evaluate(&AuthRequest::new(&method, "/health")).await;
        assert_eq!(decision.reason(), Reason::Unprotected);
        assert!(decision.identity().is_none());
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let engine = bearer_engine();
        let method = Method::GET;
        let decision = engine.evaluate(&AuthRequest::new(&method, "/api/orders")).await;
        assert_eq!(decision.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(decision.reason(), Reason::MissingCredential);
    }

    #[tokio::test]
    async fn test_verifier_error_is_unauthorized() {
        let engine = bearer_engine();
        let method = Method::GET;
        let request =
            AuthRequest::new(&method, "/api/orders").with_authorization(Some("Bearer broken"));
        let decision = engine.evaluate(&request).await;
        assert_eq!(decision.reason(), Reason::VerifierFailed);
        assert_eq!(decision.status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_role_policy() {
        let engine = bearer_engine();
        let method = Method::GET;

        let user = AuthRequest::new(&method, "/api/admin").with_authorization(Some("Bearer user-token"));
        let decision = engine.evaluate(&user).await;
        assert!(matches!(decision, Decision::Forbidden(_)));
        assert_eq!(decision.status(), Some(StatusCode::FORBIDDEN));

        let admin =
            AuthRequest::new(&method, "/api/admin").with_authorization(Some("Bearer admin-token"));
        let decision = engine.evaluate(&admin).await;
        assert!(decision.is_allowed());
        assert_eq!(decision.identity().unwrap().id.to_string(), "a1");
    }

    #[tokio::test]
    async fn test_bearer_401_has_no_challenge() {
        let engine = bearer_engine();
        let method = Method::GET;
        let request = AuthRequest::new(&method, "/api/orders").with_authorization(Some("Bearer nope"));
        match engine.evaluate(&request).await {
            Decision::Unauthorized(rejection) => assert!(rejection.challenge.is_none()),
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_basic_challenge_and_custom_status() {
        let settings = AuthSettings {
            unauthorized_status: 419,
            realm: "orders".to_string(),
            ..api_settings(Scheme::Basic)
        };
        let engine = AuthEngine::builder(settings)
            .basic_verifier(Arc::new(BasicFn(|_u: String, _p: String| async move {
                Ok::<_, GateError>(None)
            })))
            .build()
            .unwrap();

        let method = Method::POST;
        let decision = engine.evaluate(&AuthRequest::new(&method, "/api/orders")).await;
        match decision {
            Decision::Unauthorized(rejection) => {
                assert_eq!(rejection.status.as_u16(), 419);
                assert_eq!(rejection.challenge.as_deref(), Some("Basic realm=\"orders\""));
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_session_scheme() {
        let engine = AuthEngine::builder(api_settings(Scheme::Session)).build().unwrap();
        let session = MemorySession::new().with("user", json!({"id": "s1", "roles": ["admin"]}));
        let method = Method::GET;

        let request = AuthRequest::new(&method, "/api/admin").with_session(&session);
        let decision = engine.evaluate(&request).await;
        assert!(decision.is_allowed());

        let without_session = AuthRequest::new(&method, "/api/admin");
        let decision = engine.evaluate(&without_session).await;
        assert_eq!(decision.reason(), Reason::CredentialRejected);
    }

    #[test]
    fn test_scheme_follows_resolver() {
        assert_eq!(bearer_engine().scheme(), Scheme::Bearer);
        let jwt = AuthEngine::builder(api_settings(Scheme::Jwt)).build().unwrap();
        assert_eq!(jwt.scheme(), Scheme::Jwt);
        let session = AuthEngine::builder(api_settings(Scheme::Session)).build().unwrap();
        assert_eq!(session.scheme(), Scheme::Session);
    }

    #[test]
    fn test_builder_requires_collaborators() {
        assert!(AuthEngine::builder(api_settings(Scheme::Bearer)).build().is_err());
        assert!(AuthEngine::builder(api_settings(Scheme::Basic)).build().is_err());

        let strict = AuthSettings {
            require_signature: true,
            ..api_settings(Scheme::Jwt)
        };
        assert!(AuthEngine::builder(strict).build().is_err());
        assert!(AuthEngine::builder(api_settings(Scheme::Jwt)).build().is_ok());
    }
}
