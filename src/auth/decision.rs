//! Terminal outcomes of an authentication/authorization pass

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::header::WWW_AUTHENTICATE;
use http::{HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

use super::claims::ClaimsViolation;
use super::identity::Identity;

/// Why a decision came out the way it did
///
/// Only for logs and callers inspecting the decision. Never rendered into a
/// client response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    PublicPath,
    Unprotected,
    Authenticated,
    MissingCredential,
    CredentialRejected,
    ClaimsRejected(ClaimsViolation),
    VerifierFailed,
    RoleDenied,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::PublicPath => f.write_str("public_path"),
            Reason::Unprotected => f.write_str("unprotected"),
            Reason::Authenticated => f.write_str("authenticated"),
            Reason::MissingCredential => f.write_str("missing_credential"),
            Reason::CredentialRejected => f.write_str("credential_rejected"),
            Reason::ClaimsRejected(v) => write!(f, "claims_rejected: {}", v),
            Reason::VerifierFailed => f.write_str("verifier_failed"),
            Reason::RoleDenied => f.write_str("role_denied"),
        }
    }
}

/// Client-visible error message: plain text or a structured JSON value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    Text(String),
    Structured(Value),
}

impl From<&str> for ErrorMessage {
    fn from(value: &str) -> Self {
        ErrorMessage::Text(value.to_string())
    }
}

/// A refused request: status, generic message and optional challenge
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub reason: Reason,
    pub status: StatusCode,
    pub message: ErrorMessage,
    /// `WWW-Authenticate` value, set only for Basic 401s
    pub challenge: Option<String>,
}

impl Rejection {
    /// `{"error": <message>}`
    pub fn body(&self) -> Value {
        json!({ "error": self.message })
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = Json(self.body());
        let mut response = (self.status, body).into_response();
        if let Some(challenge) = self
            .challenge
            .as_deref()
            .and_then(|c| HeaderValue::from_str(c).ok())
        {
            response.headers_mut().insert(WWW_AUTHENTICATE, challenge);
        }
        response
    }
}

/// Outcome of evaluating one request
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Proceed; `identity` is `None` for anonymous access
    Allow {
        identity: Option<Identity>,
        reason: Reason,
    },
    Unauthorized(Rejection),
    Forbidden(Rejection),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }

    pub fn reason(&self) -> Reason {
        match self {
            Decision::Allow { reason, .. } => *reason,
            Decision::Unauthorized(r) | Decision::Forbidden(r) => r.reason,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Decision::Allow { identity, .. } => identity.as_ref(),
            _ => None,
        }
    }

    /// Status of the rejection, `None` when allowed
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Decision::Allow { .. } => None,
            Decision::Unauthorized(r) | Decision::Forbidden(r) => Some(r.status),
        }
    }
}
