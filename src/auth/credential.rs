//! Raw credential extraction from the `Authorization` header

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication scheme selected for a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Jwt,
    Session,
    Bearer,
    Basic,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scheme::Jwt => "jwt",
            Scheme::Session => "session",
            Scheme::Bearer => "bearer",
            Scheme::Basic => "basic",
        };
        f.write_str(name)
    }
}

/// A credential pulled out of a request, scoped to a single decision
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer { token: String },
    Basic { username: String, password: String },
    CompactToken { token: String },
    SessionRef { key: String },
}

// Secrets stay out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Bearer { .. } => f.write_str("Credential::Bearer(..)"),
            Credential::Basic { username, .. } => f
                .debug_struct("Credential::Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Credential::CompactToken { .. } => f.write_str("Credential::CompactToken(..)"),
            Credential::SessionRef { key } => f
                .debug_struct("Credential::SessionRef")
                .field("key", key)
                .finish(),
        }
    }
}

/// Extract the token of a `Bearer <token>` header value
///
/// The prefix is case-sensitive and takes exactly one space.
pub fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ")
}

/// Decode a `Basic <base64(user:pass)>` header value
///
/// The decoded pair is split on the first colon, so passwords may contain colons.
pub fn basic_credentials(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

impl Credential {
    /// Extract the credential for `scheme`
    ///
    /// `None` means "no credential supplied". Malformed headers land here too.
    /// The session scheme never reads the header; it refers to `session_key`.
    pub fn extract(header: Option<&str>, scheme: Scheme, session_key: &str) -> Option<Self> {
        match scheme {
            Scheme::Bearer => bearer_token(header?).map(|token| Credential::Bearer {
                token: token.to_string(),
            }),
            Scheme::Jwt => bearer_token(header?).map(|token| Credential::CompactToken {
                token: token.to_string(),
            }),
            Scheme::Basic => basic_credentials(header?)
                .map(|(username, password)| Credential::Basic { username, password }),
            Scheme::Session => Some(Credential::SessionRef {
                key: session_key.to_string(),
            }),
        }
    }
}
