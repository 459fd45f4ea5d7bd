//! Error types for authgate operations

/// Crate-wide error type
///
/// These errors never reach an HTTP client verbatim. The engine logs them and
/// answers with the configured generic rejection instead.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential verifier error: {0}")]
    Verifier(String),

    #[error("Claims rejected: {0}")]
    Claims(#[from] crate::auth::claims::ClaimsViolation),

    #[error("Session store error: {0}")]
    Session(String),

    #[error("Signature verification failed: {0}")]
    Signature(String),

    #[cfg(feature = "jwks")]
    #[error("JWKS fetch error: {0}")]
    JwksFetch(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GateError>;

impl GateError {
    /// Status an embedding service should use if it surfaces this error itself
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            GateError::Claims(_)
            | GateError::Verifier(_)
            | GateError::Session(_)
            | GateError::Signature(_) => StatusCode::UNAUTHORIZED,
            #[cfg(feature = "jwks")]
            GateError::JwksFetch(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
