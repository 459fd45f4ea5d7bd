use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Rejections produced by the route-level guards
///
/// The display text is for logs; clients only get a generic body.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// No identity was attached to the request
    #[error("Request is not authenticated")]
    Unauthenticated,

    /// None of the required roles is held
    #[error("Insufficient role. Required one of: {}", .0.join(", "))]
    InsufficientRole(Vec<String>),

    /// None of the required permissions is held
    #[error("Insufficient permission. Required one of: {}", .0.join(", "))]
    InsufficientPermission(Vec<String>),
}

impl GuardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GuardError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GuardError::InsufficientRole(_) | GuardError::InsufficientPermission(_) => {
                StatusCode::FORBIDDEN
            }
        }
    }
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        tracing::info!("{}", self);
        let message = match self {
            GuardError::Unauthenticated => "Unauthorized",
            GuardError::InsufficientRole(_) | GuardError::InsufficientPermission(_) => "Forbidden",
        };
        (self.status_code(), Json(json!({ "error": message }))).into_response()
    }
}
