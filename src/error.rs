//! Lighthouse error types with HTTP status code mapping.
//!
//! [`LighthouseError`] is the central error type of the crate. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "unknown user: alice",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`LighthouseError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Crate-wide error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 / 503                    |
/// | 4000–4999 | Authorization   | 403 / 422                    |
#[derive(Debug, thiserror::Error)]
pub enum LighthouseError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Role identifier is not part of the role catalog.
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// Event filter expression could not be parsed.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The user registry has no user with this code.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// No open domain has this key.
    #[error("domain not open: {0}")]
    DomainNotOpen(String),

    /// The domain is already open.
    #[error("domain already open: {0}")]
    DomainAlreadyOpen(String),

    /// The status is not tracked by the domain.
    #[error("status {code} not tracked in domain {domain}")]
    StatusNotTracked {
        /// Domain key.
        domain: String,
        /// Status code.
        code: String,
    },

    /// The caller lacks the role on the context.
    #[error("permission denied: {role} on {context}")]
    PermissionDenied {
        /// Required role identifier.
        role: String,
        /// Target context.
        context: String,
    },

    /// The operation installation is absent or broken.
    #[error("operation {code} is not executable at {location}: {state}")]
    OperationUnavailable {
        /// Operation code.
        code: String,
        /// Deployment context.
        location: String,
        /// `absent` or `broken`.
        state: &'static str,
    },

    /// A registry collaborator could not be resolved.
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LighthouseError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidRole(_) => 1002,
            Self::InvalidFilter(_) => 1003,
            Self::UnknownUser(_) => 2001,
            Self::DomainNotOpen(_) => 2002,
            Self::StatusNotTracked { .. } => 2003,
            Self::DomainAlreadyOpen(_) => 2004,
            Self::Internal(_) => 3000,
            Self::RegistryUnavailable(_) => 3001,
            Self::PermissionDenied { .. } => 4001,
            Self::OperationUnavailable { .. } => 4002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidRole(_) | Self::InvalidFilter(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::UnknownUser(_) | Self::DomainNotOpen(_) | Self::StatusNotTracked { .. } => {
                StatusCode::NOT_FOUND
            }
            Self::DomainAlreadyOpen(_) => StatusCode::CONFLICT,
            Self::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            Self::OperationUnavailable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RegistryUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LighthouseError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_maps_to_not_found() {
        let err = LighthouseError::UnknownUser("alice".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), 2001);
        assert_eq!(err.to_string(), "unknown user: alice");
    }

    #[test]
    fn permission_denied_maps_to_forbidden() {
        let err = LighthouseError::PermissionDenied {
            role: "STATUS_VIEW".to_string(),
            context: "/env2".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }
}
