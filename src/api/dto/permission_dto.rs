//! Permission and credential DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Decision;

/// Request body for `POST /permissions/decide`. Every field is optional;
/// the evaluator's request-shape policy decides what a gap means.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DecideRequest {
    /// User code.
    #[serde(default)]
    pub user: Option<String>,
    /// Role identifier, e.g. `STATUS_VIEW`.
    #[serde(default)]
    pub role: Option<String>,
    /// Target context path.
    #[serde(default)]
    pub context: Option<String>,
}

/// Response body for `POST /permissions/decide`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DecideResponse {
    /// `allow` or `deny`.
    pub decision: Decision,
}

/// Request body for `POST /permissions/authenticate`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AuthenticateRequest {
    /// User code.
    pub user: String,
    /// Plain secret.
    pub secret: String,
}

/// Response body for `POST /permissions/authenticate`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthenticateResponse {
    /// Whether the secret matched the stored digest.
    pub authenticated: bool,
}

/// One entry of the role catalog.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoleInfo {
    /// Wire identifier.
    pub id: String,
    /// Human-readable description.
    pub description: String,
}
