//! System endpoints: health check and role catalog.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::dto::RoleInfo;
use crate::app_state::AppState;
use crate::domain::Role;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    open_domains: usize,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, current timestamp and the number of open domains.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            open_domains: state.domain_service.list_domains().len(),
        }),
    )
}

/// `GET /api/v1/roles`: Role catalog.
#[utoipa::path(
    get,
    path = "/api/v1/roles",
    tag = "System",
    summary = "List roles",
    description = "Returns every role with its wire identifier and description.",
    responses(
        (status = 200, description = "Role catalog", body = Vec<RoleInfo>),
    )
)]
pub async fn roles_handler() -> impl IntoResponse {
    let roles: Vec<RoleInfo> = Role::ALL
        .iter()
        .map(|role| RoleInfo {
            id: role.id().to_string(),
            description: role.description().to_string(),
        })
        .collect();
    (StatusCode::OK, Json(roles))
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/roles", get(roles_handler))
}
