//! Operation handlers: install and execute.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{ExecuteResponse, OperationLocationRequest, acting_user};
use crate::app_state::AppState;
use crate::domain::{DomainKey, InstallationState};
use crate::error::{ErrorResponse, LighthouseError};

/// `POST /operations/{code}/installations`: Install an operation.
///
/// # Errors
///
/// Returns [`LighthouseError::PermissionDenied`] if the acting user lacks
/// `OPERATION_INSTALL` on the location.
#[utoipa::path(
    post,
    path = "/api/v1/operations/{code}/installations",
    tag = "Operations",
    summary = "Install an operation",
    description = "Installs the operation at a deployment context. An installation without a matching definition is reported as broken.",
    params(
        ("code" = String, Path, description = "Operation code"),
        ("x-lighthouse-user" = Option<String>, Header, description = "Acting user"),
    ),
    request_body = OperationLocationRequest,
    responses(
        (status = 201, description = "Resulting installation state", body = InstallationState),
        (status = 403, description = "Permission denied", body = ErrorResponse),
    )
)]
pub async fn install_operation(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(req): Json<OperationLocationRequest>,
) -> Result<impl IntoResponse, LighthouseError> {
    let user = acting_user(&headers);
    let installation = state
        .domain_service
        .install_operation(&code, req.context(), user.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(installation)))
}

/// `POST /domains/{key}/operations/{code}/execute`: Execute an operation.
///
/// # Errors
///
/// Returns [`LighthouseError`] when the domain is not open, the acting
/// user lacks `OPERATION_EXECUTE`, or the installation is absent or
/// broken.
#[utoipa::path(
    post,
    path = "/api/v1/domains/{key}/operations/{code}/execute",
    tag = "Operations",
    summary = "Execute an operation",
    description = "Executes an installed operation at a deployment context and publishes an `operation_executed` event.",
    params(
        ("key" = String, Path, description = "Domain key"),
        ("code" = String, Path, description = "Operation code"),
        ("x-lighthouse-user" = Option<String>, Header, description = "Acting user"),
    ),
    request_body = OperationLocationRequest,
    responses(
        (status = 200, description = "Operation executed", body = ExecuteResponse),
        (status = 403, description = "Permission denied", body = ErrorResponse),
        (status = 404, description = "Domain not open", body = ErrorResponse),
        (status = 422, description = "Installation absent or broken", body = ErrorResponse),
    )
)]
pub async fn execute_operation(
    State(state): State<AppState>,
    Path((key, code)): Path<(String, String)>,
    headers: HeaderMap,
    Json(req): Json<OperationLocationRequest>,
) -> Result<impl IntoResponse, LighthouseError> {
    let user = acting_user(&headers);
    let location = req.context();
    state
        .domain_service
        .execute_operation(&DomainKey::new(key), &code, &location, user.as_ref())
        .await?;
    Ok(Json(ExecuteResponse {
        code,
        location: location.to_string(),
        status: "executed".to_string(),
    }))
}

/// Operation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/operations/{code}/installations", post(install_operation))
        .route(
            "/domains/{key}/operations/{code}/execute",
            post(execute_operation),
        )
}
