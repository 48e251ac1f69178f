//! Permission handlers: decide and authenticate.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{AuthenticateRequest, AuthenticateResponse, DecideRequest, DecideResponse};
use crate::app_state::AppState;
use crate::domain::{Context, Role, UserCode};
use crate::error::{ErrorResponse, LighthouseError};

/// `POST /permissions/decide`: Decide a permission check.
///
/// # Errors
///
/// Returns [`LighthouseError`] for an unknown role or user.
#[utoipa::path(
    post,
    path = "/api/v1/permissions/decide",
    tag = "Permissions",
    summary = "Decide a permission check",
    description = "Decides whether the user holds the role on the context. A missing user or context is denied; a missing role is allowed.",
    request_body = DecideRequest,
    responses(
        (status = 200, description = "Decision", body = DecideResponse),
        (status = 400, description = "Unknown role identifier", body = ErrorResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse),
    )
)]
pub async fn decide(
    State(state): State<AppState>,
    Json(req): Json<DecideRequest>,
) -> Result<impl IntoResponse, LighthouseError> {
    let role = req.role.as_deref().map(str::parse::<Role>).transpose()?;
    let user = req.user.map(UserCode::new);
    let context = req.context.map(Context::new);

    let decision = state
        .evaluator
        .decide(user.as_ref(), role, context.as_ref())
        .await?;
    Ok(Json(DecideResponse { decision }))
}

/// `POST /permissions/authenticate`: Verify a user's secret.
///
/// # Errors
///
/// Returns [`LighthouseError::UnknownUser`] if the user does not exist.
#[utoipa::path(
    post,
    path = "/api/v1/permissions/authenticate",
    tag = "Permissions",
    summary = "Verify credentials",
    description = "Compares the SHA-256 digest of the secret with the user's stored credential.",
    request_body = AuthenticateRequest,
    responses(
        (status = 200, description = "Verification result", body = AuthenticateResponse),
        (status = 404, description = "Unknown user", body = ErrorResponse),
    )
)]
pub async fn authenticate(
    State(state): State<AppState>,
    Json(req): Json<AuthenticateRequest>,
) -> Result<impl IntoResponse, LighthouseError> {
    let authenticated = state
        .evaluator
        .authenticate(&UserCode::new(req.user), &req.secret)
        .await?;
    Ok(Json(AuthenticateResponse { authenticated }))
}

/// Permission routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/permissions/decide", post(decide))
        .route("/permissions/authenticate", post(authenticate))
}
