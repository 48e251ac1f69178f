//! Domain handlers: open, list, close, status tracking and inbound
//! messages.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::dto::{
    DomainListResponse, IngestRequest, IngestResponse, OpenDomainRequest, PaginationParams,
    TrackStatusRequest, acting_user,
};
use crate::app_state::AppState;
use crate::domain::{Context, DomainKey, Status, StatusKey};
use crate::error::{ErrorResponse, LighthouseError};
use crate::service::DomainSummary;

/// `POST /domains`: Open a domain.
///
/// # Errors
///
/// Returns [`LighthouseError`] for an invalid key or a domain that is
/// already open.
#[utoipa::path(
    post,
    path = "/api/v1/domains",
    tag = "Domains",
    summary = "Open a domain",
    description = "Connects to a backend: subscribes its status tracker to the event bus and notifies domain listeners.",
    request_body = OpenDomainRequest,
    responses(
        (status = 201, description = "Domain opened", body = DomainSummary),
        (status = 400, description = "Invalid domain key", body = ErrorResponse),
        (status = 409, description = "Domain already open", body = ErrorResponse),
    )
)]
pub async fn open_domain(
    State(state): State<AppState>,
    Json(req): Json<OpenDomainRequest>,
) -> Result<impl IntoResponse, LighthouseError> {
    let domain = state.domain_service.open_domain(DomainKey::new(req.key))?;
    Ok((StatusCode::CREATED, Json(domain.summary())))
}

/// `GET /domains`: List open domains.
#[utoipa::path(
    get,
    path = "/api/v1/domains",
    tag = "Domains",
    summary = "List open domains",
    description = "Returns a paginated list of open domains ordered by key.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated domain list", body = DomainListResponse),
    )
)]
pub async fn list_domains(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let (data, pagination) = params.paginate(state.domain_service.list_domains());
    Json(DomainListResponse { data, pagination })
}

/// `DELETE /domains/{key}`: Close a domain.
///
/// # Errors
///
/// Returns [`LighthouseError::DomainNotOpen`] if the domain is not open.
#[utoipa::path(
    delete,
    path = "/api/v1/domains/{key}",
    tag = "Domains",
    summary = "Close a domain",
    description = "Releases the domain's subscriptions, then notifies domain listeners.",
    params(("key" = String, Path, description = "Domain key")),
    responses(
        (status = 200, description = "Domain closed", body = DomainSummary),
        (status = 404, description = "Domain not open", body = ErrorResponse),
    )
)]
pub async fn close_domain(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, LighthouseError> {
    let summary = state.domain_service.close_domain(&DomainKey::new(key))?;
    Ok(Json(summary))
}

/// `POST /domains/{key}/statuses`: Start tracking a status.
///
/// # Errors
///
/// Returns [`LighthouseError`] for an empty code or a domain that is not
/// open.
#[utoipa::path(
    post,
    path = "/api/v1/domains/{key}/statuses",
    tag = "Statuses",
    summary = "Track a status",
    description = "Registers a status with the domain's tracker. Tracking an already tracked status is a no-op.",
    params(("key" = String, Path, description = "Domain key")),
    request_body = TrackStatusRequest,
    responses(
        (status = 201, description = "Status tracked", body = Status),
        (status = 400, description = "Invalid status code", body = ErrorResponse),
        (status = 404, description = "Domain not open", body = ErrorResponse),
    )
)]
pub async fn track_status(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<TrackStatusRequest>,
) -> Result<impl IntoResponse, LighthouseError> {
    if req.code.trim().is_empty() {
        return Err(LighthouseError::InvalidRequest(
            "status code must not be empty".to_string(),
        ));
    }
    let status = state.domain_service.track_status(
        &DomainKey::new(key),
        StatusKey::new(req.code),
        req.context.map(Context::new),
    )?;
    Ok((StatusCode::CREATED, Json(status)))
}

/// `GET /domains/{key}/statuses/{code}`: Current status snapshot.
///
/// # Errors
///
/// Returns [`LighthouseError`] when the status is unknown or the acting
/// user lacks `STATUS_VIEW` on its context.
#[utoipa::path(
    get,
    path = "/api/v1/domains/{key}/statuses/{code}",
    tag = "Statuses",
    summary = "Get a status",
    description = "Returns the status with its change history. The user in `x-lighthouse-user` needs STATUS_VIEW on the status context.",
    params(
        ("key" = String, Path, description = "Domain key"),
        ("code" = String, Path, description = "Status code"),
        ("x-lighthouse-user" = Option<String>, Header, description = "Acting user"),
    ),
    responses(
        (status = 200, description = "Status snapshot", body = Status),
        (status = 403, description = "Permission denied", body = ErrorResponse),
        (status = 404, description = "Domain not open or status not tracked", body = ErrorResponse),
    )
)]
pub async fn get_status(
    State(state): State<AppState>,
    Path((key, code)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, LighthouseError> {
    let user = acting_user(&headers);
    let status = state
        .domain_service
        .status(&DomainKey::new(key), &StatusKey::new(code), user.as_ref())
        .await?;
    Ok(Json(status))
}

/// `POST /domains/{key}/events`: Inject an inbound message.
///
/// # Errors
///
/// Returns [`LighthouseError::DomainNotOpen`] if the domain is not open.
#[utoipa::path(
    post,
    path = "/api/v1/domains/{key}/events",
    tag = "Statuses",
    summary = "Inject a message",
    description = "Publishes a status or remote message on the event bus as if it had been received from the backend.",
    params(("key" = String, Path, description = "Domain key")),
    request_body = IngestRequest,
    responses(
        (status = 202, description = "Message published", body = IngestResponse),
        (status = 404, description = "Domain not open", body = ErrorResponse),
    )
)]
pub async fn ingest_event(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<IngestRequest>,
) -> Result<impl IntoResponse, LighthouseError> {
    let key = DomainKey::new(key);
    let event = req.into_event(key.clone());
    let topic = state.event_bus.topic_of(&event).to_string();
    let delivered = state.domain_service.ingest(&key, event)?;
    Ok((StatusCode::ACCEPTED, Json(IngestResponse { topic, delivered })))
}

/// Domain and status routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/domains", get(list_domains).post(open_domain))
        .route("/domains/{key}", delete(close_domain))
        .route("/domains/{key}/statuses", post(track_status))
        .route("/domains/{key}/statuses/{code}", get(get_status))
        .route("/domains/{key}/events", post(ingest_event))
}
