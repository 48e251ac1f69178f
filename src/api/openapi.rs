//! OpenAPI document assembled from the handler annotations.

use utoipa::OpenApi;

use super::dto;
use super::handlers::{domain, operation, permission, system};
use crate::auth::Decision;
use crate::domain::{
    ChangeCause, Context, DomainEvent, DomainKey, InstallationState, Operation, Role, SessionId,
    Status, StatusChange, StatusCounters, StatusKey,
};
use crate::error::{ErrorBody, ErrorResponse};
use crate::service::DomainSummary;

/// OpenAPI description of the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "lighthouse-core",
        description = "Context-based authorization and status propagation for Lighthouse domains."
    ),
    paths(
        system::health_handler,
        system::roles_handler,
        permission::decide,
        permission::authenticate,
        domain::open_domain,
        domain::list_domains,
        domain::close_domain,
        domain::track_status,
        domain::get_status,
        domain::ingest_event,
        operation::install_operation,
        operation::execute_operation,
    ),
    components(schemas(
        ErrorResponse,
        ErrorBody,
        Decision,
        Role,
        Context,
        DomainKey,
        SessionId,
        DomainEvent,
        DomainSummary,
        Status,
        StatusKey,
        StatusChange,
        StatusCounters,
        ChangeCause,
        Operation,
        InstallationState,
        dto::DecideRequest,
        dto::DecideResponse,
        dto::AuthenticateRequest,
        dto::AuthenticateResponse,
        dto::RoleInfo,
        dto::OpenDomainRequest,
        dto::DomainListResponse,
        dto::PaginationMeta,
        dto::TrackStatusRequest,
        dto::IngestRequest,
        dto::IngestResponse,
        dto::OperationLocationRequest,
        dto::ExecuteResponse,
    )),
    tags(
        (name = "System", description = "Health and role catalog"),
        (name = "Permissions", description = "Context-based permission checks"),
        (name = "Domains", description = "Backend connections"),
        (name = "Statuses", description = "Status tracking and inbound messages"),
        (name = "Operations", description = "Operation installation and execution"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/v1/roles",
            "/api/v1/permissions/decide",
            "/api/v1/domains",
            "/api/v1/domains/{key}/statuses/{code}",
            "/api/v1/domains/{key}/operations/{code}/execute",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
