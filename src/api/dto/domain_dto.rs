//! Domain, status and inbound-message DTOs.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::domain::{
    ChangeCause, Context, DomainEvent, DomainKey, StatusChange, StatusCounters, StatusKey,
};
use crate::service::DomainSummary;

/// Request body for `POST /domains`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OpenDomainRequest {
    /// Key of the backend to connect to.
    pub key: String,
}

/// Paginated response for `GET /domains`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DomainListResponse {
    /// Open domains on this page.
    pub data: Vec<DomainSummary>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Request body for `POST /domains/{key}/statuses`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TrackStatusRequest {
    /// Status code.
    pub code: String,
    /// Context of the owning entity. Defaults to `/<domain>/<code>`.
    #[serde(default)]
    pub context: Option<String>,
}

/// Inbound message injected through `POST /domains/{key}/events`, in the
/// shape a backend's message bus would deliver it.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestRequest {
    /// A full aggregation change record.
    Aggregation {
        /// Status code.
        code: String,
        /// Counters of the new record.
        counters: StatusCounters,
        /// Change cause; defaults to `event`.
        #[serde(default)]
        cause: Option<ChangeCause>,
    },
    /// The source counters of a status moved.
    Counter {
        /// Status code.
        code: String,
        /// Source counters.
        counters: StatusCounters,
    },
    /// Any other backend event.
    Remote {
        /// Backend event code.
        code: String,
        /// Opaque payload.
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl IngestRequest {
    /// Builds the bus event for `domain`.
    #[must_use]
    pub fn into_event(self, domain: DomainKey) -> DomainEvent {
        match self {
            Self::Aggregation {
                code,
                counters,
                cause,
            } => {
                let mut change = StatusChange::event(counters);
                change.cause = cause.unwrap_or(ChangeCause::Event);
                DomainEvent::StatusAggregationChanged {
                    domain,
                    code: StatusKey::new(code),
                    change,
                }
            }
            Self::Counter { code, counters } => DomainEvent::StatusCounterChanged {
                domain,
                code: StatusKey::new(code),
                change: StatusChange::event(counters),
            },
            Self::Remote { code, payload } => DomainEvent::Remote {
                domain,
                code,
                payload,
                timestamp: Utc::now(),
            },
        }
    }
}

/// Response body for `POST /domains/{key}/events`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngestResponse {
    /// Bus topic the message was published on.
    pub topic: String,
    /// Number of bus subscribers reached.
    pub delivered: usize,
}

/// Request body for operation install and execute endpoints.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OperationLocationRequest {
    /// Deployment context, e.g. `/prod/env1/dep1`.
    pub location: String,
}

impl OperationLocationRequest {
    /// Location as a [`Context`].
    #[must_use]
    pub fn context(&self) -> Context {
        Context::new(self.location.as_str())
    }
}

/// Response body for `POST /domains/{key}/operations/{code}/execute`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExecuteResponse {
    /// Operation code.
    pub code: String,
    /// Deployment context.
    pub location: String,
    /// Always `executed`.
    pub status: String,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_request_defaults_to_event_cause() {
        let Ok(req) = serde_json::from_str::<IngestRequest>(
            r#"{"kind":"aggregation","code":"db","counters":{"ok":1,"error":0,"stale":0}}"#,
        ) else {
            panic!("request should parse");
        };
        let DomainEvent::StatusAggregationChanged { change, code, .. } =
            req.into_event(DomainKey::new("prod"))
        else {
            panic!("expected aggregation event");
        };
        assert_eq!(code.as_str(), "db");
        assert_eq!(change.cause, ChangeCause::Event);
        assert_eq!(change.counters.ok, 1);
    }

    #[test]
    fn remote_request_keeps_payload() {
        let Ok(req) = serde_json::from_str::<IngestRequest>(
            r#"{"kind":"remote","code":"deployment.updated","payload":{"id":7}}"#,
        ) else {
            panic!("request should parse");
        };
        let event = req.into_event(DomainKey::new("prod"));
        assert_eq!(event.event_type_str(), "remote");
        assert_eq!(event.code(), Some("deployment.updated"));
    }
}
