//! Events carried by the process-wide [`super::DomainEventBus`].
//!
//! Lifecycle events are published by the domain service; status and
//! remote events represent notifications received from a backend's
//! message bus and are consumed by each domain's status tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{DomainKey, SessionId, StatusChange, StatusKey};

/// Domain event broadcast to every bus subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A domain was opened.
    DomainOpened {
        /// Domain key.
        domain: DomainKey,
        /// Session created by the opening.
        session: SessionId,
        /// Opening timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A domain was closed and its subscriptions released.
    DomainClosed {
        /// Domain key.
        domain: DomainKey,
        /// Session that ended.
        session: SessionId,
        /// Closing timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The aggregated state of a status changed; carries the new record.
    StatusAggregationChanged {
        /// Domain key.
        domain: DomainKey,
        /// Status code.
        code: StatusKey,
        /// Delivered change record.
        change: StatusChange,
    },

    /// The counters of a status changed at the source.
    StatusCounterChanged {
        /// Domain key.
        domain: DomainKey,
        /// Status code.
        code: StatusKey,
        /// Change carrying the source counters.
        change: StatusChange,
    },

    /// An operation was executed on a deployment.
    OperationExecuted {
        /// Domain key.
        domain: DomainKey,
        /// Operation code.
        code: String,
        /// Deployment context.
        location: String,
        /// Executing user, if authenticated.
        #[serde(default)]
        user: Option<String>,
        /// Execution timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Any other backend event, forwarded untouched.
    Remote {
        /// Domain key.
        domain: DomainKey,
        /// Backend event code.
        code: String,
        /// Opaque payload.
        #[serde(default)]
        payload: serde_json::Value,
        /// Reception timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Returns the key of the domain this event belongs to.
    #[must_use]
    pub const fn domain(&self) -> &DomainKey {
        match self {
            Self::DomainOpened { domain, .. }
            | Self::DomainClosed { domain, .. }
            | Self::StatusAggregationChanged { domain, .. }
            | Self::StatusCounterChanged { domain, .. }
            | Self::OperationExecuted { domain, .. }
            | Self::Remote { domain, .. } => domain,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::DomainOpened { .. } => "domain_opened",
            Self::DomainClosed { .. } => "domain_closed",
            Self::StatusAggregationChanged { .. } => "status_aggregation_changed",
            Self::StatusCounterChanged { .. } => "status_counter_changed",
            Self::OperationExecuted { .. } => "operation_executed",
            Self::Remote { .. } => "remote",
        }
    }

    /// Returns the entity code carried by the event, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::StatusAggregationChanged { code, .. }
            | Self::StatusCounterChanged { code, .. } => Some(code.as_str()),
            Self::OperationExecuted { code, .. } | Self::Remote { code, .. } => Some(code),
            Self::DomainOpened { .. } | Self::DomainClosed { .. } => None,
        }
    }

    /// Looks up a filterable event property by name.
    ///
    /// Exposed properties: `type`, `domain`, `code`.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        match name {
            "type" => Some(self.event_type_str()),
            "domain" => Some(self.domain().as_str()),
            "code" => self.code(),
            _ => None,
        }
    }
}
