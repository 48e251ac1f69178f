//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::PermissionEvaluator;
use crate::domain::DomainEventBus;
use crate::registry::{AssignmentRegistry, OperationCatalog, UserRegistry};
use crate::service::DomainService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Domain lifecycle, status and operation orchestration.
    pub domain_service: Arc<DomainService>,
    /// Context-based permission decisions.
    pub evaluator: Arc<PermissionEvaluator>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: DomainEventBus,
    /// User registry.
    pub users: Arc<dyn UserRegistry>,
    /// Context store holding role assignments.
    pub assignments: Arc<dyn AssignmentRegistry>,
    /// Operation definitions and installations.
    pub catalog: Arc<OperationCatalog>,
}
