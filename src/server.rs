//! Wiring of the service graph and the HTTP router.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::app_state::AppState;
use crate::auth::{PermissionEvaluator, SystemClock};
use crate::config::LighthouseConfig;
use crate::domain::DomainEventBus;
use crate::error::LighthouseError;
use crate::registry::{
    AssignmentRegistry, ContextStore, MemoryRegistryProvider, MemoryUserRegistry,
    OperationCatalog, SeedData, UserRegistry,
};
use crate::service::{DomainListener, DomainService, ListenerRegistry, LoggingListener, UiExecutor};
use crate::ws::handler::ws_handler;

/// Builds registries, evaluator, event bus and domain service from
/// `config`, loading the seed file if one is configured.
///
/// # Errors
///
/// Returns [`LighthouseError`] if the seed file cannot be loaded or the UI
/// executor cannot start.
pub async fn build_state(config: &LighthouseConfig) -> Result<AppState, LighthouseError> {
    let users: Arc<dyn UserRegistry> = Arc::new(MemoryUserRegistry::new());
    let assignments: Arc<dyn AssignmentRegistry> = Arc::new(ContextStore::new());
    let catalog = Arc::new(OperationCatalog::new());

    if let Some(path) = &config.seed_file {
        SeedData::from_file(path)
            .await?
            .apply(users.as_ref(), assignments.as_ref(), &catalog)
            .await?;
    }

    let provider = Arc::new(MemoryRegistryProvider::new(
        Arc::clone(&users),
        Arc::clone(&assignments),
    ));
    let evaluator = Arc::new(PermissionEvaluator::with_clock(
        provider,
        Arc::new(SystemClock),
        config.missing_user_warn_window(),
    ));

    let event_bus = DomainEventBus::new(config.event_bus_capacity, config.topic_prefix.as_str());
    let listeners = Arc::new(ListenerRegistry::new(vec![
        Arc::new(LoggingListener) as Arc<dyn DomainListener>,
    ]));
    let ui = UiExecutor::start()?;

    let domain_service = Arc::new(DomainService::new(
        event_bus.clone(),
        listeners,
        ui,
        Arc::clone(&evaluator),
        Arc::clone(&catalog),
    ));

    Ok(AppState {
        domain_service,
        evaluator,
        event_bus,
        users,
        assignments,
        catalog,
    })
}

/// Builds the HTTP router: REST API, WebSocket endpoint, tracing, CORS
/// and a per-request timeout.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state)
}
