//! Service layer: domain lifecycle, status propagation and listeners.
//!
//! [`DomainService`] opens and closes [`LighthouseDomain`]s, routes
//! inbound messages through the [`super::domain::DomainEventBus`] and
//! guards status reads and operation execution with the
//! [`super::auth::PermissionEvaluator`]. Observer and listener callbacks
//! run on the [`UiExecutor`].

pub mod domain;
pub mod domain_service;
pub mod listener_registry;
pub mod status_tracker;
pub mod ui_executor;

pub use domain::{DomainSummary, LighthouseDomain};
pub use domain_service::DomainService;
pub use listener_registry::{DomainListener, ListenerRegistry, LoggingListener, NotifyReport};
pub use status_tracker::{StatusAggregationTracker, StatusObserver, TrackerState};
pub use ui_executor::{UI_THREAD_NAME, UiExecutor};
