//! # lighthouse-core
//!
//! Context-based authorization and event/status propagation for
//! Lighthouse domains, exposed through a REST and WebSocket service.
//!
//! Every entity lives at a slash-separated context path. A user holds a
//! role on an entity when they, or one of their groups, hold an assignment
//! of that role on a prefix of the entity's context. Each open domain owns
//! a status tracker fed by the process-wide event bus; observer and
//! listener callbacks run in order on a single UI execution context.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── DomainService (service/)
//!     │     ├── LighthouseDomain ── StatusAggregationTracker
//!     │     ├── ListenerRegistry
//!     │     └── UiExecutor
//!     ├── PermissionEvaluator (auth/)
//!     ├── DomainEventBus (domain/)
//!     │
//!     └── User / Assignment / Operation registries (registry/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod registry;
pub mod server;
pub mod service;
pub mod ws;
