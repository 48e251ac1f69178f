//! Domain layer: identities, authorization model, statuses and events.
//!
//! This module contains the data model shared by the authorization core
//! and the event pipeline: contexts and roles, users and their role
//! assignments, statuses with their change history, operation
//! installations, and the process-wide event bus with its topic scheme.

pub mod assignment;
pub mod context;
pub mod domain_event;
pub mod domain_key;
pub mod event_bus;
pub mod operation;
pub mod role;
pub mod status;
pub mod topic;
pub mod user;

pub use assignment::ContextRoleAssignment;
pub use context::Context;
pub use domain_event::DomainEvent;
pub use domain_key::{DomainKey, SessionId};
pub use event_bus::{DomainEventBus, FilteredReceiver, SubscriptionId};
pub use operation::{InstallationState, Operation, OperationInstallation};
pub use role::Role;
pub use status::{ChangeCause, Status, StatusChange, StatusCounters, StatusKey};
pub use topic::{EventFilter, Topic};
pub use user::{GroupCode, Subject, User, UserCode};
