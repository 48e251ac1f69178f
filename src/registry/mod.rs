//! Registry seams for users, role assignments and operations.
//!
//! The authorization core talks to users and assignments only through the
//! [`UserRegistry`] and [`AssignmentRegistry`] traits. A
//! [`RegistryProvider`] hands out both and is resolved once, lazily, by the
//! [`crate::auth::PermissionEvaluator`]. In-memory implementations back the
//! service and the tests; a deployment may plug in remote registries.

pub mod memory;
pub mod seed;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ContextRoleAssignment, Subject, User, UserCode};
use crate::error::LighthouseError;

pub use memory::{ContextStore, MemoryRegistryProvider, MemoryUserRegistry, OperationCatalog};
pub use seed::SeedData;

/// Lookup and maintenance of users.
#[async_trait]
pub trait UserRegistry: Send + Sync + fmt::Debug {
    /// Loads a user by code.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::UnknownUser`] if no such user exists.
    async fn find(&self, code: &UserCode) -> Result<User, LighthouseError>;

    /// Lists every user, ordered by code.
    async fn list(&self) -> Vec<User>;

    /// Inserts or replaces a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the write.
    async fn upsert(&self, user: User) -> Result<(), LighthouseError>;

    /// Replaces a user's credential.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::UnknownUser`] if no such user exists.
    async fn update_credential(&self, code: &UserCode, secret: &str)
    -> Result<(), LighthouseError>;

    /// Deletes a user.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::UnknownUser`] if no such user exists.
    async fn delete(&self, code: &UserCode) -> Result<User, LighthouseError>;
}

/// Storage of context role assignments.
#[async_trait]
pub trait AssignmentRegistry: Send + Sync + fmt::Debug {
    /// Returns every assignment held by any of `subjects`.
    async fn for_subjects(&self, subjects: &[Subject]) -> Vec<ContextRoleAssignment>;

    /// Returns every stored assignment.
    async fn list(&self) -> Vec<ContextRoleAssignment>;

    /// Stores an assignment. Returns `false` if it already existed.
    async fn add(&self, assignment: ContextRoleAssignment) -> bool;

    /// Removes an assignment. Returns `false` if it was not present.
    async fn remove(&self, assignment: &ContextRoleAssignment) -> bool;
}

/// Both registries the evaluator depends on.
#[derive(Debug, Clone)]
pub struct Registries {
    /// User registry.
    pub users: Arc<dyn UserRegistry>,
    /// Assignment registry.
    pub assignments: Arc<dyn AssignmentRegistry>,
}

/// Resolves the registry collaborators.
///
/// Resolution may be expensive (connecting to a remote store), so callers
/// are expected to resolve once and keep the result.
#[async_trait]
pub trait RegistryProvider: Send + Sync + fmt::Debug {
    /// Resolves the user and assignment registries.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::RegistryUnavailable`] if a registry cannot
    /// be reached.
    async fn resolve(&self) -> Result<Registries, LighthouseError>;
}
