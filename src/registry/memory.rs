//! In-memory registries.
//!
//! Each store keeps its data behind a [`tokio::sync::RwLock`] so lookups
//! from concurrent permission checks proceed in parallel while writes are
//! serialized.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AssignmentRegistry, Registries, RegistryProvider, UserRegistry};
use crate::domain::{
    Context, ContextRoleAssignment, Operation, OperationInstallation, Subject, User, UserCode,
};
use crate::error::LighthouseError;

/// User registry keyed by user code.
#[derive(Debug, Default)]
pub struct MemoryUserRegistry {
    users: RwLock<BTreeMap<UserCode, User>>,
}

impl MemoryUserRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-filled with `users`.
    #[must_use]
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let map = users.into_iter().map(|u| (u.code.clone(), u)).collect();
        Self {
            users: RwLock::new(map),
        }
    }
}

#[async_trait]
impl UserRegistry for MemoryUserRegistry {
    async fn find(&self, code: &UserCode) -> Result<User, LighthouseError> {
        self.users
            .read()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| LighthouseError::UnknownUser(code.to_string()))
    }

    async fn list(&self) -> Vec<User> {
        self.users.read().await.values().cloned().collect()
    }

    async fn upsert(&self, user: User) -> Result<(), LighthouseError> {
        self.users.write().await.insert(user.code.clone(), user);
        Ok(())
    }

    async fn update_credential(
        &self,
        code: &UserCode,
        secret: &str,
    ) -> Result<(), LighthouseError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(code)
            .ok_or_else(|| LighthouseError::UnknownUser(code.to_string()))?;
        user.set_credential(secret);
        tracing::info!(user = %code, "credential updated");
        Ok(())
    }

    async fn delete(&self, code: &UserCode) -> Result<User, LighthouseError> {
        self.users
            .write()
            .await
            .remove(code)
            .ok_or_else(|| LighthouseError::UnknownUser(code.to_string()))
    }
}

/// Holds `(subject, role, context)` triples, indexed by subject.
#[derive(Debug, Default)]
pub struct ContextStore {
    by_subject: RwLock<HashMap<Subject, HashSet<ContextRoleAssignment>>>,
}

impl ContextStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `assignments`.
    #[must_use]
    pub fn with_assignments(assignments: impl IntoIterator<Item = ContextRoleAssignment>) -> Self {
        let mut map: HashMap<Subject, HashSet<ContextRoleAssignment>> = HashMap::new();
        for assignment in assignments {
            map.entry(assignment.subject.clone())
                .or_default()
                .insert(assignment);
        }
        Self {
            by_subject: RwLock::new(map),
        }
    }
}

#[async_trait]
impl AssignmentRegistry for ContextStore {
    async fn for_subjects(&self, subjects: &[Subject]) -> Vec<ContextRoleAssignment> {
        let map = self.by_subject.read().await;
        subjects
            .iter()
            .filter_map(|subject| map.get(subject))
            .flat_map(|set| set.iter().cloned())
            .collect()
    }

    async fn list(&self) -> Vec<ContextRoleAssignment> {
        let map = self.by_subject.read().await;
        let mut all: Vec<_> = map.values().flat_map(|set| set.iter().cloned()).collect();
        all.sort_by(|a, b| {
            (a.subject.to_string(), a.role.id(), &a.context).cmp(&(
                b.subject.to_string(),
                b.role.id(),
                &b.context,
            ))
        });
        all
    }

    async fn add(&self, assignment: ContextRoleAssignment) -> bool {
        let mut map = self.by_subject.write().await;
        map.entry(assignment.subject.clone())
            .or_default()
            .insert(assignment)
    }

    async fn remove(&self, assignment: &ContextRoleAssignment) -> bool {
        let mut map = self.by_subject.write().await;
        let Some(set) = map.get_mut(&assignment.subject) else {
            return false;
        };
        let removed = set.remove(assignment);
        if set.is_empty() {
            map.remove(&assignment.subject);
        }
        removed
    }
}

/// Provider handing out fixed in-memory registries.
///
/// Counts resolutions so callers can verify resolve-once behaviour.
#[derive(Debug)]
pub struct MemoryRegistryProvider {
    registries: Registries,
    resolutions: AtomicUsize,
}

impl MemoryRegistryProvider {
    /// Wraps the given registries.
    #[must_use]
    pub fn new(users: Arc<dyn UserRegistry>, assignments: Arc<dyn AssignmentRegistry>) -> Self {
        Self {
            registries: Registries { users, assignments },
            resolutions: AtomicUsize::new(0),
        }
    }

    /// Number of times [`RegistryProvider::resolve`] was called.
    #[must_use]
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryProvider for MemoryRegistryProvider {
    async fn resolve(&self) -> Result<Registries, LighthouseError> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("resolving in-memory registries");
        Ok(self.registries.clone())
    }
}

/// Operation definitions and their installations.
#[derive(Debug, Default)]
pub struct OperationCatalog {
    definitions: RwLock<HashMap<String, Operation>>,
    installations: RwLock<HashMap<(String, Context), OperationInstallation>>,
}

impl OperationCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces an operation definition.
    pub async fn define(&self, operation: Operation) {
        self.definitions
            .write()
            .await
            .insert(operation.code.clone(), operation);
    }

    /// Removes a definition, leaving its installations broken.
    pub async fn undefine(&self, code: &str) -> Option<Operation> {
        self.definitions.write().await.remove(code)
    }

    /// Looks up a definition.
    pub async fn definition(&self, code: &str) -> Option<Operation> {
        self.definitions.read().await.get(code).cloned()
    }

    /// Lists all definitions, ordered by code.
    pub async fn definitions(&self) -> Vec<Operation> {
        let mut all: Vec<_> = self.definitions.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.code.cmp(&b.code));
        all
    }

    /// Records an installation, replacing any previous one at the same
    /// location.
    pub async fn install(&self, installation: OperationInstallation) {
        let key = (
            installation.operation_code.clone(),
            installation.location.clone(),
        );
        self.installations.write().await.insert(key, installation);
    }

    /// Removes an installation.
    pub async fn uninstall(&self, code: &str, location: &Context) -> Option<OperationInstallation> {
        self.installations
            .write()
            .await
            .remove(&(code.to_string(), location.clone()))
    }

    /// Looks up the installation of `code` at `location`.
    pub async fn installation(
        &self,
        code: &str,
        location: &Context,
    ) -> Option<OperationInstallation> {
        self.installations
            .read()
            .await
            .get(&(code.to_string(), location.clone()))
            .cloned()
    }
}
