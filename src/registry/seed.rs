//! JSON seed data for the in-memory registries.
//!
//! ```json
//! {
//!   "users": [{ "code": "alice", "secret": "pw", "groups": ["ops"] }],
//!   "assignments": [
//!     { "subject": { "kind": "group", "code": "ops" },
//!       "role": "STATUS_VIEW", "context": "/env1" }
//!   ],
//!   "operations": [{ "code": "restart", "name": "Restart" }],
//!   "installations": [{ "operation_code": "restart", "location": "/env1/dep1" }]
//! }
//! ```

use std::path::Path;

use chrono::Utc;
use serde::Deserialize;

use super::{AssignmentRegistry, OperationCatalog, UserRegistry};
use crate::domain::{
    Context, ContextRoleAssignment, GroupCode, Operation, OperationInstallation, User, UserCode,
};
use crate::error::LighthouseError;

/// User entry of a seed file. Carries either a plain secret or a
/// precomputed credential hash.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    /// Login code.
    pub code: UserCode,
    /// Optional display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Plain secret, hashed on load.
    #[serde(default)]
    pub secret: Option<String>,
    /// Precomputed hex SHA-256 digest, used when `secret` is absent.
    #[serde(default)]
    pub credential_hash: Option<String>,
    /// Group memberships.
    #[serde(default)]
    pub groups: Vec<GroupCode>,
}

impl From<SeedUser> for User {
    fn from(seed: SeedUser) -> Self {
        let mut user = Self::new(seed.code);
        user.display_name = seed.display_name;
        user.groups = seed.groups;
        match (seed.secret, seed.credential_hash) {
            (Some(secret), _) => user.set_credential(&secret),
            (None, Some(hash)) => user.credential_hash = hash,
            (None, None) => {}
        }
        user
    }
}

/// Installation entry of a seed file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedInstallation {
    /// Installed operation code.
    pub operation_code: String,
    /// Deployment context.
    pub location: Context,
}

/// Parsed seed file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    /// Users to load.
    #[serde(default)]
    pub users: Vec<SeedUser>,
    /// Role assignments to load.
    #[serde(default)]
    pub assignments: Vec<ContextRoleAssignment>,
    /// Operation definitions.
    #[serde(default)]
    pub operations: Vec<Operation>,
    /// Operation installations.
    #[serde(default)]
    pub installations: Vec<SeedInstallation>,
}

impl SeedData {
    /// Parses seed data from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::InvalidRequest`] on malformed JSON or an
    /// unknown role identifier.
    pub fn from_json(raw: &str) -> Result<Self, LighthouseError> {
        serde_json::from_str(raw)
            .map_err(|e| LighthouseError::InvalidRequest(format!("seed data: {e}")))
    }

    /// Reads and parses a seed file.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::Internal`] if the file cannot be read and
    /// [`LighthouseError::InvalidRequest`] if it cannot be parsed.
    pub async fn from_file(path: &Path) -> Result<Self, LighthouseError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            LighthouseError::Internal(format!("reading seed file {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Loads the seed into the given registries.
    ///
    /// # Errors
    ///
    /// Propagates user registry write failures.
    pub async fn apply(
        self,
        users: &dyn UserRegistry,
        assignments: &dyn AssignmentRegistry,
        catalog: &OperationCatalog,
    ) -> Result<(), LighthouseError> {
        let (user_count, assignment_count) = (self.users.len(), self.assignments.len());
        for user in self.users {
            users.upsert(user.into()).await?;
        }
        for assignment in self.assignments {
            assignments.add(assignment).await;
        }
        for operation in self.operations {
            catalog.define(operation).await;
        }
        for inst in self.installations {
            catalog
                .install(OperationInstallation {
                    operation_code: inst.operation_code,
                    location: inst.location,
                    installed_at: Utc::now(),
                })
                .await;
        }
        tracing::info!(
            users = user_count,
            assignments = assignment_count,
            "seed data loaded"
        );
        Ok(())
    }
}
