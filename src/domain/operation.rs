//! Remote operations and their installations on deployments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Context;

/// Executable operation definition published by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Operation {
    /// Unique operation code.
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Binding of an operation code to a deployment location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OperationInstallation {
    /// Code of the installed operation.
    pub operation_code: String,
    /// Deployment context the operation is installed on.
    pub location: Context,
    /// Installation timestamp.
    pub installed_at: DateTime<Utc>,
}

impl OperationInstallation {
    /// Creates an installation stamped with the current time.
    #[must_use]
    pub fn new(operation_code: impl Into<String>, location: Context) -> Self {
        Self {
            operation_code: operation_code.into(),
            location,
            installed_at: Utc::now(),
        }
    }
}

/// Outcome of resolving an installation against the operation catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InstallationState {
    /// Installed and the definition resolves.
    Present {
        /// Resolved definition.
        operation: Operation,
    },
    /// Nothing is installed at the location.
    Absent,
    /// Installed, but the definition no longer resolves.
    Broken {
        /// Code the installation refers to.
        operation_code: String,
    },
}

impl InstallationState {
    /// Derives the state from an optional installation and an optional
    /// catalog definition.
    #[must_use]
    pub fn resolve(
        installation: Option<&OperationInstallation>,
        definition: Option<&Operation>,
    ) -> Self {
        match (installation, definition) {
            (None, _) => Self::Absent,
            (Some(_), Some(operation)) => Self::Present {
                operation: operation.clone(),
            },
            (Some(installation), None) => Self::Broken {
                operation_code: installation.operation_code.clone(),
            },
        }
    }

    /// Returns `true` only for [`InstallationState::Present`].
    #[must_use]
    pub const fn is_executable(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// Lowercase state name: `present`, `absent` or `broken`.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Present { .. } => "present",
            Self::Absent => "absent",
            Self::Broken { .. } => "broken",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restart() -> Operation {
        Operation {
            code: "restart".to_string(),
            name: "Restart".to_string(),
            description: None,
        }
    }

    #[test]
    fn missing_installation_is_absent() {
        assert_eq!(
            InstallationState::resolve(None, Some(&restart())),
            InstallationState::Absent
        );
    }

    #[test]
    fn missing_definition_is_broken() {
        let inst = OperationInstallation::new("restart", Context::new("/env1/dep1"));
        let state = InstallationState::resolve(Some(&inst), None);
        assert_eq!(
            state,
            InstallationState::Broken {
                operation_code: "restart".to_string()
            }
        );
        assert!(!state.is_executable());
        assert_eq!(state.label(), "broken");
    }

    #[test]
    fn resolved_definition_is_present() {
        let inst = OperationInstallation::new("restart", Context::new("/env1/dep1"));
        let state = InstallationState::resolve(Some(&inst), Some(&restart()));
        assert!(state.is_executable());
        assert_eq!(state.label(), "present");
        assert_eq!(InstallationState::Absent.label(), "absent");
    }
}
