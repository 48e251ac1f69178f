//! Closed role catalog.
//!
//! Every [`Role`] carries a stable upper-case identifier used on the wire
//! and in stored assignments. New roles are added here, never at runtime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::LighthouseError;

/// Named capability checked against context role assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// View statuses and their change history.
    StatusView,
    /// Clear a status manually.
    StatusClear,
    /// View deployments.
    DeploymentView,
    /// Create or update deployments.
    DeploymentEdit,
    /// Delete deployments.
    DeploymentDelete,
    /// View environments.
    EnvironmentView,
    /// View operations and their installations.
    OperationView,
    /// Install an operation on a deployment.
    OperationInstall,
    /// Execute an installed operation.
    OperationExecute,
    /// View process tasks.
    ProcessTaskView,
    /// Manage users, groups and role assignments.
    UserAdmin,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::StatusView,
        Self::StatusClear,
        Self::DeploymentView,
        Self::DeploymentEdit,
        Self::DeploymentDelete,
        Self::EnvironmentView,
        Self::OperationView,
        Self::OperationInstall,
        Self::OperationExecute,
        Self::ProcessTaskView,
        Self::UserAdmin,
    ];

    /// Returns the stable wire identifier.
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::StatusView => "STATUS_VIEW",
            Self::StatusClear => "STATUS_CLEAR",
            Self::DeploymentView => "DEPLOYMENT_VIEW",
            Self::DeploymentEdit => "DEPLOYMENT_EDIT",
            Self::DeploymentDelete => "DEPLOYMENT_DELETE",
            Self::EnvironmentView => "ENVIRONMENT_VIEW",
            Self::OperationView => "OPERATION_VIEW",
            Self::OperationInstall => "OPERATION_INSTALL",
            Self::OperationExecute => "OPERATION_EXECUTE",
            Self::ProcessTaskView => "PROCESS_TASK_VIEW",
            Self::UserAdmin => "USER_ADMIN",
        }
    }

    /// Returns a short human-readable description.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::StatusView => "View statuses and their history",
            Self::StatusClear => "Manually clear statuses",
            Self::DeploymentView => "View deployments",
            Self::DeploymentEdit => "Create and update deployments",
            Self::DeploymentDelete => "Delete deployments",
            Self::EnvironmentView => "View environments",
            Self::OperationView => "View operations and installations",
            Self::OperationInstall => "Install operations on deployments",
            Self::OperationExecute => "Execute installed operations",
            Self::ProcessTaskView => "View process tasks",
            Self::UserAdmin => "Administer users, groups and assignments",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Role {
    type Err = LighthouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.id() == s)
            .ok_or_else(|| LighthouseError::InvalidRole(s.to_string()))
    }
}
