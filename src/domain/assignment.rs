//! Role grants scoped to a context.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Context, Role, Subject};

/// Grants `role` to `subject` for `context` and every context under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ContextRoleAssignment {
    /// User or group holding the grant.
    pub subject: Subject,
    /// Granted capability.
    pub role: Role,
    /// Scope of the grant.
    pub context: Context,
}

impl ContextRoleAssignment {
    /// Creates a new assignment.
    #[must_use]
    pub const fn new(subject: Subject, role: Role, context: Context) -> Self {
        Self {
            subject,
            role,
            context,
        }
    }

    /// Returns `true` if this assignment grants `role` on `target`.
    #[must_use]
    pub fn grants(&self, role: Role, target: &Context) -> bool {
        self.role == role && self.context.covers(target)
    }
}
