//! Context-based permission evaluation.
//!
//! [`PermissionEvaluator::decide`] answers "may this user exercise this
//! role on this context?" by prefix matching the queried context against
//! every assignment held by the user or one of its groups.
//!
//! Request-shape policy:
//!
//! | Input missing | Decision | Logging                              |
//! |---------------|----------|--------------------------------------|
//! | user          | deny     | warning, at most once per window     |
//! | context       | deny     | warning, every call                  |
//! | role          | allow    | info, every call                     |

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Duration;
use serde::Serialize;
use tokio::sync::OnceCell;
use utoipa::ToSchema;

use super::throttle::{Clock, SystemClock, WarnThrottle};
use crate::domain::{Context, Role, User, UserCode};
use crate::error::LighthouseError;
use crate::registry::{Registries, RegistryProvider};

/// Default window for the missing-user warning, in seconds (3 hours).
pub const MISSING_USER_WARN_WINDOW_SECS: i64 = 3 * 60 * 60;

/// Outcome of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Access granted.
    Allow,
    /// Access refused.
    Deny,
}

impl Decision {
    /// Returns `true` for [`Decision::Allow`].
    #[must_use]
    pub const fn is_allow(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Decides permission checks against the registries of a
/// [`RegistryProvider`].
///
/// The provider is consulted lazily on the first check and exactly once,
/// even when many checks race on first use.
#[derive(Debug)]
pub struct PermissionEvaluator {
    provider: Arc<dyn RegistryProvider>,
    registries: OnceCell<Registries>,
    clock: Arc<dyn Clock>,
    missing_user: WarnThrottle,
    missing_user_warnings: AtomicU64,
}

impl PermissionEvaluator {
    /// Creates an evaluator using the wall clock and the default
    /// missing-user warning window.
    #[must_use]
    pub fn new(provider: Arc<dyn RegistryProvider>) -> Self {
        Self::with_clock(
            provider,
            Arc::new(SystemClock),
            Duration::seconds(MISSING_USER_WARN_WINDOW_SECS),
        )
    }

    /// Creates an evaluator with an explicit clock and warning window.
    #[must_use]
    pub fn with_clock(
        provider: Arc<dyn RegistryProvider>,
        clock: Arc<dyn Clock>,
        warn_window: Duration,
    ) -> Self {
        Self {
            provider,
            registries: OnceCell::new(),
            clock,
            missing_user: WarnThrottle::new(warn_window),
            missing_user_warnings: AtomicU64::new(0),
        }
    }

    /// Returns the resolved registries, resolving them on first use.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if resolution fails; a later call
    /// retries.
    pub async fn registries(&self) -> Result<&Registries, LighthouseError> {
        self.registries
            .get_or_try_init(|| async {
                let registries = self.provider.resolve().await?;
                tracing::debug!("permission registries resolved");
                Ok(registries)
            })
            .await
    }

    /// Decides whether `user` holds `role` on `context`.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::UnknownUser`] if the user cannot be
    /// loaded, or the provider's error if the registries cannot be
    /// resolved.
    pub async fn decide(
        &self,
        user: Option<&UserCode>,
        role: Option<Role>,
        context: Option<&Context>,
    ) -> Result<Decision, LighthouseError> {
        let Some(user) = user else {
            if self.missing_user.should_emit(self.clock.now()) {
                self.missing_user_warnings.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    role = ?role.map(|r| r.id()),
                    context = ?context.map(Context::as_str),
                    "permission check without user denied; is authentication disabled?"
                );
            }
            return Ok(Decision::Deny);
        };
        let Some(context) = context else {
            tracing::warn!(
                %user,
                role = ?role.map(|r| r.id()),
                "permission check without context denied"
            );
            return Ok(Decision::Deny);
        };
        let Some(role) = role else {
            tracing::info!(%user, %context, "resource without role is public; allowed");
            return Ok(Decision::Allow);
        };

        let registries = self.registries().await?;
        let user = registries.users.find(user).await?;
        let decision = if self.holds(registries, &user, role, context).await {
            Decision::Allow
        } else {
            Decision::Deny
        };
        tracing::debug!(user = %user.code, %role, %context, ?decision, "permission decided");
        Ok(decision)
    }

    /// Like [`Self::decide`] but turns a denial into an error.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::PermissionDenied`] on denial, plus every
    /// error [`Self::decide`] can return.
    pub async fn require(
        &self,
        user: Option<&UserCode>,
        role: Role,
        context: &Context,
    ) -> Result<(), LighthouseError> {
        match self.decide(user, Some(role), Some(context)).await? {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(LighthouseError::PermissionDenied {
                role: role.id().to_string(),
                context: context.to_string(),
            }),
        }
    }

    /// Verifies a user's secret. Unknown users are errors; a wrong secret
    /// or an unreadable stored digest is `false`.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::UnknownUser`] if the user cannot be
    /// loaded.
    pub async fn authenticate(
        &self,
        code: &UserCode,
        secret: &str,
    ) -> Result<bool, LighthouseError> {
        let registries = self.registries().await?;
        let user = registries.users.find(code).await?;
        let verified = user.verify_credential(secret);
        if !verified {
            tracing::info!(user = %code, "credential mismatch");
        }
        Ok(verified)
    }

    /// Number of missing-user warnings actually emitted.
    #[must_use]
    pub fn missing_user_warnings(&self) -> u64 {
        self.missing_user_warnings.load(Ordering::Relaxed)
    }

    async fn holds(
        &self,
        registries: &Registries,
        user: &User,
        role: Role,
        context: &Context,
    ) -> bool {
        registries
            .assignments
            .for_subjects(&user.subjects())
            .await
            .iter()
            .any(|assignment| assignment.grants(role, context))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::auth::throttle::ManualClock;
    use crate::domain::{ContextRoleAssignment, GroupCode, Subject};
    use crate::registry::{
        AssignmentRegistry, ContextStore, MemoryRegistryProvider, MemoryUserRegistry, UserRegistry,
    };
    use async_trait::async_trait;
    use chrono::Utc;

    struct Fixture {
        provider: Arc<MemoryRegistryProvider>,
        clock: Arc<ManualClock>,
        evaluator: PermissionEvaluator,
    }

    fn fixture(assignments: Vec<ContextRoleAssignment>) -> Fixture {
        let users: Arc<dyn UserRegistry> = Arc::new(MemoryUserRegistry::with_users([
            User::new(UserCode::new("alice")).with_secret("pw"),
            User::new(UserCode::new("bob")).with_group(GroupCode::new("ops")),
        ]));
        let store: Arc<dyn AssignmentRegistry> =
            Arc::new(ContextStore::with_assignments(assignments));
        let provider = Arc::new(MemoryRegistryProvider::new(users, store));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let evaluator = PermissionEvaluator::with_clock(
            Arc::clone(&provider) as Arc<dyn RegistryProvider>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            Duration::seconds(MISSING_USER_WARN_WINDOW_SECS),
        );
        Fixture {
            provider,
            clock,
            evaluator,
        }
    }

    fn alice(role: Role, ctx: &str) -> ContextRoleAssignment {
        ContextRoleAssignment::new(Subject::User(UserCode::new("alice")), role, Context::new(ctx))
    }

    async fn decide(f: &Fixture, user: &str, role: Role, ctx: &str) -> Decision {
        let Ok(decision) = f
            .evaluator
            .decide(Some(&UserCode::new(user)), Some(role), Some(&Context::new(ctx)))
            .await
        else {
            panic!("decision should succeed");
        };
        decision
    }

    #[tokio::test]
    async fn status_view_scenario() {
        let f = fixture(vec![alice(Role::StatusView, "/env1")]);
        assert_eq!(decide(&f, "alice", Role::StatusView, "/env1/status1").await, Decision::Allow);
        assert_eq!(decide(&f, "alice", Role::StatusView, "/env2/status1").await, Decision::Deny);
    }

    #[tokio::test]
    async fn parent_assignment_allows_child_context() {
        let f = fixture(vec![alice(Role::DeploymentDelete, "/d1")]);
        assert_eq!(decide(&f, "alice", Role::DeploymentDelete, "/d1/dep1").await, Decision::Allow);
    }

    #[tokio::test]
    async fn child_assignment_denies_parent_context() {
        let f = fixture(vec![alice(Role::DeploymentDelete, "/d1/dep1")]);
        assert_eq!(decide(&f, "alice", Role::DeploymentDelete, "/d1").await, Decision::Deny);
    }

    #[tokio::test]
    async fn matching_context_with_other_role_denies() {
        let f = fixture(vec![alice(Role::StatusView, "/env1")]);
        assert_eq!(decide(&f, "alice", Role::OperationExecute, "/env1/op").await, Decision::Deny);
    }

    #[tokio::test]
    async fn no_assignments_denies() {
        let f = fixture(Vec::new());
        assert_eq!(decide(&f, "alice", Role::StatusView, "/").await, Decision::Deny);
    }

    #[tokio::test]
    async fn group_assignment_applies_to_members() {
        let f = fixture(vec![ContextRoleAssignment::new(
            Subject::Group(GroupCode::new("ops")),
            Role::OperationExecute,
            Context::new("/env1"),
        )]);
        assert_eq!(decide(&f, "bob", Role::OperationExecute, "/env1/dep1").await, Decision::Allow);
        assert_eq!(decide(&f, "alice", Role::OperationExecute, "/env1/dep1").await, Decision::Deny);
    }

    #[tokio::test]
    async fn unknown_user_is_an_error() {
        let f = fixture(vec![alice(Role::StatusView, "/")]);
        let result = f
            .evaluator
            .decide(
                Some(&UserCode::new("mallory")),
                Some(Role::StatusView),
                Some(&Context::new("/env1")),
            )
            .await;
        assert!(matches!(result, Err(LighthouseError::UnknownUser(_))));
    }

    #[tokio::test]
    async fn missing_context_denies_without_error() {
        let f = fixture(vec![alice(Role::StatusView, "/")]);
        let result = f
            .evaluator
            .decide(Some(&UserCode::new("alice")), Some(Role::StatusView), None)
            .await;
        assert!(matches!(result, Ok(Decision::Deny)));
    }

    #[tokio::test]
    async fn missing_role_allows_even_unknown_user() {
        let f = fixture(Vec::new());
        let result = f
            .evaluator
            .decide(Some(&UserCode::new("mallory")), None, Some(&Context::new("/x")))
            .await;
        assert!(matches!(result, Ok(Decision::Allow)));
        assert_eq!(f.provider.resolutions(), 0);
    }

    #[tokio::test]
    async fn missing_user_warning_is_throttled() {
        let f = fixture(Vec::new());
        let ctx = Context::new("/env1");

        let first = f.evaluator.decide(None, Some(Role::StatusView), Some(&ctx)).await;
        f.clock.advance(Duration::milliseconds(1));
        let second = f.evaluator.decide(None, Some(Role::StatusView), Some(&ctx)).await;

        assert!(matches!(first, Ok(Decision::Deny)));
        assert!(matches!(second, Ok(Decision::Deny)));
        assert_eq!(f.evaluator.missing_user_warnings(), 1);
    }

    #[tokio::test]
    async fn missing_user_warning_repeats_after_window() {
        let f = fixture(Vec::new());
        let ctx = Context::new("/env1");

        let _ = f.evaluator.decide(None, Some(Role::StatusView), Some(&ctx)).await;
        f.clock.advance(Duration::hours(4));
        let _ = f.evaluator.decide(None, Some(Role::StatusView), Some(&ctx)).await;

        assert_eq!(f.evaluator.missing_user_warnings(), 2);
    }

    #[tokio::test]
    async fn registries_resolve_once_under_concurrency() {
        let f = Arc::new(fixture(vec![alice(Role::StatusView, "/")]));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let f = Arc::clone(&f);
            handles.push(tokio::spawn(async move {
                f.evaluator
                    .decide(
                        Some(&UserCode::new("alice")),
                        Some(Role::StatusView),
                        Some(&Context::new("/env1")),
                    )
                    .await
                    .is_ok()
            }));
        }
        for handle in handles {
            assert!(matches!(handle.await, Ok(true)));
        }
        assert_eq!(f.provider.resolutions(), 1);
    }

    #[derive(Debug)]
    struct FailingProvider;

    #[async_trait]
    impl RegistryProvider for FailingProvider {
        async fn resolve(&self) -> Result<Registries, LighthouseError> {
            Err(LighthouseError::RegistryUnavailable("offline".to_string()))
        }
    }

    #[tokio::test]
    async fn resolution_failure_surfaces() {
        let evaluator = PermissionEvaluator::new(Arc::new(FailingProvider));
        let result = evaluator
            .decide(
                Some(&UserCode::new("alice")),
                Some(Role::StatusView),
                Some(&Context::new("/")),
            )
            .await;
        assert!(matches!(result, Err(LighthouseError::RegistryUnavailable(_))));
    }

    #[tokio::test]
    async fn require_maps_deny_to_error() {
        let f = fixture(vec![alice(Role::StatusView, "/env1")]);
        let user = UserCode::new("alice");
        let allowed = f
            .evaluator
            .require(Some(&user), Role::StatusView, &Context::new("/env1/a"))
            .await;
        assert!(allowed.is_ok());
        let denied = f
            .evaluator
            .require(Some(&user), Role::StatusView, &Context::new("/env2"))
            .await;
        assert!(matches!(denied, Err(LighthouseError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn authenticate_checks_secret() {
        let f = fixture(Vec::new());
        let alice = UserCode::new("alice");
        assert!(matches!(f.evaluator.authenticate(&alice, "pw").await, Ok(true)));
        assert!(matches!(f.evaluator.authenticate(&alice, "nope").await, Ok(false)));
        assert!(f.evaluator.authenticate(&UserCode::new("ghost"), "pw").await.is_err());
    }
}
