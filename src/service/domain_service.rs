//! Domain service: opens and closes domains, routes inbound status
//! messages and guards operations with permission checks.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;

use super::domain::{DomainSummary, LighthouseDomain};
use super::listener_registry::ListenerRegistry;
use super::UiExecutor;
use crate::auth::PermissionEvaluator;
use crate::domain::{
    Context, DomainEvent, DomainEventBus, DomainKey, InstallationState, OperationInstallation,
    Role, Status, StatusKey, UserCode,
};
use crate::error::LighthouseError;
use crate::registry::OperationCatalog;

/// Orchestration layer for domain lifecycle, statuses and operations.
///
/// Owns the registry of open domains; shares the process-wide
/// [`DomainEventBus`], [`ListenerRegistry`] and [`UiExecutor`]. Listener
/// notifications are queued on the UI executor.
#[derive(Debug)]
pub struct DomainService {
    domains: RwLock<BTreeMap<DomainKey, Arc<LighthouseDomain>>>,
    event_bus: DomainEventBus,
    listeners: Arc<ListenerRegistry>,
    ui: UiExecutor,
    evaluator: Arc<PermissionEvaluator>,
    catalog: Arc<OperationCatalog>,
}

impl DomainService {
    /// Creates a new `DomainService`.
    #[must_use]
    pub fn new(
        event_bus: DomainEventBus,
        listeners: Arc<ListenerRegistry>,
        ui: UiExecutor,
        evaluator: Arc<PermissionEvaluator>,
        catalog: Arc<OperationCatalog>,
    ) -> Self {
        Self {
            domains: RwLock::new(BTreeMap::new()),
            event_bus,
            listeners,
            ui,
            evaluator,
            catalog,
        }
    }

    /// Returns a reference to the process-wide event bus.
    #[must_use]
    pub const fn event_bus(&self) -> &DomainEventBus {
        &self.event_bus
    }

    /// Returns the permission evaluator.
    #[must_use]
    pub const fn evaluator(&self) -> &Arc<PermissionEvaluator> {
        &self.evaluator
    }

    /// Returns the listener registry.
    #[must_use]
    pub const fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    /// Returns the UI executor.
    #[must_use]
    pub const fn ui(&self) -> &UiExecutor {
        &self.ui
    }

    /// Returns the operation catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Arc<OperationCatalog> {
        &self.catalog
    }

    /// Opens a domain and notifies listeners.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::InvalidRequest`] if the key cannot be
    /// used in a bus topic and [`LighthouseError::DomainAlreadyOpen`] if
    /// the domain is open already.
    pub fn open_domain(&self, key: DomainKey) -> Result<Arc<LighthouseDomain>, LighthouseError> {
        if !key.is_topic_safe() {
            return Err(LighthouseError::InvalidRequest(format!(
                "domain key `{key}` must be non-empty without `/` or whitespace"
            )));
        }
        let domain = {
            let mut domains = self.domains.write();
            if domains.contains_key(&key) {
                return Err(LighthouseError::DomainAlreadyOpen(key.to_string()));
            }
            let domain = LighthouseDomain::open(key.clone(), &self.event_bus, self.ui.clone());
            domains.insert(key, Arc::clone(&domain));
            domain
        };

        let _ = self.event_bus.publish(DomainEvent::DomainOpened {
            domain: domain.key().clone(),
            session: domain.session(),
            timestamp: Utc::now(),
        });
        self.queue_notification(&domain, true);
        Ok(domain)
    }

    /// Closes a domain. Its subscriptions are released before this
    /// returns; listeners are notified afterwards on the UI executor.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::DomainNotOpen`] if no such domain is open.
    pub fn close_domain(&self, key: &DomainKey) -> Result<DomainSummary, LighthouseError> {
        let domain = self
            .domains
            .write()
            .remove(key)
            .ok_or_else(|| LighthouseError::DomainNotOpen(key.to_string()))?;
        domain.close();

        let _ = self.event_bus.publish(DomainEvent::DomainClosed {
            domain: key.clone(),
            session: domain.session(),
            timestamp: Utc::now(),
        });
        self.queue_notification(&domain, false);
        Ok(domain.summary())
    }

    /// Closes every open domain.
    pub fn close_all(&self) {
        let keys: Vec<DomainKey> = self.domains.read().keys().cloned().collect();
        for key in keys {
            if let Err(e) = self.close_domain(&key) {
                tracing::warn!(domain = %key, error = %e, "closing domain failed");
            }
        }
    }

    /// Looks up an open domain.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::DomainNotOpen`] if no such domain is open.
    pub fn domain(&self, key: &DomainKey) -> Result<Arc<LighthouseDomain>, LighthouseError> {
        self.domains
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| LighthouseError::DomainNotOpen(key.to_string()))
    }

    /// Summaries of every open domain, ordered by key.
    #[must_use]
    pub fn list_domains(&self) -> Vec<DomainSummary> {
        self.domains
            .read()
            .values()
            .map(|domain| domain.summary())
            .collect()
    }

    /// Starts tracking a status in a domain. The context defaults to
    /// `<root>/<code>`.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::DomainNotOpen`] if no such domain is open.
    pub fn track_status(
        &self,
        key: &DomainKey,
        code: StatusKey,
        context: Option<Context>,
    ) -> Result<Status, LighthouseError> {
        let domain = self.domain(key)?;
        let context = context.unwrap_or_else(|| domain.root_context().child(code.as_str()));
        if !domain.tracker().track_new(code.clone(), context) {
            tracing::debug!(domain = %key, status = %code, "status already tracked");
        }
        domain
            .tracker()
            .status(&code)
            .ok_or_else(|| LighthouseError::Internal(format!("status {code} vanished")))
    }

    /// Returns a status snapshot after checking `STATUS_VIEW` on its
    /// context.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::DomainNotOpen`],
    /// [`LighthouseError::StatusNotTracked`], or any permission error.
    pub async fn status(
        &self,
        key: &DomainKey,
        code: &StatusKey,
        user: Option<&UserCode>,
    ) -> Result<Status, LighthouseError> {
        let status = self
            .domain(key)?
            .tracker()
            .status(code)
            .ok_or_else(|| LighthouseError::StatusNotTracked {
                domain: key.to_string(),
                code: code.to_string(),
            })?;
        self.evaluator
            .require(user, Role::StatusView, &status.context)
            .await?;
        Ok(status)
    }

    /// Injects a message as if it arrived from the backend's message bus.
    ///
    /// Returns the number of bus receivers reached.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::DomainNotOpen`] if the domain is not
    /// open and [`LighthouseError::InvalidRequest`] if the event belongs
    /// to another domain or is a lifecycle event.
    pub fn ingest(&self, key: &DomainKey, event: DomainEvent) -> Result<usize, LighthouseError> {
        self.domain(key)?;
        if event.domain() != key {
            return Err(LighthouseError::InvalidRequest(format!(
                "event for domain {} posted to {key}",
                event.domain()
            )));
        }
        if matches!(
            event,
            DomainEvent::DomainOpened { .. } | DomainEvent::DomainClosed { .. }
        ) {
            return Err(LighthouseError::InvalidRequest(
                "lifecycle events cannot be injected".to_string(),
            ));
        }
        let topic = self.event_bus.topic_of(&event);
        let delivered = self.event_bus.publish(event);
        tracing::debug!(%topic, delivered, "inbound message routed");
        Ok(delivered)
    }

    /// Installs an operation on a deployment after checking
    /// `OPERATION_INSTALL`.
    ///
    /// # Errors
    ///
    /// Returns any permission error.
    pub async fn install_operation(
        &self,
        code: &str,
        location: Context,
        user: Option<&UserCode>,
    ) -> Result<InstallationState, LighthouseError> {
        self.evaluator
            .require(user, Role::OperationInstall, &location)
            .await?;
        self.catalog
            .install(OperationInstallation::new(code, location.clone()))
            .await;
        Ok(self.installation_state(code, &location).await)
    }

    /// Resolves the installation of `code` at `location`.
    pub async fn installation_state(&self, code: &str, location: &Context) -> InstallationState {
        let installation = self.catalog.installation(code, location).await;
        let definition = self.catalog.definition(code).await;
        InstallationState::resolve(installation.as_ref(), definition.as_ref())
    }

    /// Executes an installed operation after checking `OPERATION_EXECUTE`.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::DomainNotOpen`], any permission error, or
    /// [`LighthouseError::OperationUnavailable`] if the installation is
    /// absent or broken.
    pub async fn execute_operation(
        &self,
        key: &DomainKey,
        code: &str,
        location: &Context,
        user: Option<&UserCode>,
    ) -> Result<(), LighthouseError> {
        self.domain(key)?;
        self.evaluator
            .require(user, Role::OperationExecute, location)
            .await?;

        let installation = self.installation_state(code, location).await;
        if !installation.is_executable() {
            let state = installation.label();
            tracing::warn!(
                domain = %key,
                operation = code,
                %location,
                state,
                "operation not executable"
            );
            return Err(LighthouseError::OperationUnavailable {
                code: code.to_string(),
                location: location.to_string(),
                state,
            });
        }

        let _ = self.event_bus.publish(DomainEvent::OperationExecuted {
            domain: key.clone(),
            code: code.to_string(),
            location: location.to_string(),
            user: user.map(ToString::to_string),
            timestamp: Utc::now(),
        });
        tracing::info!(domain = %key, operation = code, %location, "operation executed");
        Ok(())
    }

    fn queue_notification(&self, domain: &Arc<LighthouseDomain>, opened: bool) {
        let listeners = Arc::clone(&self.listeners);
        let domain = Arc::clone(domain);
        self.ui.submit(move || {
            let report = if opened {
                listeners.notify_opened(&domain)
            } else {
                listeners.notify_closed(&domain)
            };
            if report.failed > 0 {
                tracing::warn!(
                    domain = %domain.key(),
                    failed = report.failed,
                    "some domain listeners failed"
                );
            }
        });
    }
}
