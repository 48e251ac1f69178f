//! Fan-out of domain lifecycle notifications.
//!
//! Listeners come from two places: a registration list handed to
//! [`ListenerRegistry::new`] at startup, and runtime calls to
//! [`ListenerRegistry::add_listener`] / [`ListenerRegistry::remove_listener`].
//! A listener is identified by its `Arc`, so registering the same
//! instance twice has no effect.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;

use super::domain::LighthouseDomain;
use crate::error::LighthouseError;

/// Receives domain lifecycle notifications.
pub trait DomainListener: Send + Sync + fmt::Debug {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Called after a domain was opened.
    ///
    /// # Errors
    ///
    /// Errors are logged by the registry and do not affect other listeners.
    fn domain_opened(&self, domain: &LighthouseDomain) -> Result<(), LighthouseError>;

    /// Called after a domain was closed and its subscriptions released.
    ///
    /// # Errors
    ///
    /// Errors are logged by the registry and do not affect other listeners.
    fn domain_closed(&self, domain: &LighthouseDomain) -> Result<(), LighthouseError>;
}

/// Listener that records lifecycle transitions in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl DomainListener for LoggingListener {
    fn name(&self) -> &str {
        "logging"
    }

    fn domain_opened(&self, domain: &LighthouseDomain) -> Result<(), LighthouseError> {
        tracing::info!(
            domain = %domain.key(),
            session = %domain.session(),
            "listener: domain opened"
        );
        Ok(())
    }

    fn domain_closed(&self, domain: &LighthouseDomain) -> Result<(), LighthouseError> {
        tracing::info!(
            domain = %domain.key(),
            session = %domain.session(),
            subscriptions = domain.subscription_count(),
            "listener: domain closed"
        );
        Ok(())
    }
}

/// Lifecycle phase being broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Opened,
    Closed,
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Listeners that returned `Ok`.
    pub delivered: usize,
    /// Listeners that returned an error or panicked.
    pub failed: usize,
}

/// Insertion-ordered set of [`DomainListener`]s.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn DomainListener>>>,
}

impl ListenerRegistry {
    /// Creates a registry from the startup registration list, dropping
    /// duplicate entries.
    #[must_use]
    pub fn new(registrations: Vec<Arc<dyn DomainListener>>) -> Self {
        let registry = Self::default();
        for listener in registrations {
            registry.add_listener(listener);
        }
        registry
    }

    /// Registers a listener. Returns `false` if it was already registered.
    pub fn add_listener(&self, listener: Arc<dyn DomainListener>) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        tracing::debug!(listener = listener.name(), "domain listener registered");
        listeners.push(listener);
        true
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, listener: &Arc<dyn DomainListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        before != listeners.len()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns `true` if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Notifies every listener that `domain` was opened.
    pub fn notify_opened(&self, domain: &LighthouseDomain) -> NotifyReport {
        self.broadcast(domain, Phase::Opened)
    }

    /// Notifies every listener that `domain` was closed.
    pub fn notify_closed(&self, domain: &LighthouseDomain) -> NotifyReport {
        self.broadcast(domain, Phase::Closed)
    }

    fn broadcast(&self, domain: &LighthouseDomain, phase: Phase) -> NotifyReport {
        // Snapshot so callbacks may add or remove listeners.
        let listeners = self.listeners.read().clone();
        let mut report = NotifyReport::default();
        for listener in &listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| match phase {
                Phase::Opened => listener.domain_opened(domain),
                Phase::Closed => listener.domain_closed(domain),
            }));
            match outcome {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!(
                        listener = listener.name(),
                        domain = %domain.key(),
                        ?phase,
                        error = %e,
                        "domain listener failed"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::error!(
                        listener = listener.name(),
                        domain = %domain.key(),
                        ?phase,
                        "domain listener panicked"
                    );
                }
            }
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{DomainEventBus, DomainKey};
    use crate::service::UiExecutor;
    use parking_lot::Mutex;

    #[derive(Debug)]
    enum Behaviour {
        Ok,
        Fail,
        Panic,
    }

    #[derive(Debug)]
    struct Recorder {
        name: String,
        behaviour: Behaviour,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn new(
            name: &str,
            behaviour: Behaviour,
            log: &Arc<Mutex<Vec<String>>>,
        ) -> Arc<dyn DomainListener> {
            Arc::new(Self {
                name: name.to_string(),
                behaviour,
                log: Arc::clone(log),
            })
        }

        fn record(&self, what: &str, domain: &LighthouseDomain) -> Result<(), LighthouseError> {
            self.log.lock().push(format!("{}:{what}:{}", self.name, domain.key()));
            match self.behaviour {
                Behaviour::Ok => Ok(()),
                Behaviour::Fail => Err(LighthouseError::Internal("listener failed".to_string())),
                Behaviour::Panic => panic!("listener panicked"),
            }
        }
    }

    impl DomainListener for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn domain_opened(&self, domain: &LighthouseDomain) -> Result<(), LighthouseError> {
            self.record("opened", domain)
        }

        fn domain_closed(&self, domain: &LighthouseDomain) -> Result<(), LighthouseError> {
            self.record("closed", domain)
        }
    }

    fn domain() -> Arc<LighthouseDomain> {
        let Ok(ui) = UiExecutor::start() else {
            panic!("ui executor should start");
        };
        LighthouseDomain::open(DomainKey::new("prod"), &DomainEventBus::new(8, "lh"), ui)
    }

    #[tokio::test]
    async fn adding_same_listener_twice_delivers_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = Recorder::new("a", Behaviour::Ok, &log);
        let registry = ListenerRegistry::new(Vec::new());
        assert!(registry.add_listener(Arc::clone(&listener)));
        assert!(!registry.add_listener(Arc::clone(&listener)));

        let report = registry.notify_opened(&domain());
        assert_eq!(report, NotifyReport { delivered: 1, failed: 0 });
        assert_eq!(log.lock().len(), 1);
    }

    #[tokio::test]
    async fn static_registrations_are_deduplicated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = Recorder::new("a", Behaviour::Ok, &log);
        let registry = ListenerRegistry::new(vec![Arc::clone(&listener), listener]);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn failing_listeners_do_not_stop_fan_out() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new(vec![
            Recorder::new("first", Behaviour::Fail, &log),
            Recorder::new("second", Behaviour::Panic, &log),
            Recorder::new("third", Behaviour::Ok, &log),
        ]);

        let report = registry.notify_closed(&domain());
        assert_eq!(report, NotifyReport { delivered: 1, failed: 2 });
        assert_eq!(
            *log.lock(),
            vec![
                "first:closed:prod".to_string(),
                "second:closed:prod".to_string(),
                "third:closed:prod".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn logging_listener_always_succeeds() {
        let registry =
            ListenerRegistry::new(vec![Arc::new(LoggingListener) as Arc<dyn DomainListener>]);
        let domain = domain();
        assert_eq!(registry.notify_opened(&domain).delivered, 1);
        domain.close();
        assert_eq!(registry.notify_closed(&domain).delivered, 1);
    }

    #[tokio::test]
    async fn removed_listener_is_not_notified() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = Recorder::new("a", Behaviour::Ok, &log);
        let registry = ListenerRegistry::new(vec![Arc::clone(&listener)]);
        assert!(registry.remove_listener(&listener));
        assert!(!registry.remove_listener(&listener));
        assert!(registry.is_empty());

        let report = registry.notify_opened(&domain());
        assert_eq!(report.delivered, 0);
        assert!(log.lock().is_empty());
    }
}
