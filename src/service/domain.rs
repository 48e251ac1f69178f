//! One connected backend session.
//!
//! A [`LighthouseDomain`] exclusively owns its bus subscription and its
//! [`StatusAggregationTracker`]. [`LighthouseDomain::close`] tears both
//! down synchronously: once it returns, the subscription is gone from the
//! bus's subscriber table and no queued refresh will reach an observer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

use super::status_tracker::StatusAggregationTracker;
use super::UiExecutor;
use crate::domain::{
    Context, DomainEventBus, DomainKey, EventFilter, SessionId, SubscriptionId,
};

/// Open (or closed) connection to one backend.
#[derive(Debug)]
pub struct LighthouseDomain {
    key: DomainKey,
    session: SessionId,
    root_context: Context,
    opened_at: DateTime<Utc>,
    tracker: Arc<StatusAggregationTracker>,
    cancel: CancellationToken,
    bus: DomainEventBus,
    subscriptions: Mutex<Vec<SubscriptionId>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl LighthouseDomain {
    /// Opens a domain: creates its tracker and subscribes it to the bus
    /// for events of this domain.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn open(key: DomainKey, bus: &DomainEventBus, ui: UiExecutor) -> Arc<Self> {
        let cancel = CancellationToken::new();
        let tracker = Arc::new(StatusAggregationTracker::new(
            key.clone(),
            ui,
            cancel.clone(),
        ));
        let receiver =
            bus.subscribe_filtered(Some(key.clone()), EventFilter::any().and("code", "*"));
        let subscription = receiver.id();
        let task = tokio::spawn(Arc::clone(&tracker).run(receiver));

        let root_context = Context::new(format!("/{key}"));
        tracing::info!(domain = %key, "domain opened");
        Arc::new(Self {
            key,
            session: SessionId::new(),
            root_context,
            opened_at: Utc::now(),
            tracker,
            cancel,
            bus: bus.clone(),
            subscriptions: Mutex::new(vec![subscription]),
            tasks: Mutex::new(vec![task]),
            closed: AtomicBool::new(false),
        })
    }

    /// Domain key.
    #[must_use]
    pub const fn key(&self) -> &DomainKey {
        &self.key
    }

    /// Session created by this opening.
    #[must_use]
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// Context every entity of this domain lives under (`/<key>`).
    #[must_use]
    pub const fn root_context(&self) -> &Context {
        &self.root_context
    }

    /// The domain's status tracker.
    #[must_use]
    pub const fn tracker(&self) -> &Arc<StatusAggregationTracker> {
        &self.tracker
    }

    /// Number of this domain's subscriptions still registered on the bus.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .iter()
            .filter(|id| self.bus.is_subscribed(**id))
            .count()
    }

    /// Returns `true` once [`Self::close`] ran.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Releases subscriptions and observers. Idempotent; returns `false`
    /// if the domain was already closed.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.cancel.cancel();
        for id in self.subscriptions.lock().drain(..) {
            self.bus.unsubscribe(id);
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.tracker.clear_observers();
        tracing::info!(domain = %self.key, session = %self.session, "domain closed");
        true
    }

    /// Serializable summary.
    #[must_use]
    pub fn summary(&self) -> DomainSummary {
        DomainSummary {
            key: self.key.clone(),
            session: self.session,
            root_context: self.root_context.clone(),
            opened_at: self.opened_at,
            tracked_statuses: self.tracker.statuses().len(),
            closed: self.is_closed(),
        }
    }
}

impl Drop for LighthouseDomain {
    fn drop(&mut self) {
        self.close();
    }
}

/// Lightweight summary of a domain for list endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DomainSummary {
    /// Domain key.
    pub key: DomainKey,
    /// Session identifier.
    pub session: SessionId,
    /// Root authorization context.
    pub root_context: Context,
    /// Opening timestamp.
    pub opened_at: DateTime<Utc>,
    /// Number of tracked statuses.
    pub tracked_statuses: usize,
    /// Whether the domain has been closed.
    pub closed: bool,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Status, StatusChange, StatusCounters, StatusKey};
    use crate::service::status_tracker::StatusObserver;

    #[derive(Debug, Default)]
    struct Counter {
        hits: Mutex<usize>,
    }

    impl StatusObserver for Counter {
        fn status_refreshed(&self, _domain: &DomainKey, _status: &Status) {
            *self.hits.lock() += 1;
        }
    }

    fn ui() -> UiExecutor {
        let Ok(ui) = UiExecutor::start() else {
            panic!("ui executor should start");
        };
        ui
    }

    #[tokio::test]
    async fn open_subscribes_to_bus() {
        let bus = DomainEventBus::new(16, "lh");
        let domain = LighthouseDomain::open(DomainKey::new("prod"), &bus, ui());
        assert_eq!(bus.receiver_count(), 1);
        assert_eq!(domain.subscription_count(), 1);
        assert_eq!(domain.root_context().as_str(), "/prod");
    }

    #[tokio::test]
    async fn close_releases_subscription_before_returning() {
        let bus = DomainEventBus::new(16, "lh");
        let domain = LighthouseDomain::open(DomainKey::new("prod"), &bus, ui());
        tokio::task::yield_now().await;
        assert_eq!(bus.subscriptions_for(&DomainKey::new("prod")), 1);

        assert!(domain.close());
        assert_eq!(bus.receiver_count(), 0);
        assert_eq!(bus.subscriptions_for(&DomainKey::new("prod")), 0);
        assert!(domain.is_closed());
        assert_eq!(domain.subscription_count(), 0);
        assert!(!domain.close());
    }

    #[tokio::test]
    async fn events_reach_observers_until_close() {
        let ui = ui();
        let bus = DomainEventBus::new(16, "lh");
        let domain = LighthouseDomain::open(DomainKey::new("prod"), &bus, ui.clone());
        domain
            .tracker()
            .track_new(StatusKey::new("db"), Context::new("/prod/db"));
        let counter = Arc::new(Counter::default());
        domain
            .tracker()
            .add_observer(Arc::clone(&counter) as Arc<dyn StatusObserver>);

        bus.publish(crate::domain::DomainEvent::StatusAggregationChanged {
            domain: DomainKey::new("prod"),
            code: StatusKey::new("db"),
            change: StatusChange::event(StatusCounters::new(1, 0, 0)),
        });

        for _ in 0..100 {
            if domain.summary().tracked_statuses == 1
                && domain
                    .tracker()
                    .status(&StatusKey::new("db"))
                    .is_some_and(|s| s.history.len() == 1)
            {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(ui.flush().await.is_ok());
        assert_eq!(*counter.hits.lock(), 1);

        domain.close();
        bus.publish(crate::domain::DomainEvent::StatusAggregationChanged {
            domain: DomainKey::new("prod"),
            code: StatusKey::new("db"),
            change: StatusChange::event(StatusCounters::new(2, 0, 0)),
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(ui.flush().await.is_ok());
        assert_eq!(*counter.hits.lock(), 1);
    }
}
