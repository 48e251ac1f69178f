//! Incremental status aggregation driven by bus messages.
//!
//! Each domain owns one [`StatusAggregationTracker`]. Inbound
//! `status_aggregation_changed` messages append to a status's history;
//! `status_counter_changed` messages move the current counters one step
//! towards the delivered values. Every applied message queues a refresh
//! of the registered [`StatusObserver`]s on the [`UiExecutor`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use super::UiExecutor;
use crate::domain::{Context, DomainEvent, DomainKey, FilteredReceiver, Status, StatusKey};

/// Receives refreshed status snapshots on the UI executor.
pub trait StatusObserver: Send + Sync + fmt::Debug {
    /// Called with the status as it was right after an update.
    fn status_refreshed(&self, domain: &DomainKey, status: &Status);
}

/// Transient per-status tracker state.
///
/// A message moves the status from `Idle` into one of the update states
/// and back to `Idle` before the next message is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// No message being applied.
    Idle,
    /// An aggregation change is being appended.
    AggregationUpdated,
    /// Counters are being stepped.
    CounterUpdated,
}

#[derive(Debug)]
struct Tracked {
    status: Status,
    state: TrackerState,
}

/// Status tracker of a single domain.
#[derive(Debug)]
pub struct StatusAggregationTracker {
    domain: DomainKey,
    statuses: Mutex<HashMap<StatusKey, Tracked>>,
    observers: RwLock<Vec<Arc<dyn StatusObserver>>>,
    ui: UiExecutor,
    cancel: CancellationToken,
}

impl StatusAggregationTracker {
    /// Creates a tracker whose refreshes stop once `cancel` fires.
    #[must_use]
    pub fn new(domain: DomainKey, ui: UiExecutor, cancel: CancellationToken) -> Self {
        Self {
            domain,
            statuses: Mutex::new(HashMap::new()),
            observers: RwLock::new(Vec::new()),
            ui,
            cancel,
        }
    }

    /// Starts tracking `status`. Returns `false` (keeping the existing
    /// entry) if the code is already tracked.
    pub fn track(&self, status: Status) -> bool {
        let mut statuses = self.statuses.lock();
        if statuses.contains_key(&status.key) {
            return false;
        }
        tracing::debug!(domain = %self.domain, status = %status.key, "tracking status");
        statuses.insert(
            status.key.clone(),
            Tracked {
                status,
                state: TrackerState::Idle,
            },
        );
        true
    }

    /// Convenience for tracking a fresh status.
    pub fn track_new(&self, key: StatusKey, context: Context) -> bool {
        self.track(Status::new(key, context))
    }

    /// Stops tracking a status, returning its last snapshot.
    pub fn untrack(&self, key: &StatusKey) -> Option<Status> {
        self.statuses.lock().remove(key).map(|t| t.status)
    }

    /// Snapshot of one tracked status.
    #[must_use]
    pub fn status(&self, key: &StatusKey) -> Option<Status> {
        self.statuses.lock().get(key).map(|t| t.status.clone())
    }

    /// Snapshots of every tracked status, ordered by code.
    #[must_use]
    pub fn statuses(&self) -> Vec<Status> {
        let mut all: Vec<Status> = self
            .statuses
            .lock()
            .values()
            .map(|t| t.status.clone())
            .collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    /// Current transient state of a tracked status.
    #[must_use]
    pub fn state(&self, key: &StatusKey) -> Option<TrackerState> {
        self.statuses.lock().get(key).map(|t| t.state)
    }

    /// Registers an observer.
    pub fn add_observer(&self, observer: Arc<dyn StatusObserver>) {
        let mut observers = self.observers.write();
        if !observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            observers.push(observer);
        }
    }

    /// Unregisters an observer. Returns `false` if it was not registered.
    pub fn remove_observer(&self, observer: &Arc<dyn StatusObserver>) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        before != observers.len()
    }

    /// Drops every observer.
    pub fn clear_observers(&self) {
        self.observers.write().clear();
    }

    /// Applies one bus message.
    ///
    /// Returns the update state the status went through, or `None` if the
    /// message is not a status message for a status tracked here.
    pub fn apply(&self, event: &DomainEvent) -> Option<TrackerState> {
        let (code, change, transition) = match event {
            DomainEvent::StatusAggregationChanged {
                domain,
                code,
                change,
            } if *domain == self.domain => (code, change, TrackerState::AggregationUpdated),
            DomainEvent::StatusCounterChanged {
                domain,
                code,
                change,
            } if *domain == self.domain => (code, change, TrackerState::CounterUpdated),
            _ => return None,
        };

        let snapshot = {
            let mut statuses = self.statuses.lock();
            let Some(tracked) = statuses.get_mut(code) else {
                tracing::debug!(
                    domain = %self.domain,
                    status = %code,
                    "message for untracked status ignored"
                );
                return None;
            };
            tracked.state = transition;
            match transition {
                TrackerState::AggregationUpdated => {
                    tracked.status.record_aggregation(change.clone());
                }
                TrackerState::CounterUpdated => {
                    if !tracked.status.record_counters(change) {
                        tracing::trace!(
                            domain = %self.domain,
                            status = %code,
                            "counters already current"
                        );
                    }
                }
                TrackerState::Idle => {}
            }
            let snapshot = tracked.status.clone();
            tracked.state = TrackerState::Idle;
            snapshot
        };

        self.schedule_refresh(snapshot);
        Some(transition)
    }

    /// Consumes `receiver` until the bus closes or the tracker is
    /// cancelled, applying messages in delivery order.
    pub async fn run(self: Arc<Self>, mut receiver: FilteredReceiver) {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                event = receiver.recv() => match event {
                    Some(event) => {
                        let _ = self.apply(&event);
                    }
                    None => break,
                },
            }
        }
        tracing::debug!(domain = %self.domain, "status tracker stopped");
    }

    fn schedule_refresh(&self, snapshot: Status) {
        if self.cancel.is_cancelled() {
            return;
        }
        let observers = self.observers.read().clone();
        if observers.is_empty() {
            return;
        }
        let cancel = self.cancel.clone();
        let domain = self.domain.clone();
        self.ui.submit(move || {
            if cancel.is_cancelled() {
                return;
            }
            for observer in &observers {
                observer.status_refreshed(&domain, &snapshot);
            }
        });
    }
}
