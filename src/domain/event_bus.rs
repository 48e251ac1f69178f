//! Process-wide event bus for domain events.
//!
//! [`DomainEventBus`] is created once at startup and shared by every
//! domain, the WebSocket layer and the status trackers. It has two kinds
//! of subscribers:
//!
//! - [`DomainEventBus::subscribe`] hands out a [`tokio::sync::broadcast`]
//!   receiver. Slow receivers lag and skip the oldest events; used for
//!   best-effort streaming.
//! - [`DomainEventBus::subscribe_filtered`] registers a lossless
//!   per-subscriber queue in the bus's subscriber table. The table entry is
//!   removed by [`DomainEventBus::unsubscribe`] or when the
//!   [`FilteredReceiver`] is dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

use super::topic::{EventFilter, Topic};
use super::{DomainEvent, DomainKey};

/// Identifier of a filtered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug)]
struct Subscriber {
    domain: Option<DomainKey>,
    filter: EventFilter,
    sender: mpsc::UnboundedSender<DomainEvent>,
}

impl Subscriber {
    fn accepts(&self, event: &DomainEvent) -> bool {
        self.domain
            .as_ref()
            .is_none_or(|domain| event.domain() == domain)
            && self.filter.matches(event)
    }
}

#[derive(Debug, Default)]
struct SubscriberTable {
    next_id: AtomicU64,
    entries: Mutex<HashMap<SubscriptionId, Subscriber>>,
}

/// Event bus for [`DomainEvent`]s.
///
/// The broadcast side has a configurable capacity (default 10 000); when
/// its ring buffer is full, the oldest events are dropped for lagging
/// receivers. Filtered subscribers never lose events.
#[derive(Debug, Clone)]
pub struct DomainEventBus {
    sender: broadcast::Sender<DomainEvent>,
    subscribers: Arc<SubscriberTable>,
    topic_prefix: String,
}

impl DomainEventBus {
    /// Creates a new bus with the given channel capacity and topic prefix.
    #[must_use]
    pub fn new(capacity: usize, topic_prefix: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            subscribers: Arc::new(SubscriberTable::default()),
            topic_prefix: topic_prefix.into(),
        }
    }

    /// Returns the topic prefix events are published under.
    #[must_use]
    pub fn topic_prefix(&self) -> &str {
        &self.topic_prefix
    }

    /// Returns the topic `event` is published on.
    #[must_use]
    pub fn topic_of(&self, event: &DomainEvent) -> Topic {
        Topic::for_event(&self.topic_prefix, event)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event: every
    /// broadcast receiver plus every filtered subscriber that accepted it.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: DomainEvent) -> usize {
        let topic = self.topic_of(&event);
        let mut delivered = 0;
        self.subscribers.entries.lock().retain(|id, subscriber| {
            if !subscriber.accepts(&event) {
                return true;
            }
            if subscriber.sender.send(event.clone()).is_ok() {
                delivered += 1;
                true
            } else {
                tracing::debug!(subscription = %id, "dropping closed subscriber");
                false
            }
        });
        delivered += self.sender.send(event).unwrap_or(0);
        tracing::debug!(%topic, delivered, "event published");
        delivered
    }

    /// Creates a new broadcast receiver that will receive all future
    /// events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    /// Registers a lossless subscriber limited to one domain (or all
    /// domains when `domain` is `None`) and to events matching `filter`.
    #[must_use]
    pub fn subscribe_filtered(
        &self,
        domain: Option<DomainKey>,
        filter: EventFilter,
    ) -> FilteredReceiver {
        let id = SubscriptionId(self.subscribers.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.entries.lock().insert(
            id,
            Subscriber {
                domain,
                filter,
                sender,
            },
        );
        FilteredReceiver {
            id,
            receiver,
            table: Arc::downgrade(&self.subscribers),
        }
    }

    /// Removes a filtered subscription. Its receiver drains what was
    /// already queued and then ends. Returns `false` if `id` was not
    /// registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.subscribers.entries.lock().remove(&id).is_some();
        if removed {
            tracing::debug!(subscription = %id, "unsubscribed");
        }
        removed
    }

    /// Returns `true` while `id` is registered.
    #[must_use]
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.subscribers.entries.lock().contains_key(&id)
    }

    /// Number of filtered subscriptions scoped to `domain`.
    #[must_use]
    pub fn subscriptions_for(&self, domain: &DomainKey) -> usize {
        self.subscribers
            .entries
            .lock()
            .values()
            .filter(|s| s.domain.as_ref() == Some(domain))
            .count()
    }

    /// Returns the current number of active receivers of both kinds.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count() + self.subscribers.entries.lock().len()
    }
}

/// Receiving end of a filtered subscription.
#[derive(Debug)]
pub struct FilteredReceiver {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<DomainEvent>,
    table: Weak<SubscriberTable>,
}

impl FilteredReceiver {
    /// Subscription identifier, for [`DomainEventBus::unsubscribe`].
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next matching event, in publication order.
    ///
    /// Returns `None` once the subscription is removed (or the bus is
    /// dropped) and every queued event has been taken.
    pub async fn recv(&mut self) -> Option<DomainEvent> {
        self.receiver.recv().await
    }
}

impl Drop for FilteredReceiver {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            table.entries.lock().remove(&self.id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{SessionId, StatusChange, StatusCounters, StatusKey};
    use chrono::Utc;

    fn opened(domain: &str) -> DomainEvent {
        DomainEvent::DomainOpened {
            domain: DomainKey::new(domain),
            session: SessionId::new(),
            timestamp: Utc::now(),
        }
    }

    fn counter(domain: &str, code: &str) -> DomainEvent {
        DomainEvent::StatusCounterChanged {
            domain: DomainKey::new(domain),
            code: StatusKey::new(code),
            change: StatusChange::event(StatusCounters::new(1, 0, 0)),
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = DomainEventBus::new(100, "lh");
        assert_eq!(bus.publish(opened("prod")), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_event() {
        let bus = DomainEventBus::new(100, "lh");
        let mut rx = bus.subscribe();

        bus.publish(opened("prod"));

        let Ok(event) = rx.recv().await else {
            panic!("expected to receive event");
        };
        assert_eq!(event.domain(), &DomainKey::new("prod"));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = DomainEventBus::new(100, "lh");
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.publish(opened("prod")), 2);

        let (Ok(e1), Ok(e2)) = (rx1.recv().await, rx2.recv().await) else {
            panic!("both receivers should get the event");
        };
        assert_eq!(e1, e2);
    }

    #[tokio::test]
    async fn filtered_receiver_skips_other_domains_and_types() {
        let bus = DomainEventBus::new(100, "lh");
        let filter = EventFilter::any().and("type", "status_counter_changed");
        let mut rx = bus.subscribe_filtered(Some(DomainKey::new("prod")), filter);

        bus.publish(opened("prod"));
        bus.publish(counter("test", "db"));
        bus.publish(counter("prod", "db"));

        let Some(event) = rx.recv().await else {
            panic!("expected a matching event");
        };
        assert_eq!(event.domain(), &DomainKey::new("prod"));
        assert_eq!(event.event_type_str(), "status_counter_changed");
    }

    #[tokio::test]
    async fn filtered_receiver_ends_when_bus_dropped() {
        let bus = DomainEventBus::new(4, "lh");
        let mut rx = bus.subscribe_filtered(None, EventFilter::any());
        drop(bus);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = DomainEventBus::new(100, "lh");
        assert_eq!(bus.receiver_count(), 0);

        let rx1 = bus.subscribe();
        let _rx2 = bus.subscribe_filtered(None, EventFilter::any());
        assert_eq!(bus.receiver_count(), 2);

        drop(rx1);
        assert_eq!(bus.receiver_count(), 1);
    }

    #[tokio::test]
    async fn filtered_receiver_keeps_events_beyond_capacity() {
        let bus = DomainEventBus::new(4, "lh");
        let mut rx = bus.subscribe_filtered(Some(DomainKey::new("prod")), EventFilter::any());
        for _ in 0..10 {
            bus.publish(counter("prod", "db"));
        }
        drop(bus);

        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 10);
    }

    #[tokio::test]
    async fn unsubscribe_removes_entry_immediately() {
        let bus = DomainEventBus::new(16, "lh");
        let mut rx = bus.subscribe_filtered(Some(DomainKey::new("prod")), EventFilter::any());
        bus.publish(counter("prod", "db"));
        assert_eq!(bus.subscriptions_for(&DomainKey::new("prod")), 1);

        assert!(bus.unsubscribe(rx.id()));
        assert!(!bus.is_subscribed(rx.id()));
        assert_eq!(bus.receiver_count(), 0);
        assert_eq!(bus.publish(counter("prod", "db")), 0);

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
        assert!(!bus.unsubscribe(rx.id()));
    }

    #[test]
    fn dropping_filtered_receiver_unsubscribes() {
        let bus = DomainEventBus::new(16, "lh");
        let rx = bus.subscribe_filtered(None, EventFilter::any());
        let id = rx.id();
        assert!(bus.is_subscribed(id));
        drop(rx);
        assert!(!bus.is_subscribed(id));
    }

    #[test]
    fn publish_counts_only_accepting_subscribers() {
        let bus = DomainEventBus::new(16, "lh");
        let _prod = bus.subscribe_filtered(Some(DomainKey::new("prod")), EventFilter::any());
        let _test = bus.subscribe_filtered(Some(DomainKey::new("test")), EventFilter::any());
        let _raw = bus.subscribe();
        assert_eq!(bus.publish(counter("prod", "db")), 2);
    }

    #[test]
    fn topic_uses_prefix() {
        let bus = DomainEventBus::new(1, "lighthouse/events");
        assert_eq!(
            bus.topic_of(&counter("prod", "db")).as_str(),
            "lighthouse/events/prod/status_counter_changed"
        );
    }
}
