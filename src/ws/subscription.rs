//! Per-connection subscription manager.
//!
//! Tracks which domains a WebSocket client is subscribed to, plus an
//! optional property filter, and provides server-side event filtering.

use std::collections::BTreeSet;

use crate::domain::{DomainEvent, DomainKey, EventFilter};

/// Manages the subscriptions of a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed domains. Ignored while `subscribe_all` is set.
    domains: BTreeSet<DomainKey>,
    /// Whether the client subscribes to every domain (wildcard `"*"`).
    subscribe_all: bool,
    /// Property filter applied on top of the domain selection.
    filter: EventFilter,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds domains to the subscription set. `wildcard` enables every
    /// domain.
    pub fn subscribe(&mut self, domains: &[DomainKey], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.domains.extend(domains.iter().cloned());
    }

    /// Removes domains from the subscription set. `wildcard` turns the
    /// every-domain subscription off.
    pub fn unsubscribe(&mut self, domains: &[DomainKey], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for domain in domains {
            self.domains.remove(domain);
        }
    }

    /// Replaces the property filter.
    pub fn set_filter(&mut self, filter: EventFilter) {
        self.filter = filter;
    }

    /// Current property filter.
    #[must_use]
    pub const fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Returns `true` if `event` passes both the domain selection and the
    /// property filter.
    #[must_use]
    pub fn matches(&self, event: &DomainEvent) -> bool {
        (self.subscribe_all || self.domains.contains(event.domain())) && self.filter.matches(event)
    }

    /// Returns the number of explicitly subscribed domains.
    #[must_use]
    pub fn count(&self) -> usize {
        self.domains.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub const fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
