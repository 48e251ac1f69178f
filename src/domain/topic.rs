//! Message bus topic names and property filters.
//!
//! Topics follow the `<prefix>/<domainKey>/<eventType>` scheme. Consumers
//! narrow a subscription with a conjunctive [`EventFilter`] over event
//! properties, written as `type=status_counter_changed&code=db`.

use std::fmt;
use std::str::FromStr;

use super::{DomainEvent, DomainKey};
use crate::error::LighthouseError;

/// Default topic prefix.
pub const DEFAULT_TOPIC_PREFIX: &str = "lighthouse/events";

/// Fully qualified bus topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    /// Builds `<prefix>/<domain>/<event_type>`.
    #[must_use]
    pub fn new(prefix: &str, domain: &DomainKey, event_type: &str) -> Self {
        Self(format!("{prefix}/{domain}/{event_type}"))
    }

    /// Builds the topic an event is published on.
    #[must_use]
    pub fn for_event(prefix: &str, event: &DomainEvent) -> Self {
        Self::new(prefix, event.domain(), event.event_type_str())
    }

    /// Returns the topic string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Single `key=value` clause. A value of `*` only requires presence.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    key: String,
    value: String,
}

/// Conjunction of property clauses; the empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    clauses: Vec<Clause>,
}

impl EventFilter {
    /// Filter that matches every event.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    /// Adds an equality clause.
    #[must_use]
    pub fn and(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.push(Clause {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Returns `true` if every clause holds for `event`.
    #[must_use]
    pub fn matches(&self, event: &DomainEvent) -> bool {
        self.clauses.iter().all(|clause| {
            event
                .property(&clause.key)
                .is_some_and(|actual| clause.value == "*" || actual == clause.value)
        })
    }

    /// Returns `true` if the filter has no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl FromStr for EventFilter {
    type Err = LighthouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut filter = Self::any();
        for raw in s.split('&').map(str::trim).filter(|c| !c.is_empty()) {
            let Some((key, value)) = raw.split_once('=') else {
                return Err(LighthouseError::InvalidFilter(format!(
                    "clause `{raw}` is not key=value"
                )));
            };
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                return Err(LighthouseError::InvalidFilter(format!(
                    "clause `{raw}` has an empty side"
                )));
            }
            filter = filter.and(key, value);
        }
        Ok(filter)
    }
}

impl fmt::Display for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for clause in &self.clauses {
            if !first {
                f.write_str("&")?;
            }
            write!(f, "{}={}", clause.key, clause.value)?;
            first = false;
        }
        Ok(())
    }
}
