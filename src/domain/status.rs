//! Status entities with counter records and append-only change history.
//!
//! A [`Status`] tracks the health of one monitored component. Inbound
//! aggregation messages append a [`StatusChange`] to the history; counter
//! messages nudge the current record's counters upward one step at a time.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Context;

/// Code identifying a status within its domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "db-health")]
pub struct StatusKey(String);

impl StatusKey {
    /// Creates a status key.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the raw code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StatusKey {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

/// Why a status change was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChangeCause {
    /// Triggered by an inbound event.
    Event,
    /// An operator cleared the status.
    ManualClearance,
    /// No event arrived within the staleness window.
    Staleness,
}

/// The three counters carried by every change record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusCounters {
    /// Events reporting success.
    pub ok: u64,
    /// Events reporting failure.
    pub error: u64,
    /// Staleness detections.
    pub stale: u64,
}

impl StatusCounters {
    /// Creates a counter triple.
    #[must_use]
    pub const fn new(ok: u64, error: u64, stale: u64) -> Self {
        Self { ok, error, stale }
    }

    /// Bumps every counter that lags behind `incoming` by exactly one.
    ///
    /// Returns `true` if any counter moved.
    pub fn step_towards(&mut self, incoming: &Self) -> bool {
        let mut moved = false;
        for (current, target) in [
            (&mut self.ok, incoming.ok),
            (&mut self.error, incoming.error),
            (&mut self.stale, incoming.stale),
        ] {
            if target > *current {
                *current = current.saturating_add(1);
                moved = true;
            }
        }
        moved
    }
}

/// One entry of a status's change history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusChange {
    /// Counter values at this change.
    pub counters: StatusCounters,
    /// What triggered the change.
    pub cause: ChangeCause,
    /// When the change was recorded at the source.
    pub timestamp: DateTime<Utc>,
}

impl StatusChange {
    /// Creates an event-triggered change with the given counters.
    #[must_use]
    pub fn event(counters: StatusCounters) -> Self {
        Self {
            counters,
            cause: ChangeCause::Event,
            timestamp: Utc::now(),
        }
    }

    /// Creates a zeroed change with the given cause.
    #[must_use]
    pub fn zeroed(cause: ChangeCause) -> Self {
        Self {
            counters: StatusCounters::default(),
            cause,
            timestamp: Utc::now(),
        }
    }
}

/// Health/state entity of a monitored component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Status {
    /// Status code, unique within its domain.
    pub key: StatusKey,
    /// Context of the owning entity.
    pub context: Context,
    /// The change record counter updates apply to.
    pub current: Option<StatusChange>,
    /// Append-only change history, oldest first.
    pub history: Vec<StatusChange>,
    /// Last local mutation.
    pub updated_at: DateTime<Utc>,
}

impl Status {
    /// Creates a status with empty history.
    #[must_use]
    pub fn new(key: StatusKey, context: Context) -> Self {
        Self {
            key,
            context,
            current: None,
            history: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Appends an aggregated change; it becomes the current record.
    pub fn record_aggregation(&mut self, change: StatusChange) {
        self.current = Some(change.clone());
        self.history.push(change);
        self.updated_at = Utc::now();
    }

    /// Moves the current counters one step towards `incoming`.
    ///
    /// Seeds a zeroed record with the incoming cause when no current record
    /// exists. Returns `true` if any counter changed.
    pub fn record_counters(&mut self, incoming: &StatusChange) -> bool {
        let current = self
            .current
            .get_or_insert_with(|| StatusChange::zeroed(incoming.cause));
        let moved = current.counters.step_towards(&incoming.counters);
        if moved {
            self.updated_at = Utc::now();
        }
        moved
    }

    /// Current counters, zero when nothing was recorded yet.
    #[must_use]
    pub fn counters(&self) -> StatusCounters {
        self.current
            .as_ref()
            .map(|change| change.counters)
            .unwrap_or_default()
    }
}
