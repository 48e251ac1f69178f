//! Type-safe identifiers for connected Lighthouse domains.
//!
//! [`DomainKey`] names a backend (the `<domainKey>` segment of bus topics);
//! [`SessionId`] distinguishes successive openings of the same key.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Key of a Lighthouse domain (one connected backend).
///
/// Used as the registry key in [`crate::service::DomainService`], the
/// topic segment on the message bus, and the WebSocket subscription target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "production")]
pub struct DomainKey(String);

impl DomainKey {
    /// Creates a domain key from any string-like value.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the key can be embedded in a bus topic, i.e. it
    /// is non-empty and contains neither `/` nor whitespace.
    #[must_use]
    pub fn is_topic_safe(&self) -> bool {
        !self.0.is_empty() && !self.0.contains('/') && !self.0.chars().any(char::is_whitespace)
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DomainKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Identifier of one opening of a domain.
///
/// Wraps a UUID v4 generated when the domain is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = uuid::Uuid)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Creates a new random session id.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
