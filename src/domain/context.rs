//! Hierarchical authorization context.
//!
//! A [`Context`] is a path-like string such as `/domain/deployment-123`
//! that scopes a domain entity for authorization purposes. Assignments
//! granted at a context cover every context that starts with it.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Path-like scope identifier used for permission checks.
///
/// Comparison is a plain string prefix test: `/d1` covers `/d1/dep1`
/// and also `/d10`. Callers that need segment-aware scoping must encode
/// a trailing separator in the assignment context (e.g. `/d1/`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "/env1/status1")]
pub struct Context(String);

impl Context {
    /// Creates a context from any string-like value.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the raw context string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this context grants access to `target`, i.e.
    /// `target` starts with this context.
    #[must_use]
    pub fn covers(&self, target: &Self) -> bool {
        target.0.starts_with(&self.0)
    }

    /// Appends a child segment, inserting a `/` separator when needed.
    #[must_use]
    pub fn child(&self, segment: &str) -> Self {
        if self.0.ends_with('/') {
            Self(format!("{}{segment}", self.0))
        } else {
            Self(format!("{}/{segment}", self.0))
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Context {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl From<String> for Context {
    fn from(path: String) -> Self {
        Self(path)
    }
}
