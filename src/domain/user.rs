//! Users, groups and credential verification.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

/// Unique user code (login name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "alice")]
pub struct UserCode(String);

/// Unique group code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String, example = "operators")]
pub struct GroupCode(String);

macro_rules! code_impls {
    ($ty:ident) => {
        impl $ty {
            /// Creates a code from any string-like value.
            #[must_use]
            pub fn new(code: impl Into<String>) -> Self {
                Self(code.into())
            }

            /// Returns the raw code string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $ty {
            fn from(code: &str) -> Self {
                Self(code.to_string())
            }
        }
    };
}

code_impls!(UserCode);
code_impls!(GroupCode);

/// Principal that can hold role assignments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum Subject {
    /// A single user.
    User(UserCode),
    /// Every member of a group.
    Group(GroupCode),
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(code) => write!(f, "user:{code}"),
            Self::Group(code) => write!(f, "group:{code}"),
        }
    }
}

/// A Lighthouse user.
///
/// Immutable once loaded except for the credential hash, which is replaced
/// through [`User::set_credential`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique login code.
    pub code: UserCode,
    /// Optional display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Hex-encoded SHA-256 digest of the user's secret.
    #[serde(default)]
    pub credential_hash: String,
    /// Groups the user belongs to.
    #[serde(default)]
    pub groups: Vec<GroupCode>,
}

impl User {
    /// Creates a user without credential or group memberships.
    #[must_use]
    pub fn new(code: UserCode) -> Self {
        Self {
            code,
            display_name: None,
            credential_hash: String::new(),
            groups: Vec::new(),
        }
    }

    /// Adds the user to a group.
    #[must_use]
    pub fn with_group(mut self, group: GroupCode) -> Self {
        if !self.groups.contains(&group) {
            self.groups.push(group);
        }
        self
    }

    /// Sets the credential from a plain secret.
    #[must_use]
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.set_credential(secret);
        self
    }

    /// Replaces the stored credential hash with the digest of `secret`.
    pub fn set_credential(&mut self, secret: &str) {
        self.credential_hash = credential_digest(secret);
    }

    /// Returns `true` if `secret` matches the stored credential.
    ///
    /// A stored hash that cannot be decoded is treated as a digest failure:
    /// it is logged and reported as "no match".
    #[must_use]
    pub fn verify_credential(&self, secret: &str) -> bool {
        let stored = match hex::decode(&self.credential_hash) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(user = %self.code, error = %e, "credential digest unreadable");
                return false;
            }
        };
        if stored.is_empty() {
            return false;
        }
        Sha256::digest(secret.as_bytes()).as_slice() == stored.as_slice()
    }

    /// Returns every subject whose assignments apply to this user: the
    /// user itself followed by its groups.
    #[must_use]
    pub fn subjects(&self) -> Vec<Subject> {
        let mut subjects = Vec::with_capacity(self.groups.len() + 1);
        subjects.push(Subject::User(self.code.clone()));
        subjects.extend(self.groups.iter().cloned().map(Subject::Group));
        subjects
    }
}

/// Computes the hex-encoded SHA-256 digest stored for a credential.
#[must_use]
pub fn credential_digest(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}
