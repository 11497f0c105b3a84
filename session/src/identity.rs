//! Identity types supplied by the identity provider.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection holding one document per signed-in user.
pub const USERS_COLLECTION: &str = "users";

/// Stable identifier of a signed-in principal, as issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a provider uid.
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// The raw uid.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(uid: &str) -> Self {
        Self::new(uid)
    }
}

/// A signed-in principal.
///
/// Opaque to the session core apart from `uid`, which scopes the user's
/// records. Profile fields are whatever the provider knows.
///
/// # Examples
///
/// ```
/// # use forever_fitness_session::Identity;
/// let identity = Identity::new("u1").with_email("ada@example.com");
/// assert_eq!(identity.uid.as_str(), "u1");
/// assert_eq!(identity.record_scope().document_path(), "users/u1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable provider uid.
    pub uid: UserId,

    /// Display name, if the provider has one.
    pub display_name: Option<String>,

    /// Email address, if shared.
    pub email: Option<String>,

    /// Avatar URL, if any.
    pub photo_url: Option<String>,
}

impl Identity {
    /// Identity with only a uid.
    #[must_use]
    pub fn new(uid: impl Into<UserId>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
            photo_url: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the avatar URL.
    #[must_use]
    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    /// Storage scope of this user's fitness records.
    #[must_use]
    pub fn record_scope(&self) -> RecordScope {
        RecordScope {
            owner: self.uid.clone(),
        }
    }
}

impl From<String> for UserId {
    fn from(uid: String) -> Self {
        Self(uid)
    }
}

/// Where a user's fitness records live.
///
/// Workouts, measurements, nutrition entries, goals, shop items and
/// achievements are stored under one document per user. The session core
/// only hands out the scope; reading and writing records is up to the
/// storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordScope {
    owner: UserId,
}

impl RecordScope {
    /// The user owning the records.
    #[must_use]
    pub const fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Document path of the user's record root, e.g. `users/u1`.
    #[must_use]
    pub fn document_path(&self) -> String {
        format!("{USERS_COLLECTION}/{}", self.owner)
    }
}
