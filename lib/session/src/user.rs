//! The signed-in user as seen by the gateway.
//!
//! A `User` is built from the identity provider's verified claims at callback
//! time and lives only inside the session that created it. Durable user
//! records, if any, belong to the application behind the gateway.

use serde::{Deserialize, Serialize};

/// An authenticated user, identified by the provider-issued subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider subject identifier, stable per identity provider.
    id: String,
    /// Display name, if the provider supplied one.
    #[serde(default)]
    name: Option<String>,
    /// Verified email addresses, de-duplicated in provider order.
    #[serde(default)]
    emails: Vec<String>,
}

impl User {
    /// Creates a user from a provider subject and profile data.
    ///
    /// Returns `None` when the subject is empty or whitespace, since a user
    /// without a subject cannot be told apart from any other.
    #[must_use]
    pub fn new(id: impl Into<String>, name: Option<String>, emails: Vec<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return None;
        }

        let mut unique: Vec<String> = Vec::with_capacity(emails.len());
        for email in emails {
            let email = email.trim().to_string();
            if !email.is_empty() && !unique.contains(&email) {
                unique.push(email);
            }
        }

        Some(Self {
            id,
            name: name.filter(|n| !n.trim().is_empty()),
            emails: unique,
        })
    }

    /// Returns the provider subject identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the display name, if available.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the verified email addresses.
    #[must_use]
    pub fn emails(&self) -> &[String] {
        &self.emails
    }
}
