//! Account domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A signed-up user account. Sessions are owned by exactly one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier (UUID format)
    pub id: String,
    /// Login email, compared case-insensitively
    pub email: String,
    /// Name shown in the UI
    pub display_name: String,
    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// Email/password pair used for sign-up and log-in.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Email in the canonical form used for lookups.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
