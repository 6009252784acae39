//! User accounts created from OAuth logins.

use serde::{Deserialize, Serialize};

/// A user row. Created on first login, display name refreshed on every login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: u64,
    pub display_name: String,
    /// Stable id assigned by the identity provider (unique).
    pub provider_id: String,
}

/// Identity returned by a successful OAuth handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub provider_id: String,
    pub display_name: String,
}

/// Public projection of a paste's author.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: u64,
    pub display_name: String,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name.clone(),
        }
    }
}
