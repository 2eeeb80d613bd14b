//! User account model

use std::fmt;

/// A registered account
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    /// Encoded Argon2 hash (salt and parameters included)
    pub password_hash: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

impl fmt::Debug for User {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("User")
            .field("user_id", &self.user_id)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}
