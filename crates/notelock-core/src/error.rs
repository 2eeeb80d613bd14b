//! Error types for notelock-core

use thiserror::Error;

/// Result type alias using notelock-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in notelock-core operations
///
/// Every variant except `Database` and `Internal` is a recoverable outcome the
/// caller is expected to act on (retry the acquire, re-fetch and retry the
/// write, re-authenticate).
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Bad credentials
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Registration of an id that is already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Caller is not the owner of the note or share
    #[error("Not the owner: {0}")]
    NotOwner(String),

    /// Caller is the wrong actor or the share mode does not allow the action
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unknown note, share, or lock
    #[error("Not found: {0}")]
    NotFound(String),

    /// Another user holds a live lock on the target
    #[error("Target is locked by another user: {0}")]
    AlreadyLocked(String),

    /// The lock exists but is held by someone else
    #[error("Lock is not held by the caller: {0}")]
    LockNotOwned(String),

    /// The lock's lease has passed
    #[error("Lock has expired: {0}")]
    LockExpired(String),

    /// The lock token was issued for a different target
    #[error("Lock does not match target: {0}")]
    LockMismatch(String),

    /// Stored version differs from the expected one
    #[error("Version conflict on note {note_id}: expected {expected}, found {actual}")]
    VersionConflict {
        note_id: String,
        expected: i64,
        actual: i64,
    },

    /// Share has been revoked by its owner
    #[error("Share has been revoked: {0}")]
    Revoked(String),

    /// Share lifetime has passed
    #[error("Share has expired: {0}")]
    ShareExpired(String),

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable name for the error kind
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Auth(_) => "auth_error",
            Self::UserExists(_) => "user_exists",
            Self::NotOwner(_) => "not_owner",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::AlreadyLocked(_) => "already_locked",
            Self::LockNotOwned(_) => "lock_not_owned",
            Self::LockExpired(_) => "lock_expired",
            Self::LockMismatch(_) => "lock_mismatch",
            Self::VersionConflict { .. } => "version_conflict",
            Self::Revoked(_) => "revoked",
            Self::ShareExpired(_) => "share_expired",
            Self::Database(_) | Self::Internal(_) => "internal_error",
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_conflict_message_names_both_versions() {
        let err = Error::VersionConflict {
            note_id: "n1".to_string(),
            expected: 2,
            actual: 3,
        };
        let message = err.to_string();
        assert!(message.contains("expected 2"));
        assert!(message.contains("found 3"));
        assert_eq!(err.code(), "version_conflict");
    }

    #[test]
    fn storage_failures_share_a_generic_code() {
        let err = Error::Database(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(err.code(), "internal_error");
        assert_eq!(Error::Internal("x".into()).code(), "internal_error");
    }
}
