//! Lock model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{NoteId, ShareId};

/// Opaque credential proving the right to write a target while live
///
/// Random (UUID v4) rather than time-ordered so tokens cannot be guessed from
/// one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockToken(Uuid);

impl LockToken {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LockToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LockToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A lockable unit: a note directly (owner path) or a share (recipient path)
///
/// The two namespaces are disjoint, so an owner lock and a share lock on the
/// same underlying note never collide by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LockTarget {
    Note(NoteId),
    Share(ShareId),
}

impl fmt::Display for LockTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Note(id) => write!(f, "note:{id}"),
            Self::Share(id) => write!(f, "share:{id}"),
        }
    }
}

/// An acquired lease on a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub token: LockToken,
    pub target: LockTarget,
    /// User holding the lock
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Lock {
    /// A lock is live strictly before its expiry instant
    #[must_use]
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn lock_is_dead_at_expiry() {
        let now = Utc::now();
        let lock = Lock {
            token: LockToken::new(),
            target: LockTarget::Note(NoteId::new()),
            holder: "alice".to_string(),
            acquired_at: now,
            expires_at: now + Duration::seconds(30),
        };
        assert!(lock.is_live_at(now));
        assert!(!lock.is_live_at(lock.expires_at));
    }

    #[test]
    fn targets_in_different_namespaces_display_distinctly() {
        let note = LockTarget::Note(NoteId::new());
        let share = LockTarget::Share(ShareId::new());
        assert!(note.to_string().starts_with("note:"));
        assert!(share.to_string().starts_with("share:"));
        assert_ne!(note, share);
    }
}
