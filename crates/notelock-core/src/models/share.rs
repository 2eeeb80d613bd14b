//! Share model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::NoteId;
use crate::error::Error;

/// A unique identifier for a share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShareId(Uuid);

impl ShareId {
    /// Create a new unique share ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ShareId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ShareId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Permission granted by a share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareMode {
    /// View only; can never be locked or written
    #[serde(rename = "ro")]
    ReadOnly,
    /// View, lock, and write
    #[serde(rename = "rw")]
    ReadWrite,
}

impl ShareMode {
    /// Wire and storage representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadOnly => "ro",
            Self::ReadWrite => "rw",
        }
    }

    pub const fn is_writable(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

impl fmt::Display for ShareMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShareMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ro" => Ok(Self::ReadOnly),
            "rw" => Ok(Self::ReadWrite),
            other => Err(Error::validation(format!(
                "share mode must be `ro` or `rw`, got `{other}`"
            ))),
        }
    }
}

/// A revocable grant of access to one note for one recipient
///
/// `revoked` only ever goes from `false` to `true`. Revoked shares stay in
/// storage so the id remains resolvable for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub id: ShareId,
    pub note_id: NoteId,
    /// Owner of the note at the time the share was created
    pub owner_id: String,
    pub recipient_id: String,
    pub mode: ShareMode,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Optional end of the share's lifetime (Unix ms)
    pub expires_at: Option<i64>,
    pub revoked: bool,
}

impl Share {
    /// Create a new, unrevoked share
    #[must_use]
    pub fn new(
        note_id: NoteId,
        owner_id: impl Into<String>,
        recipient_id: impl Into<String>,
        mode: ShareMode,
        expires_at: Option<i64>,
    ) -> Self {
        Self {
            id: ShareId::new(),
            note_id,
            owner_id: owner_id.into(),
            recipient_id: recipient_id.into(),
            mode,
            created_at: chrono::Utc::now().timestamp_millis(),
            expires_at,
            revoked: false,
        }
    }

    /// Whether the share's lifetime has passed at `now_ms`
    #[must_use]
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| now_ms >= at)
    }
}
