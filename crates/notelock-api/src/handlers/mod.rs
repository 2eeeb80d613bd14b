//! Request handlers, grouped by resource

pub mod auth;
pub mod notes;
pub mod shares;

use chrono::{DateTime, Utc};
use notelock_core::Lock;
use serde::Serialize;

/// Body returned by every lock acquisition
#[derive(Debug, Serialize)]
pub struct LockResponse {
    pub lock_id: String,
    pub expires_at: DateTime<Utc>,
}

impl From<Lock> for LockResponse {
    fn from(lock: Lock) -> Self {
        Self {
            lock_id: lock.token.to_string(),
            expires_at: lock.expires_at,
        }
    }
}
