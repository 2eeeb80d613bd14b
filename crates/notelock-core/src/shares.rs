//! Share creation, resolution, and revocation

use std::sync::Arc;
use std::time::Duration;

use crate::db::{Database, ShareRepository, SqliteShareRepository};
use crate::error::{Error, Result};
use crate::locks::LockManager;
use crate::models::{Lock, LockTarget, Note, NoteId, Share, ShareId, ShareMode};
use crate::notes::NoteStore;
use crate::util::{unix_millis_now, user_fingerprint};

/// Tracks shares and enforces their permission mode and revocation
pub struct ShareManager {
    db: Arc<Database>,
    notes: Arc<NoteStore>,
    locks: Arc<LockManager>,
}

impl ShareManager {
    pub const fn new(db: Arc<Database>, notes: Arc<NoteStore>, locks: Arc<LockManager>) -> Self {
        Self { db, notes, locks }
    }

    /// Grant `recipient` access to `note_id`
    ///
    /// Only the note's recorded owner may share it.
    pub fn create_share(
        &self,
        note_id: NoteId,
        owner: &str,
        recipient: &str,
        mode: ShareMode,
        ttl: Option<Duration>,
    ) -> Result<Share> {
        if recipient == owner {
            return Err(Error::Validation(
                "a note cannot be shared with its owner".to_string(),
            ));
        }

        let note = self.notes.get(note_id)?;
        if !note.is_owned_by(owner) {
            return Err(Error::NotOwner(format!("note {note_id}")));
        }

        let expires_at = ttl.map(|ttl| {
            let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            unix_millis_now().saturating_add(millis)
        });
        let share = Share::new(note_id, owner, recipient, mode, expires_at);
        self.repo_insert(&share)?;

        tracing::info!(
            share_id = %share.id,
            note_id = %note_id,
            owner = user_fingerprint(owner),
            recipient = user_fingerprint(recipient),
            mode = %mode,
            "Share created"
        );
        Ok(share)
    }

    /// Permanently disable a share and tear down any lock held through it
    ///
    /// The flag flip and the invalidation happen inside the share's critical
    /// section, so no write through the share can interleave with them.
    pub fn revoke(&self, share_id: ShareId, owner: &str) -> Result<()> {
        self.locks
            .with_target(LockTarget::Share(share_id), |slot| -> Result<()> {
                let share = self.load(share_id)?;
                if share.owner_id != owner {
                    return Err(Error::NotOwner(format!("share {share_id}")));
                }
                SqliteShareRepository::new(&self.db.connection()).mark_revoked(&share_id)?;
                slot.invalidate();
                Ok(())
            })?;

        tracing::info!(
            share_id = %share_id,
            owner = user_fingerprint(owner),
            "Share revoked"
        );
        Ok(())
    }

    /// Open a share for viewing; no lock is required
    pub fn resolve(&self, share_id: ShareId, requester: &str) -> Result<(Share, Note)> {
        let share = self.load(share_id)?;
        Self::check_usable(&share, requester)?;
        let note = self.notes.get(share.note_id)?;
        Ok((share, note))
    }

    /// All `resolve` checks plus a writable mode
    ///
    /// The mode is checked first: a read-only share is never writable, no
    /// matter who asks.
    pub fn check_writable(&self, share_id: ShareId, requester: &str) -> Result<Share> {
        let share = self.load(share_id)?;
        if !share.mode.is_writable() {
            return Err(Error::Forbidden(format!("share {share_id} is read-only")));
        }
        Self::check_usable(&share, requester)?;
        Ok(share)
    }

    /// Share metadata for its owner or recipient, including revoked shares
    pub fn inspect(&self, share_id: ShareId, requester: &str) -> Result<Share> {
        let share = self.load(share_id)?;
        if share.owner_id != requester && share.recipient_id != requester {
            return Err(Error::Forbidden(format!("share {share_id}")));
        }
        Ok(share)
    }

    /// Lock a writable share for its recipient
    pub fn acquire_lock(&self, share_id: ShareId, requester: &str) -> Result<Lock> {
        self.locks
            .with_target(LockTarget::Share(share_id), |slot| {
                self.check_writable(share_id, requester)?;
                slot.acquire(requester)
            })
    }

    /// Release the recipient's lock on a share
    pub fn release_lock(&self, share_id: ShareId, requester: &str) -> Result<()> {
        self.locks
            .with_target(LockTarget::Share(share_id), |slot| {
                let share = self.load(share_id)?;
                if share.recipient_id != requester {
                    return Err(Error::Forbidden(format!("share {share_id}")));
                }
                slot.release_held(requester)
            })
    }

    fn load(&self, share_id: ShareId) -> Result<Share> {
        SqliteShareRepository::new(&self.db.connection())
            .get(&share_id)?
            .ok_or_else(|| Error::NotFound(format!("share {share_id}")))
    }

    fn repo_insert(&self, share: &Share) -> Result<()> {
        SqliteShareRepository::new(&self.db.connection()).insert(share)
    }

    fn check_usable(share: &Share, requester: &str) -> Result<()> {
        if share.recipient_id != requester {
            return Err(Error::Forbidden(format!("share {}", share.id)));
        }
        if share.revoked {
            return Err(Error::Revoked(format!("share {}", share.id)));
        }
        if share.is_expired_at(unix_millis_now()) {
            return Err(Error::ShareExpired(format!("share {}", share.id)));
        }
        Ok(())
    }
}
