//! Lock-validated, version-checked writes
//!
//! Every write runs inside the critical section of the target it was locked
//! through: the note id for the owner path, the share id for the recipient
//! path. Both paths end in the same version-checked store write, which is
//! the final arbiter if two differently-locked writers ever race.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::locks::{LockManager, TargetSlot};
use crate::models::{LockTarget, LockToken, Note, NoteId, ShareId};
use crate::notes::NoteStore;
use crate::shares::ShareManager;
use crate::util::user_fingerprint;

/// New title and content for a note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEdit {
    pub title: String,
    pub content: String,
    /// Version the edit was based on; defaults to the current version
    pub expected_version: Option<i64>,
}

impl NoteEdit {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            expected_version: None,
        }
    }

    #[must_use]
    pub const fn based_on(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Applies writes after checking lock and permission
pub struct WriteCoordinator {
    notes: Arc<NoteStore>,
    shares: Arc<ShareManager>,
    locks: Arc<LockManager>,
}

impl WriteCoordinator {
    pub const fn new(
        notes: Arc<NoteStore>,
        shares: Arc<ShareManager>,
        locks: Arc<LockManager>,
    ) -> Self {
        Self {
            notes,
            shares,
            locks,
        }
    }

    /// Write a note through the owner's lock on the note id
    ///
    /// The lock stays live afterwards, so the holder may save repeatedly.
    pub fn write_owned(
        &self,
        note_id: NoteId,
        edit: &NoteEdit,
        token: LockToken,
        requester: &str,
    ) -> Result<Note> {
        self.locks
            .with_target(LockTarget::Note(note_id), |slot| {
                let current = self.notes.get(note_id)?;
                if !current.is_owned_by(requester) {
                    return Err(Error::NotFound(format!("note {note_id}")));
                }
                require_holder(slot, token, requester)?;
                self.apply(&current, edit)
            })
            .inspect_err(|error| log_rejection(LockTarget::Note(note_id), requester, error))
    }

    /// Write the shared note through the recipient's lock on the share id
    ///
    /// The share is re-checked on every write, so a revoked or read-only
    /// share can never be written even with a token in hand.
    pub fn write_shared(
        &self,
        share_id: ShareId,
        edit: &NoteEdit,
        token: LockToken,
        requester: &str,
    ) -> Result<Note> {
        self.locks
            .with_target(LockTarget::Share(share_id), |slot| {
                let share = self.shares.check_writable(share_id, requester)?;
                require_holder(slot, token, requester)?;
                let current = self.notes.get(share.note_id)?;
                self.apply(&current, edit)
            })
            .inspect_err(|error| log_rejection(LockTarget::Share(share_id), requester, error))
    }

    fn apply(&self, current: &Note, edit: &NoteEdit) -> Result<Note> {
        let expected = edit.expected_version.unwrap_or(current.version);
        self.notes
            .write(current.id, &edit.title, &edit.content, expected)
    }
}

fn require_holder(slot: &mut TargetSlot<'_>, token: LockToken, requester: &str) -> Result<()> {
    let holder = slot.validate(token)?;
    if holder != requester {
        return Err(Error::LockNotOwned(token.to_string()));
    }
    Ok(())
}

fn log_rejection(target: LockTarget, requester: &str, error: &Error) {
    tracing::debug!(
        target_id = %target,
        requester = user_fingerprint(requester),
        code = error.code(),
        "Write rejected"
    );
}
