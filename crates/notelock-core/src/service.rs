//! Caller-scoped facade over notes, locks, and shares
//!
//! Every method takes the authenticated caller's user id; the service holds
//! no notion of a session. Input is validated here, before any store is
//! touched.

use std::sync::Arc;
use std::time::Duration;

use crate::coordinator::{NoteEdit, WriteCoordinator};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::locks::LockManager;
use crate::models::{Lock, LockTarget, LockToken, Note, NoteId, Share, ShareId, ShareMode};
use crate::notes::NoteStore;
use crate::shares::ShareManager;
use crate::validation::{share_ttl, validate_content, validate_title, validate_user_id};

/// All note operations available to an authenticated caller
pub struct NoteService {
    notes: Arc<NoteStore>,
    locks: Arc<LockManager>,
    shares: Arc<ShareManager>,
    writer: WriteCoordinator,
}

impl NoteService {
    /// Wire up the components over `db`, with locks leased for `lock_lease`
    pub fn new(db: Arc<Database>, lock_lease: Duration) -> Self {
        let notes = Arc::new(NoteStore::new(db.clone()));
        let locks = Arc::new(LockManager::new(lock_lease));
        let shares = Arc::new(ShareManager::new(db, notes.clone(), locks.clone()));
        let writer = WriteCoordinator::new(notes.clone(), shares.clone(), locks.clone());
        Self {
            notes,
            locks,
            shares,
            writer,
        }
    }

    pub fn create_note(&self, caller: &str, title: &str, content: &str) -> Result<Note> {
        validate_title(title)?;
        validate_content(content)?;
        self.notes.create(caller, title, content)
    }

    pub fn list_notes(&self, caller: &str) -> Result<Vec<Note>> {
        self.notes.list(caller)
    }

    /// The caller's own note; other users' notes look absent
    pub fn get_note(&self, caller: &str, note_id: NoteId) -> Result<Note> {
        self.owned_note(caller, note_id)
    }

    pub fn update_note(
        &self,
        caller: &str,
        note_id: NoteId,
        edit: &NoteEdit,
        token: LockToken,
    ) -> Result<Note> {
        validate_edit(edit)?;
        self.writer.write_owned(note_id, edit, token, caller)
    }

    pub fn acquire_note_lock(&self, caller: &str, note_id: NoteId) -> Result<Lock> {
        self.owned_note(caller, note_id)?;
        self.locks.acquire(LockTarget::Note(note_id), caller)
    }

    pub fn release_note_lock(&self, caller: &str, note_id: NoteId) -> Result<()> {
        self.owned_note(caller, note_id)?;
        self.locks.release_target(LockTarget::Note(note_id), caller)
    }

    /// Release a lock by its token, on any target
    pub fn release_lock(&self, caller: &str, token: LockToken) -> Result<()> {
        self.locks.release(token, caller)
    }

    pub fn create_share(
        &self,
        caller: &str,
        note_id: NoteId,
        recipient: &str,
        mode: ShareMode,
        ttl_minutes: Option<u32>,
    ) -> Result<Share> {
        validate_user_id("shared_with_user_id", recipient)?;
        let ttl = share_ttl(ttl_minutes)?;
        self.shares
            .create_share(note_id, caller, recipient, mode, ttl)
    }

    pub fn revoke_share(&self, caller: &str, share_id: ShareId) -> Result<()> {
        self.shares.revoke(share_id, caller)
    }

    /// Snapshot of the shared note; viewing never needs a lock
    pub fn open_share(&self, caller: &str, share_id: ShareId) -> Result<Note> {
        self.shares
            .resolve(share_id, caller)
            .map(|(_, note)| note)
    }

    pub fn share_status(&self, caller: &str, share_id: ShareId) -> Result<Share> {
        self.shares.inspect(share_id, caller)
    }

    pub fn acquire_share_lock(&self, caller: &str, share_id: ShareId) -> Result<Lock> {
        self.shares.acquire_lock(share_id, caller)
    }

    pub fn release_share_lock(&self, caller: &str, share_id: ShareId) -> Result<()> {
        self.shares.release_lock(share_id, caller)
    }

    pub fn save_via_share(
        &self,
        caller: &str,
        share_id: ShareId,
        edit: &NoteEdit,
        token: LockToken,
    ) -> Result<Note> {
        validate_edit(edit)?;
        self.writer.write_shared(share_id, edit, token, caller)
    }

    /// Drop locks abandoned for longer than a lease
    pub fn sweep_expired_locks(&self) -> usize {
        self.locks.sweep_expired()
    }

    fn owned_note(&self, caller: &str, note_id: NoteId) -> Result<Note> {
        let note = self.notes.get(note_id)?;
        if !note.is_owned_by(caller) {
            return Err(Error::NotFound(format!("note {note_id}")));
        }
        Ok(note)
    }
}

fn validate_edit(edit: &NoteEdit) -> Result<()> {
    validate_title(&edit.title)?;
    validate_content(&edit.content)?;
    if edit.expected_version.is_some_and(|version| version < Note::INITIAL_VERSION) {
        return Err(Error::Validation(
            "expected_version must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn service() -> NoteService {
        NoteService::new(
            Arc::new(Database::open_in_memory().unwrap()),
            Duration::from_secs(300),
        )
    }

    #[test]
    fn lock_contention_and_handover() {
        let svc = service();
        let note = svc.create_note("user1", "A", "x").unwrap();
        assert_eq!(note.version, 1);

        let l1 = svc.acquire_note_lock("user1", note.id).unwrap();

        // user2 cannot see, let alone lock, user1's note
        let err = svc.acquire_note_lock("user2", note.id).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let updated = svc
            .update_note("user1", note.id, &NoteEdit::new("A", "y"), l1.token)
            .unwrap();
        assert_eq!(updated.version, 2);

        svc.release_note_lock("user1", note.id).unwrap();
        let again = svc.acquire_note_lock("user1", note.id).unwrap();
        assert_ne!(again.token, l1.token);
    }

    #[test]
    fn update_by_non_owner_holding_owners_token_is_not_found() {
        let svc = service();
        let note = svc.create_note("user1", "A", "x").unwrap();
        let lock = svc.acquire_note_lock("user1", note.id).unwrap();

        let err = svc
            .update_note("user2", note.id, &NoteEdit::new("A", "hijack"), lock.token)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(svc.get_note("user1", note.id).unwrap().content, "x");
    }

    #[test]
    fn share_lock_can_be_reacquired_after_release() {
        let svc = service();
        let note = svc.create_note("user1", "A", "x").unwrap();
        let share = svc
            .create_share("user1", note.id, "user2", ShareMode::ReadWrite, None)
            .unwrap();

        let l1 = svc.acquire_share_lock("user2", share.id).unwrap();
        svc.release_share_lock("user2", share.id).unwrap();
        let l2 = svc.acquire_share_lock("user2", share.id).unwrap();
        assert_ne!(l1.token, l2.token);
    }

    #[test]
    fn other_users_notes_are_invisible() {
        let svc = service();
        let note = svc.create_note("user1", "A", "x").unwrap();

        assert!(matches!(
            svc.get_note("user2", note.id).unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(svc.list_notes("user2").unwrap().is_empty());
        assert_eq!(svc.list_notes("user1").unwrap(), vec![note]);
    }

    #[test]
    fn sharing_scenario_with_revocation() {
        let svc = service();
        let note = svc.create_note("user1", "A", "x").unwrap();
        let share = svc
            .create_share("user1", note.id, "user2", ShareMode::ReadWrite, None)
            .unwrap();

        // Viewing needs no lock
        let snapshot = svc.open_share("user2", share.id).unwrap();
        assert_eq!(snapshot.version, 1);

        let ls = svc.acquire_share_lock("user2", share.id).unwrap();
        let saved = svc
            .save_via_share("user2", share.id, &NoteEdit::new("A", "by u2"), ls.token)
            .unwrap();
        assert_eq!(saved.version, 2);
        assert_eq!(svc.get_note("user1", note.id).unwrap().content, "by u2");

        svc.revoke_share("user1", share.id).unwrap();

        let err = svc
            .save_via_share("user2", share.id, &NoteEdit::new("A", "late"), ls.token)
            .unwrap_err();
        assert!(matches!(err, Error::Revoked(_)));
        let err = svc.open_share("user2", share.id).unwrap_err();
        assert!(matches!(err, Error::Revoked(_)));
        assert_eq!(svc.get_note("user1", note.id).unwrap().version, 2);
        assert!(svc.share_status("user1", share.id).unwrap().revoked);
    }

    #[test]
    fn read_only_share_allows_view_only() {
        let svc = service();
        let note = svc.create_note("user1", "A", "x").unwrap();
        let share = svc
            .create_share("user1", note.id, "user2", ShareMode::ReadOnly, None)
            .unwrap();

        assert_eq!(svc.open_share("user2", share.id).unwrap().title, "A");
        let err = svc.acquire_share_lock("user2", share.id).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        let err = svc
            .save_via_share("user2", share.id, &NoteEdit::new("A", "y"), LockToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn release_lock_by_token() {
        let svc = service();
        let note = svc.create_note("user1", "A", "x").unwrap();
        let lock = svc.acquire_note_lock("user1", note.id).unwrap();

        let err = svc.release_lock("user2", lock.token).unwrap_err();
        assert!(matches!(err, Error::LockNotOwned(_)));
        svc.release_lock("user1", lock.token).unwrap();
    }

    #[test]
    fn input_is_validated_before_stores() {
        let svc = service();
        assert!(matches!(
            svc.create_note("user1", "  ", "x").unwrap_err(),
            Error::Validation(_)
        ));

        let note = svc.create_note("user1", "A", "x").unwrap();
        let lock = svc.acquire_note_lock("user1", note.id).unwrap();
        let err = svc
            .update_note("user1", note.id, &NoteEdit::new("A", "y").based_on(0), lock.token)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = svc
            .create_share("user1", note.id, "user2", ShareMode::ReadOnly, Some(0))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = svc
            .create_share("user1", note.id, "", ShareMode::ReadOnly, None)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(svc.get_note("user1", note.id).unwrap().version, 1);
    }
}
