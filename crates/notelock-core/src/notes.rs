//! Durable note storage with version-checked writes

use std::sync::Arc;

use crate::db::{Database, NoteRepository, SqliteNoteRepository};
use crate::error::{Error, Result};
use crate::models::{Note, NoteId};
use crate::util::user_fingerprint;

/// Maps note ids to their content and version
pub struct NoteStore {
    db: Arc<Database>,
}

impl NoteStore {
    pub const fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a note at version 1
    pub fn create(&self, owner_id: &str, title: &str, content: &str) -> Result<Note> {
        let note = Note::new(owner_id, title, content);
        SqliteNoteRepository::new(&self.db.connection()).insert(&note)?;
        tracing::info!(
            note_id = %note.id,
            owner = user_fingerprint(owner_id),
            "Note created"
        );
        Ok(note)
    }

    pub fn get(&self, id: NoteId) -> Result<Note> {
        SqliteNoteRepository::new(&self.db.connection())
            .get(&id)?
            .ok_or_else(|| Error::NotFound(format!("note {id}")))
    }

    /// Replace title and content if the stored version is `expected_version`
    ///
    /// Fails `VersionConflict` otherwise and leaves the note untouched. This
    /// holds even for a caller that skipped the lock layer entirely.
    pub fn write(
        &self,
        id: NoteId,
        title: &str,
        content: &str,
        expected_version: i64,
    ) -> Result<Note> {
        let result = SqliteNoteRepository::new(&self.db.connection()).write_versioned(
            &id,
            title,
            content,
            expected_version,
        );
        match &result {
            Ok(note) => tracing::info!(note_id = %id, version = note.version, "Note updated"),
            Err(Error::VersionConflict {
                expected, actual, ..
            }) => tracing::warn!(
                note_id = %id,
                expected,
                actual,
                "Rejected write on stale version"
            ),
            Err(_) => {}
        }
        result
    }

    /// All notes owned by `owner_id`, most recently updated first
    pub fn list(&self, owner_id: &str) -> Result<Vec<Note>> {
        SqliteNoteRepository::new(&self.db.connection()).list_by_owner(owner_id)
    }
}
