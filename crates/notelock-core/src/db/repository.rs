//! Note repository implementation

use crate::error::{Error, Result};
use crate::models::{Note, NoteId};
use rusqlite::{params, Connection, OptionalExtension};

use super::parse_column;

/// Trait for note storage operations
pub trait NoteRepository {
    /// Persist a new note
    fn insert(&self, note: &Note) -> Result<()>;

    /// Get a note by ID
    fn get(&self, id: &NoteId) -> Result<Option<Note>>;

    /// List an owner's notes, most recently updated first
    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Note>>;

    /// Replace title and content if the stored version equals
    /// `expected_version`, bumping the version by one
    fn write_versioned(
        &self,
        id: &NoteId,
        title: &str,
        content: &str,
        expected_version: i64,
    ) -> Result<Note>;
}

/// `SQLite` implementation of `NoteRepository`
pub struct SqliteNoteRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteNoteRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a note from a database row
    fn parse_note(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
        let id: String = row.get(0)?;
        Ok(Note {
            id: parse_column(0, &id)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
            version: row.get(6)?,
        })
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn insert(&self, note: &Note) -> Result<()> {
        self.conn.execute(
            "INSERT INTO notes (id, owner_id, title, content, created_at, updated_at, version)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                note.id.as_str(),
                note.owner_id,
                note.title,
                note.content,
                note.created_at,
                note.updated_at,
                note.version
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &NoteId) -> Result<Option<Note>> {
        let note = self
            .conn
            .query_row(
                "SELECT id, owner_id, title, content, created_at, updated_at, version
                 FROM notes WHERE id = ?",
                params![id.as_str()],
                Self::parse_note,
            )
            .optional()?;
        Ok(note)
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, title, content, created_at, updated_at, version
             FROM notes
             WHERE owner_id = ?
             ORDER BY updated_at DESC, id DESC",
        )?;

        let notes = stmt
            .query_map(params![owner_id], Self::parse_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(notes)
    }

    fn write_versioned(
        &self,
        id: &NoteId,
        title: &str,
        content: &str,
        expected_version: i64,
    ) -> Result<Note> {
        let now = chrono::Utc::now().timestamp_millis();

        // Single conditional statement: the compare and the bump are atomic
        let rows = self.conn.execute(
            "UPDATE notes
             SET title = ?, content = ?, updated_at = MAX(?, updated_at), version = version + 1
             WHERE id = ? AND version = ?",
            params![title, content, now, id.as_str(), expected_version],
        )?;

        if rows == 0 {
            return match self.get(id)? {
                None => Err(Error::NotFound(format!("note {id}"))),
                Some(current) => Err(Error::VersionConflict {
                    note_id: id.to_string(),
                    expected: expected_version,
                    actual: current.version,
                }),
            };
        }

        self.get(id)?
            .ok_or_else(|| Error::NotFound(format!("note {id}")))
    }
}
