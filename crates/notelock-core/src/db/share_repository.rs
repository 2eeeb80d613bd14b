//! Share repository implementation

use crate::error::Result;
use crate::models::{Share, ShareId};
use rusqlite::{params, Connection, OptionalExtension};

use super::parse_column;

/// Trait for share storage operations
pub trait ShareRepository {
    /// Persist a new share
    fn insert(&self, share: &Share) -> Result<()>;

    /// Get a share by ID, revoked or not
    fn get(&self, id: &ShareId) -> Result<Option<Share>>;

    /// Set the revoked flag; returns `false` if the share does not exist
    fn mark_revoked(&self, id: &ShareId) -> Result<bool>;
}

/// `SQLite` implementation of `ShareRepository`
pub struct SqliteShareRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteShareRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_share(row: &rusqlite::Row<'_>) -> rusqlite::Result<Share> {
        let id: String = row.get(0)?;
        let note_id: String = row.get(1)?;
        let mode: String = row.get(4)?;
        Ok(Share {
            id: parse_column(0, &id)?,
            note_id: parse_column(1, &note_id)?,
            owner_id: row.get(2)?,
            recipient_id: row.get(3)?,
            mode: parse_column(4, &mode)?,
            created_at: row.get(5)?,
            expires_at: row.get(6)?,
            revoked: row.get::<_, i32>(7)? != 0,
        })
    }
}

impl ShareRepository for SqliteShareRepository<'_> {
    fn insert(&self, share: &Share) -> Result<()> {
        self.conn.execute(
            "INSERT INTO shares (id, note_id, owner_id, recipient_id, mode, created_at, expires_at, revoked)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                share.id.as_str(),
                share.note_id.as_str(),
                share.owner_id,
                share.recipient_id,
                share.mode.as_str(),
                share.created_at,
                share.expires_at,
                i32::from(share.revoked)
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &ShareId) -> Result<Option<Share>> {
        let share = self
            .conn
            .query_row(
                "SELECT id, note_id, owner_id, recipient_id, mode, created_at, expires_at, revoked
                 FROM shares WHERE id = ?",
                params![id.as_str()],
                Self::parse_share,
            )
            .optional()?;
        Ok(share)
    }

    fn mark_revoked(&self, id: &ShareId) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE shares SET revoked = 1 WHERE id = ?",
            params![id.as_str()],
        )?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, NoteRepository, SqliteNoteRepository};
    use crate::models::{Note, ShareMode};
    use pretty_assertions::assert_eq;

    fn setup() -> (Database, Note) {
        let db = Database::open_in_memory().unwrap();
        let note = Note::new("alice", "Title", "Body");
        SqliteNoteRepository::new(&db.connection())
            .insert(&note)
            .unwrap();
        (db, note)
    }

    #[test]
    fn test_insert_and_get() {
        let (db, note) = setup();
        let conn = db.connection();
        let repo = SqliteShareRepository::new(&conn);

        let share = Share::new(note.id, "alice", "bob", ShareMode::ReadWrite, Some(42));
        repo.insert(&share).unwrap();

        let fetched = repo.get(&share.id).unwrap().unwrap();
        assert_eq!(fetched, share);
    }

    #[test]
    fn test_mark_revoked_keeps_share_resolvable() {
        let (db, note) = setup();
        let conn = db.connection();
        let repo = SqliteShareRepository::new(&conn);

        let share = Share::new(note.id, "alice", "bob", ShareMode::ReadOnly, None);
        repo.insert(&share).unwrap();

        assert!(repo.mark_revoked(&share.id).unwrap());
        // Revoking twice is harmless and the flag stays set
        assert!(repo.mark_revoked(&share.id).unwrap());

        let fetched = repo.get(&share.id).unwrap().unwrap();
        assert!(fetched.revoked);
        assert_eq!(fetched.mode, ShareMode::ReadOnly);
    }

    #[test]
    fn test_mark_revoked_unknown_share() {
        let (db, _) = setup();
        let conn = db.connection();
        let repo = SqliteShareRepository::new(&conn);

        assert!(!repo.mark_revoked(&ShareId::new()).unwrap());
    }

    #[test]
    fn test_share_requires_existing_note() {
        let (db, _) = setup();
        let conn = db.connection();
        let repo = SqliteShareRepository::new(&conn);

        let orphan = Share::new(
            crate::models::NoteId::new(),
            "alice",
            "bob",
            ShareMode::ReadOnly,
            None,
        );
        assert!(repo.insert(&orphan).is_err());
    }
}
