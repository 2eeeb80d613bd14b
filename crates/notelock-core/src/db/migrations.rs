//! Database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: users, notes, shares
fn migrate_v1(conn: &Connection) -> Result<()> {
    let statements = [
        // Schema version tracking
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        "CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )",
        // version >= 1 always; only ever bumped by a conditional UPDATE
        "CREATE TABLE IF NOT EXISTS notes (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1)
        )",
        "CREATE INDEX IF NOT EXISTS idx_notes_owner ON notes(owner_id, updated_at DESC)",
        // Shares are never deleted; revoked only flips 0 -> 1
        "CREATE TABLE IF NOT EXISTS shares (
            id TEXT PRIMARY KEY,
            note_id TEXT NOT NULL REFERENCES notes(id),
            owner_id TEXT NOT NULL,
            recipient_id TEXT NOT NULL,
            mode TEXT NOT NULL CHECK (mode IN ('ro', 'rw')),
            created_at INTEGER NOT NULL,
            expires_at INTEGER,
            revoked INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE INDEX IF NOT EXISTS idx_shares_note ON shares(note_id)",
        "CREATE INDEX IF NOT EXISTS idx_shares_recipient ON shares(recipient_id)",
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    // Dropping the transaction without commit rolls back
    let tx = conn.unchecked_transaction()?;
    for stmt in statements {
        tx.execute(stmt, [])?;
    }
    tx.commit()?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_migrations() {
        let conn = setup();
        run(&conn).unwrap();

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = setup();
        run(&conn).unwrap();
        run(&conn).unwrap(); // Should not fail

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_share_mode_is_constrained() {
        let conn = setup();
        run(&conn).unwrap();
        conn.execute(
            "INSERT INTO notes (id, owner_id, title, content, created_at, updated_at)
             VALUES ('n1', 'u1', 't', 'c', 0, 0)",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO shares (id, note_id, owner_id, recipient_id, mode, created_at)
             VALUES ('s1', 'n1', 'u1', 'u2', 'admin', 0)",
            [],
        );
        assert!(result.is_err());
    }
}
